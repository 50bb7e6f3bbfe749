//! Adapts an axum [`WebSocket`] to the frame stream and text sink a
//! [`Session`](super::Session) runs on.

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt, future};

/// An inbound frame as the session sees it. Control frames other than close
/// never reach the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

impl Frame {
    /// The JSON payload carried by a data frame.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Text(text) => Some(text.as_bytes()),
            Self::Binary(bytes) => Some(bytes),
            Self::Close => None,
        }
    }
}

fn frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(bytes) => Some(Frame::Binary(bytes.to_vec())),
        Message::Close(_) => Some(Frame::Close),
        Message::Ping(_) | Message::Pong(_) => None,
    }
}

/// Splits the socket into an inbound [`Frame`] stream and an outbound sink
/// that writes each string as one text frame.
pub fn split_socket(
    socket: WebSocket,
) -> (
    impl Stream<Item = Result<Frame, axum::Error>> + Send + Unpin,
    impl Sink<String, Error = axum::Error> + Send + Unpin,
) {
    let (sink, stream) = socket.split();

    let inbound = stream.filter_map(|message| {
        future::ready(match message {
            Ok(message) => frame(message).map(Ok),
            Err(e) => Some(Err(e)),
        })
    });

    let outbound = sink.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
    });

    (inbound, outbound)
}
