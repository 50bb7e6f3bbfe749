use crate::server::error::{Result, SessionError};
use core::fmt;
use futures::{Sink, SinkExt};
use griddle_core::{codec, types::StatusEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Drains the session's status events onto the wire, in arrival order.
///
/// Returns `Ok(())` when the session cancels the writer or every event sender
/// is gone. On an encode or write failure the session token is cancelled
/// before returning, so the rest of the session starts draining at once.
pub async fn write_events<W>(
    mut events: mpsc::Receiver<StatusEvent>,
    mut wire: W,
    shutdown_token: CancellationToken,
) -> Result<()>
where
    W: Sink<String> + Unpin,
    W::Error: fmt::Display,
{
    loop {
        let event = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let text = match codec::try_encode(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode {event:?}: {e}");
                shutdown_token.cancel();
                return Err(e.into());
            }
        };

        let written = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => break,
            written = wire.send(text) => written,
        };

        if let Err(e) = written {
            tracing::debug!("Failed to write status event: {e}");
            shutdown_token.cancel();
            return Err(SessionError::Transport {
                context: format!("write failed: {e}"),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, channel::mpsc as wire};
    use griddle_core::types::Ingredient;

    #[tokio::test]
    async fn writes_events_in_order_until_senders_are_gone() {
        let (events_tx, events_rx) = mpsc::channel(4);
        let (wire_tx, wire_rx) = wire::unbounded::<String>();
        let token = CancellationToken::new();

        events_tx
            .send(StatusEvent::received(Ingredient::eggs(2)))
            .await
            .unwrap();
        events_tx.send(StatusEvent::PortionReady).await.unwrap();
        drop(events_tx);

        write_events(events_rx, wire_tx, token.clone()).await.unwrap();

        let written: Vec<String> = wire_rx.collect().await;
        assert_eq!(
            written,
            [
                r#"{"status":"ingredient-received","ingredient":{"ingredient":"eggs","count":2}}"#,
                r#"{"status":"pancake-ready"}"#,
            ]
        );
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn write_failure_cancels_the_session() {
        let (events_tx, events_rx) = mpsc::channel(4);
        let (wire_tx, wire_rx) = wire::unbounded::<String>();
        let token = CancellationToken::new();
        drop(wire_rx);

        events_tx.send(StatusEvent::PortionReady).await.unwrap();

        let result = write_events(events_rx, wire_tx, token.clone()).await;
        assert!(matches!(result, Err(SessionError::Transport { .. })));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_writer() {
        let (_events_tx, events_rx) = mpsc::channel::<StatusEvent>(4);
        let (wire_tx, _wire_rx) = wire::unbounded::<String>();
        let token = CancellationToken::new();
        token.cancel();

        write_events(events_rx, wire_tx, token).await.unwrap();
    }
}
