//! Binds one connection to one ledger and one fryer pool.
//!
//! The inbound path runs on the session's own task: it reads a frame, decodes
//! it, applies it to the [`Ledger`], acknowledges it, extracts whatever whole
//! portions the stock now allows and submits one job per portion. Because the
//! acknowledgement is queued on the event stream before any job is submitted,
//! a `pancake-ready` can never overtake the `ingredient-received` that caused
//! it.
//!
//! The outbound writer and the fryers run as separate tasks that share the
//! session's [`CancellationToken`]. Whichever side ends the session cancels
//! the token; the coordinator then drains both and reports a
//! [`SessionSummary`].

use super::{SessionState, outbound::write_events, transport::Frame};
use crate::server::{
    config::ServerConfig,
    error::{Result, SessionError},
    pool::PreparationPool,
    telemetry::{increment_ingredients_received, increment_portions_dispatched},
};
use core::fmt;
use futures::{Sink, Stream, StreamExt};
use griddle_core::{
    codec,
    ledger::{Ledger, Stock},
    types::StatusEvent,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why a session left the `Active` state.
#[derive(Debug)]
pub enum CloseReason {
    /// The peer stopped sending.
    EndOfStream,
    /// The peer sent a close frame.
    CloseFrame,
    /// The session or server shutdown signal fired.
    Shutdown,
    /// A protocol, transport or internal failure ended the session.
    Failed(SessionError),
}

impl CloseReason {
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => f.write_str("end of stream"),
            Self::CloseFrame => f.write_str("close frame"),
            Self::Shutdown => f.write_str("shutdown"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// What a session did, reported once it is `Closed`.
#[derive(Debug)]
pub struct SessionSummary {
    pub id: u64,
    pub state: SessionState,
    pub close_reason: CloseReason,
    pub stock: Stock,
    pub ingredients_received: u64,
    pub portions_dispatched: u64,
}

/// One connection's kitchen.
pub struct Session {
    id: u64,
    config: ServerConfig,
    state: SessionState,
    shutdown_token: CancellationToken,
}

/// State owned by the inbound path while the session is `Active`.
struct Kitchen {
    ledger: Ledger,
    events: mpsc::Sender<StatusEvent>,
    pool: PreparationPool,
    ingredients_received: u64,
    portions_dispatched: u64,
}

impl Session {
    /// Creates an `Active` session. Cancelling `shutdown_token` drains it.
    pub fn new(id: u64, config: &ServerConfig, shutdown_token: CancellationToken) -> Self {
        Self {
            id,
            config: config.clone(),
            state: SessionState::Active,
            shutdown_token,
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Runs the session until its connection ends, it fails, or it is shut
    /// down, then releases every task and channel it owns.
    pub async fn run<R, E, W>(mut self, mut inbound: R, outbound: W) -> SessionSummary
    where
        R: Stream<Item = core::result::Result<Frame, E>> + Unpin + Send,
        E: fmt::Display + Send,
        W: Sink<String> + Unpin + Send + 'static,
        W::Error: fmt::Display + Send,
    {
        let (events, events_rx) = mpsc::channel(self.config.event_buffer_size.max(1));
        let writer = tokio::spawn(write_events(
            events_rx,
            outbound,
            self.shutdown_token.clone(),
        ));
        let pool = PreparationPool::spawn(
            &self.config.pool(),
            events.clone(),
            self.shutdown_token.child_token(),
        );

        let mut kitchen = Kitchen {
            ledger: Ledger::new(),
            events,
            pool,
            ingredients_received: 0,
            portions_dispatched: 0,
        };

        tracing::debug!("Session {} is {}", self.id, self.state);
        let mut close_reason = self.read_until_closed(&mut inbound, &mut kitchen).await;

        self.transition(SessionState::Draining);
        self.shutdown_token.cancel();

        let Kitchen {
            ledger,
            events,
            pool,
            ingredients_received,
            portions_dispatched,
        } = kitchen;
        drop(events);
        pool.shutdown().await;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                // The writer cancelled the session; its error is the real
                // reason the reader saw a shutdown.
                if matches!(close_reason, CloseReason::Shutdown) {
                    close_reason = CloseReason::Failed(e);
                }
            }
            Err(e) => tracing::error!("Outbound writer task failed: {e}"),
        }

        self.transition(SessionState::Closed);

        SessionSummary {
            id: self.id,
            state: self.state,
            close_reason,
            stock: ledger.stock(),
            ingredients_received,
            portions_dispatched,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(self.state.can_become(next));
        tracing::debug!("Session {} is {} (was {})", self.id, next, self.state);
        self.state = next;
    }

    async fn read_until_closed<R, E>(&self, inbound: &mut R, kitchen: &mut Kitchen) -> CloseReason
    where
        R: Stream<Item = core::result::Result<Frame, E>> + Unpin,
        E: fmt::Display,
    {
        loop {
            let frame = tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => return CloseReason::Shutdown,
                frame = inbound.next() => frame,
            };

            let frame = match frame {
                None => return CloseReason::EndOfStream,
                Some(Err(e)) => {
                    return CloseReason::Failed(SessionError::Transport {
                        context: format!("read failed: {e}"),
                    });
                }
                Some(Ok(frame)) => frame,
            };

            let Some(payload) = frame.payload() else {
                self.finish_close(inbound).await;
                return CloseReason::CloseFrame;
            };

            match self.accept(payload, kitchen).await {
                Ok(()) => {}
                Err(SessionError::ServiceShutdown) => return CloseReason::Shutdown,
                Err(e) => return CloseReason::Failed(e),
            }
        }
    }

    /// Keeps reading after the peer's close frame until the stream ends, so
    /// the transport gets to flush its close reply. Frames that arrive in
    /// between are ignored.
    async fn finish_close<R, E>(&self, inbound: &mut R)
    where
        R: Stream<Item = core::result::Result<Frame, E>> + Unpin,
        E: fmt::Display,
    {
        loop {
            tokio::select! {
                biased;
                () = self.shutdown_token.cancelled() => return,
                frame = inbound.next() => match frame {
                    None => return,
                    Some(Err(e)) => {
                        tracing::debug!("Read after close frame failed: {e}");
                        return;
                    }
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    /// Applies one payload: acknowledge, then portion.
    async fn accept(&self, payload: &[u8], kitchen: &mut Kitchen) -> Result<()> {
        let ingredient = codec::decode_ingredient(payload)?;

        kitchen.ledger.apply(&ingredient);
        kitchen.ingredients_received += 1;
        increment_ingredients_received();
        tracing::debug!("Received {ingredient}");

        self.emit(&kitchen.events, StatusEvent::received(ingredient))
            .await?;

        let Some(batch) = kitchen.ledger.extract_portions() else {
            return Ok(());
        };

        tracing::debug!(
            "Dispatching {} portion(s), {:?} left",
            batch.count(),
            kitchen.ledger.stock()
        );
        for _ in 0..batch.count() {
            kitchen.pool.submit().await?;
            kitchen.portions_dispatched += 1;
            increment_portions_dispatched(1);
        }

        Ok(())
    }

    async fn emit(&self, events: &mpsc::Sender<StatusEvent>, event: StatusEvent) -> Result<()> {
        tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => Err(SessionError::ServiceShutdown),
            sent = events.send(event) => sent.map_err(|_| SessionError::ChannelClosed {
                context: String::from("status event stream closed"),
            }),
        }
    }
}
