use super::job::Job;
use crate::server::telemetry::increment_portions_ready;
use core::time::Duration;
use griddle_core::types::StatusEvent;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Fryer task: takes one job, holds it for `fry_duration`, reports it ready.
///
/// Fryers share a single receiver; whichever fryer holds the lock waits for
/// the next job while the others queue on the lock. The job, and with it the
/// pool slot, is released only after `pancake-ready` has been handed to the
/// event stream.
///
/// # Arguments
///
/// - `fryer_id`: index of this fryer within its pool (used for logs).
/// - `jobs`: the pool's shared job queue.
/// - `events`: the session's outbound status events.
/// - `fry_duration`: how long one portion takes.
/// - `shutdown_token`: stops the fryer at any suspension point.
pub(crate) async fn fryer_loop(
    fryer_id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    events: mpsc::Sender<StatusEvent>,
    fry_duration: Duration,
    shutdown_token: CancellationToken,
) {
    tracing::trace!("Fryer {fryer_id} started");

    loop {
        let job = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => break,
            job = next_job(&jobs) => match job {
                Some(job) => job,
                None => break,
            },
        };

        tracing::trace!("Fryer {fryer_id} cooking ticket {}", job.ticket);

        tokio::select! {
            biased;
            () = shutdown_token.cancelled() => {
                tracing::debug!("Fryer {fryer_id} abandoned ticket {}", job.ticket);
                break;
            }
            () = tokio::time::sleep(fry_duration) => {}
        }

        let sent = tokio::select! {
            biased;
            () = shutdown_token.cancelled() => false,
            sent = events.send(StatusEvent::PortionReady) => sent.is_ok(),
        };
        if !sent {
            tracing::debug!("Fryer {fryer_id} could not report ticket {}", job.ticket);
            break;
        }

        increment_portions_ready();
        drop(job);
    }

    tracing::trace!("Fryer {fryer_id} stopped");
}

async fn next_job(jobs: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
    jobs.lock().await.recv().await
}
