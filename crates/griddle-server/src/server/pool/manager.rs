//! Bounded fryer pool for a single session.
//!
//! This module defines [`PreparationPool`], which spawns `fryers` worker tasks
//! sharing one job queue. Admission is counted in slots: a slot is taken when
//! a job is submitted and handed back when the fryer that took the job has
//! emitted its completion. With `queue_capacity == fryers` a submission
//! therefore waits whenever every fryer is busy.
//!
//! All fryers observe the pool's [`CancellationToken`]. Cancelling it stops
//! them immediately and abandons whatever is still cooking.

use super::{job::Job, worker::fryer_loop};
use crate::server::error::{Result, SessionError};
use core::time::Duration;
use griddle_core::types::StatusEvent;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, Semaphore, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Sizing for one session's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of fryer tasks. Each cooks one portion at a time.
    pub fryers: usize,
    /// Jobs that may be queued or cooking at once.
    pub queue_capacity: usize,
    /// How long a fryer holds a portion.
    pub fry_duration: Duration,
}

/// A fixed set of fryers behind a bounded, slot-counted job queue.
pub struct PreparationPool {
    jobs: mpsc::Sender<Job>,
    slots: Arc<Semaphore>,
    next_ticket: AtomicU64,
    shutdown_token: CancellationToken,
    fryers: Vec<JoinHandle<()>>,
}

impl PreparationPool {
    /// Spawns the fryers and returns a handle for submitting portions.
    ///
    /// Completions are sent on `events`. The pool stops when
    /// `shutdown_token` is cancelled or [`PreparationPool::shutdown`] is
    /// called.
    pub fn spawn(
        config: &PoolConfig,
        events: mpsc::Sender<StatusEvent>,
        shutdown_token: CancellationToken,
    ) -> Self {
        let queue_capacity = config.queue_capacity.max(1);

        // The channel can hold every admitted job, so sending after a slot
        // was acquired never waits.
        let (jobs, rx) = mpsc::channel(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        let fryers = (0..config.fryers)
            .map(|fryer_id| {
                tokio::spawn(fryer_loop(
                    fryer_id,
                    Arc::clone(&rx),
                    events.clone(),
                    config.fry_duration,
                    shutdown_token.clone(),
                ))
            })
            .collect();

        tracing::trace!(
            fryers = config.fryers,
            queue_capacity,
            "Preparation pool started"
        );

        Self {
            jobs,
            slots: Arc::new(Semaphore::new(queue_capacity)),
            next_ticket: AtomicU64::new(0),
            shutdown_token,
            fryers,
        }
    }

    /// Queues one portion.
    ///
    /// Waits while every slot is taken; this is what throttles the session's
    /// inbound reader when all fryers are busy. Returns the job's ticket.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ServiceShutdown`] if the pool is cancelled before a
    ///   slot frees up.
    /// - [`SessionError::ChannelClosed`] if the fryers have already exited.
    pub async fn submit(&self) -> Result<u64> {
        let slot = tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => return Err(SessionError::ServiceShutdown),
            slot = Arc::clone(&self.slots).acquire_owned() => slot.map_err(|_| SessionError::ChannelClosed {
                context: String::from("fryer slots closed"),
            })?,
        };

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.jobs
            .send(Job::new(ticket, slot))
            .await
            .map_err(|_| SessionError::ChannelClosed {
                context: format!("job queue closed before ticket {ticket}"),
            })?;

        tracing::trace!(ticket, "Portion queued");
        Ok(ticket)
    }

    /// Slots currently free for new jobs.
    #[cfg(test)]
    fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Stops every fryer and waits for them to exit.
    ///
    /// Jobs still queued or cooking are abandoned without a completion event.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        self.slots.close();
        drop(self.jobs);

        for result in futures::future::join_all(self.fryers).await {
            if let Err(e) = result {
                tracing::error!("Fryer task failed: {e}");
            }
        }

        tracing::trace!("Preparation pool stopped");
    }
}
