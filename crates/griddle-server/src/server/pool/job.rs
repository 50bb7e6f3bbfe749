use tokio::sync::OwnedSemaphorePermit;

/// One portion waiting for, or sitting on, a fryer.
///
/// The job owns the queue slot it was admitted with. The slot is returned to
/// the pool only when the job is dropped, which a fryer does after reporting
/// the portion ready.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) ticket: u64,
    _slot: OwnedSemaphorePermit,
}

impl Job {
    pub(crate) const fn new(ticket: u64, slot: OwnedSemaphorePermit) -> Self {
        Self {
            ticket,
            _slot: slot,
        }
    }
}
