use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gate {0} is closed")]
pub struct GateClosed(pub &'static str);

/// Counting admission gate bounding how many tasks of one class run at once.
///
/// Clones share the same slots. The gate also records how many holders it
/// has right now and the highest count it has ever seen.
#[derive(Debug, Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    name: &'static str,
    limit: NonZeroUsize,
    slots: Arc<Semaphore>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Gate {
    pub fn new(name: &'static str, limit: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                name,
                limit,
                slots: Arc::new(Semaphore::new(limit.get())),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Waits for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = self
            .inner
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateClosed(self.inner.name))?;
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        Ok(GatePermit {
            gate: self.inner.clone(),
            _slot: permit,
        })
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn limit(&self) -> usize {
        self.inner.limit.get()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous holders observed so far.
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

/// One admitted slot of a [`Gate`].
#[derive(Debug)]
pub struct GatePermit {
    gate: Arc<GateInner>,
    _slot: OwnedSemaphorePermit,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // Runs before `_slot` is dropped, so the counter never exceeds the limit.
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
