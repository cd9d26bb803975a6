// src/sync/gate.rs
// =============================================================================
// Mutual exclusion around the visited registry, with two interchangeable
// strategies:
//
// - ChannelGate: a channel with room for a single token. Acquiring puts a
//   token in (waiting while the slot is full), releasing takes it back out.
//   This is a binary semaphore built from a channel.
// - LockGate: a plain async mutex.
//
// Both hand out a `GatePermit`. Dropping the permit releases the gate, so
// every exit path of the guarded region (normal, already-visited, fetch
// error, panic) gives the gate back. Neither gate is reentrant: acquiring
// twice from the same task without dropping the first permit deadlocks.
//
// Both are FIFO: tokio's bounded channel and tokio's Mutex queue waiters in
// arrival order, so a short critical section can't starve anyone.
// =============================================================================

use std::fmt;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{mpsc, MutexGuard};
use tracing::error;

use crate::crawl::GateKind;

/// Exclusive access to shared crawl state.
#[async_trait]
pub trait ExclusionGate: Send + Sync + fmt::Debug {
    /// Waits until the caller is the only holder of the gate.
    async fn acquire<'a>(&'a self) -> GatePermit<'a>;

    fn kind(&self) -> GateKind;
}

/// Builds the gate for a configured strategy.
pub fn gate_for(kind: GateKind) -> Box<dyn ExclusionGate> {
    match kind {
        GateKind::Channel => Box::new(ChannelGate::new()),
        GateKind::Lock => Box::new(LockGate::new()),
    }
}

/// Proof that the holder is inside the guarded region.
pub enum GatePermit<'a> {
    Channel(&'a ChannelGate),
    Lock(MutexGuard<'a, ()>),
}

impl GatePermit<'_> {
    /// Whether the gate behind this permit is actually taken.
    pub fn is_held(&self) -> bool {
        match self {
            // The token occupies the only slot while the gate is held.
            GatePermit::Channel(gate) => gate.slot.capacity() == 0,
            GatePermit::Lock(_) => true,
        }
    }
}

impl fmt::Debug for GatePermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatePermit::Channel(_) => f.write_str("GatePermit::Channel"),
            GatePermit::Lock(_) => f.write_str("GatePermit::Lock"),
        }
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        // The mutex guard unlocks itself; only the channel needs draining.
        if let GatePermit::Channel(gate) = self {
            gate.release();
        }
    }
}

// -----------------------------------------------------------------------------
// Channel-as-lock
// -----------------------------------------------------------------------------

pub struct ChannelGate {
    slot: mpsc::Sender<()>,
    // `try_recv` needs `&mut`; this lock is only ever taken by the current
    // permit holder, so it is never contended.
    drain: Mutex<mpsc::Receiver<()>>,
}

impl ChannelGate {
    pub fn new() -> Self {
        let (slot, drain) = mpsc::channel(1);
        Self {
            slot,
            drain: Mutex::new(drain),
        }
    }

    fn release(&self) {
        let mut drain = self.drain.lock().unwrap_or_else(PoisonError::into_inner);
        if drain.try_recv().is_err() {
            error!("channel gate released while empty");
        }
    }
}

impl Default for ChannelGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelGate")
            .field("held", &(self.slot.capacity() == 0))
            .finish()
    }
}

#[async_trait]
impl ExclusionGate for ChannelGate {
    async fn acquire<'a>(&'a self) -> GatePermit<'a> {
        // The receiver lives in `self`, so the channel can't be closed here.
        if self.slot.send(()).await.is_err() {
            error!("channel gate closed while acquiring");
        }
        GatePermit::Channel(self)
    }

    fn kind(&self) -> GateKind {
        GateKind::Channel
    }
}

// -----------------------------------------------------------------------------
// Classic lock
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct LockGate {
    lock: tokio::sync::Mutex<()>,
}

impl LockGate {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExclusionGate for LockGate {
    async fn acquire<'a>(&'a self) -> GatePermit<'a> {
        GatePermit::Lock(self.lock.lock().await)
    }

    fn kind(&self) -> GateKind {
        GateKind::Lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    // Hammers a gate from many tasks and records the highest number of tasks
    // that were ever inside the region at once.
    async fn max_concurrent_holders(gate: Arc<dyn ExclusionGate>) -> usize {
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let (gate, inside, peak) = (Arc::clone(&gate), Arc::clone(&inside), Arc::clone(&peak));
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    let _permit = gate.acquire().await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        peak.load(Ordering::SeqCst)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_channel_gate_is_exclusive() {
        assert_eq!(max_concurrent_holders(Arc::new(ChannelGate::new())).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lock_gate_is_exclusive() {
        assert_eq!(max_concurrent_holders(Arc::new(LockGate::new())).await, 1);
    }

    #[tokio::test]
    async fn test_dropping_permit_releases_channel_gate() {
        let gate = ChannelGate::new();
        let permit = gate.acquire().await;

        // Held: a second acquire must not complete.
        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(blocked.is_err());

        drop(permit);
        let again = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_releasing_an_empty_channel_gate_is_harmless() {
        let gate = ChannelGate::new();

        // Nothing to drain: logged, and the gate stays usable.
        gate.release();
        let permit = gate.acquire().await;
        assert!(permit.is_held());

        // Still exclusive after the bogus release.
        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(blocked.is_err());
        drop(permit);
        assert!(!GatePermit::Channel(&gate).is_held());
    }

    #[tokio::test]
    async fn test_gate_for_builds_requested_kind() {
        assert_eq!(gate_for(GateKind::Channel).kind(), GateKind::Channel);
        assert_eq!(gate_for(GateKind::Lock).kind(), GateKind::Lock);
    }
}
