// src/sync/wait_group.rs
// =============================================================================
// A counted barrier for a task tree whose size is only known at runtime.
//
// How it works:
// 1. Whoever is about to spawn a task calls `enter()` (or `add(1)`) first
// 2. The returned `WorkTicket` is moved into the task
// 3. When the task ends - normally, early, or by panicking - the ticket is
//    dropped and the count goes down by exactly one
// 4. `wait()` resolves once the count is back to zero
//
// The increment always happens in the spawning context, never inside the
// spawned task, so `wait()` can't see a false zero between "parent decided
// to spawn" and "child started running".
//
// Rust concepts:
// - Atomics: a lock-free counter shared between tasks
// - Drop: runs cleanup on every exit path of a scope
// - tokio::sync::Notify: async wake-up for waiters
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::error;

/// Tracks outstanding units of work and lets a caller await zero.
#[derive(Debug, Default)]
pub struct WaitGroup {
    outstanding: AtomicUsize,
    idle: Notify,
}

impl WaitGroup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `n` more units of outstanding work.
    pub fn add(&self, n: usize) {
        self.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    /// Marks one unit of work as finished.
    ///
    /// Calling this more often than `add` is a bug. The counter is clamped at
    /// zero and the violation is logged instead of wrapping around.
    pub fn done(&self) {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.idle.notify_waiters(),
            Ok(_) => {}
            Err(_) => error!("wait group done() called with no outstanding work"),
        }
    }

    /// Current number of outstanding units.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Registers one unit of work and returns a ticket that finishes it on drop.
    pub fn enter(self: &Arc<Self>) -> WorkTicket {
        self.add(1);
        WorkTicket {
            group: Arc::clone(self),
        }
    }

    /// Waits until every registered unit of work has finished.
    pub async fn wait(&self) {
        loop {
            // Register interest before checking the counter so a `done()`
            // landing in between still wakes us up.
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// One registered unit of work. Dropping it calls `done()` exactly once.
#[derive(Debug)]
#[must_use = "dropping a WorkTicket immediately marks its work as done"]
pub struct WorkTicket {
    group: Arc<WaitGroup>,
}

impl Drop for WorkTicket {
    fn drop(&mut self) {
        self.group.done();
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why `self: &Arc<Self>` on enter()?
//    - The ticket has to keep the group alive after the caller's borrow ends
//    - Taking `&Arc<Self>` lets us clone the Arc into the ticket
//
// 2. What does fetch_update do?
//    - It retries a compare-and-swap until the closure's result sticks
//    - Returning None from the closure aborts the update (here: already zero)
//
// 3. Why `enable()` before checking the count?
//    - A Notified future normally only starts listening when first polled
//    - enable() makes it listen right away, so no wake-up can slip past
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_idle() {
        let group = WaitGroup::new();
        tokio::time::timeout(Duration::from_secs(1), group.wait())
            .await
            .expect("wait on an idle group should not block");
    }

    #[tokio::test]
    async fn test_ticket_drop_decrements() {
        let group = WaitGroup::new();
        let first = group.enter();
        let second = group.enter();
        assert_eq!(group.outstanding(), 2);

        drop(first);
        assert_eq!(group.outstanding(), 1);
        drop(second);
        assert_eq!(group.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_done_never_goes_negative() {
        let group = WaitGroup::new();
        group.done();
        assert_eq!(group.outstanding(), 0);

        group.add(1);
        assert_eq!(group.outstanding(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wait_blocks_until_nested_tasks_finish() {
        let group = WaitGroup::new();
        let finished = Arc::new(AtomicUsize::new(0));

        let ticket = group.enter();
        let (outer_group, outer_finished) = (Arc::clone(&group), Arc::clone(&finished));
        tokio::spawn(async move {
            let _ticket = ticket;
            // Spawn grandchildren after a delay, while the root ticket is held.
            tokio::time::sleep(Duration::from_millis(20)).await;
            for _ in 0..8 {
                let child = outer_group.enter();
                let child_finished = Arc::clone(&outer_finished);
                tokio::spawn(async move {
                    let _child = child;
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    child_finished.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        group.wait().await;
        assert_eq!(finished.load(Ordering::SeqCst), 8);
        assert_eq!(group.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_ticket_released_when_task_panics() {
        let group = WaitGroup::new();
        let ticket = group.enter();

        let handle = tokio::spawn(async move {
            let _ticket = ticket;
            panic!("branch blew up");
        });
        assert!(handle.await.is_err());

        assert_eq!(group.outstanding(), 0);
        group.wait().await;
    }
}
