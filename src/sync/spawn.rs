// src/sync/spawn.rs
// =============================================================================
// The capability to start a detached unit of concurrent work.
//
// The traversal engine never calls `tokio::spawn` directly; it goes through
// `Spawn`. Completion is reported through the WaitGroup ticket the task
// carries, not through a JoinHandle, so spawned work is fire-and-forget.
// =============================================================================

use futures::future::BoxFuture;

/// Starts a future running concurrently with the caller.
pub trait Spawn: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns onto the ambient tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl Spawn for TokioSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        // The JoinHandle is dropped on purpose; the task keeps running.
        tokio::spawn(task);
    }
}
