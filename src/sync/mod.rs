// src/sync/mod.rs
// =============================================================================
// Synchronization building blocks for the crawler.
//
// Submodules:
// - gate: mutual exclusion around the visited registry (channel or mutex)
// - wait_group: counted barrier for a dynamically growing task tree
// - spawn: the capability to start detached concurrent work
// =============================================================================

mod gate;
mod spawn;
mod wait_group;

pub use gate::{gate_for, ChannelGate, ExclusionGate, GatePermit, LockGate};
pub use spawn::{Spawn, TokioSpawner};
pub use wait_group::{WaitGroup, WorkTicket};
