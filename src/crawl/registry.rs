// src/crawl/registry.rs
// =============================================================================
// The visited registry: which nodes have been claimed for fetching.
//
// A node is claimed (set to true) before it is fetched and is never
// unclaimed, even if the fetch fails. Every read and write takes a
// `&GatePermit`, so code that hasn't acquired the session's gate can't touch
// the map.
//
// The gate is what makes claims exclusive. The map sits behind a std Mutex
// only so it can be mutated through `&self`; that mutex is taken with
// try_lock, and finding it busy means the gate let two tasks in. Such
// violations are logged and counted, never silently absorbed.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::error;

use crate::sync::GatePermit;

#[derive(Debug, Default)]
pub struct VisitedRegistry {
    seen: Mutex<HashMap<String, bool>>,
    violations: AtomicUsize,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `node` visited. Returns false if it already was.
    pub fn claim(&self, permit: &GatePermit<'_>, node: &str) -> bool {
        let mut seen = self.entries(permit);
        if seen.get(node).copied().unwrap_or(false) {
            return false;
        }
        seen.insert(node.to_string(), true);
        true
    }

    /// All visited nodes, sorted.
    pub fn visited(&self, permit: &GatePermit<'_>) -> Vec<String> {
        let seen = self.entries(permit);
        let mut nodes: Vec<String> = seen
            .iter()
            .filter(|(_, visited)| **visited)
            .map(|(node, _)| node.clone())
            .collect();
        nodes.sort();
        nodes
    }

    /// How many times the registry was reached without real exclusivity.
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::Acquire)
    }

    fn entries(&self, permit: &GatePermit<'_>) -> MutexGuard<'_, HashMap<String, bool>> {
        if !permit.is_held() {
            self.violation("registry accessed with a permit whose gate is not held");
        }

        match self.seen.try_lock() {
            Ok(seen) => seen,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.violation("registry contended: the exclusion gate let two tasks in");
                self.seen.lock().unwrap_or_else(PoisonError::into_inner)
            }
        }
    }

    fn violation(&self, message: &str) {
        error!("{}", message);
        self.violations.fetch_add(1, Ordering::AcqRel);
    }
}
