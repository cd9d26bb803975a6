// src/crawl/config.rs
// =============================================================================
// Knobs for a single crawl session.
//
// - max_depth: how many hops from the root are fetched (root = 1 hop)
// - gate: which mutual-exclusion strategy guards the visited registry
// - lock_scope: how long a task keeps the gate after claiming a node
// =============================================================================

use clap::ValueEnum;
use serde::Serialize;

/// Which mutual-exclusion strategy guards the visited registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// A single-slot channel used as a binary semaphore
    Channel,
    /// A classic mutex
    #[default]
    Lock,
}

/// How long a task holds the gate once it has claimed a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScope {
    /// Release right after marking the node visited; fetches run in parallel
    #[default]
    Claim,
    /// Hold the gate through the fetch and fan-out; fetches run one at a time
    SpanFetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrawlConfig {
    pub max_depth: usize,
    pub gate: GateKind,
    pub lock_scope: LockScope,
}

impl CrawlConfig {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    pub fn with_gate(mut self, gate: GateKind) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_lock_scope(mut self, lock_scope: LockScope) -> Self {
        self.lock_scope = lock_scope;
        self
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            gate: GateKind::default(),
            lock_scope: LockScope::default(),
        }
    }
}
