// src/crawl/mod.rs
// =============================================================================
// This module runs the concurrent crawl.
//
// Features:
// - Recursive fan-out: every discovered link becomes its own task
// - Each node is fetched at most once, however many links point at it
// - Depth budget per branch (root = max_depth, children = one less)
// - Selectable locking strategy (channel or mutex) and lock scope
// - Waits for the whole, dynamically growing task tree before reporting
//
// Submodules:
// - config: CrawlConfig, GateKind, LockScope
// - engine: CrawlSession and the traversal itself
// - registry: the visited set
// - report: crawl events and the final report
// =============================================================================

mod config;
mod engine;
mod registry;
mod report;

pub use config::{CrawlConfig, GateKind, LockScope};
pub use engine::{run, CrawlSession};
pub use registry::VisitedRegistry;
pub use report::{CrawlEvent, CrawlReport};
