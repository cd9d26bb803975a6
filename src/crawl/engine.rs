// src/crawl/engine.rs
// =============================================================================
// The traversal engine: a recursive, concurrent, depth-bounded crawl.
//
// How it works:
// 1. The initiator registers one unit of work and spawns the root traversal
// 2. Each traversal task:
//    a. stops right away if its depth budget is 0
//    b. takes the gate and claims its node in the visited registry
//       (already claimed -> give the gate back and stop)
//    c. fetches the node
//    d. for every edge: registers one unit of work, then spawns a child
//       traversal with one less depth
// 3. The initiator waits on the WaitGroup until every task, at any depth of
//    the task tree, has dropped its ticket
// 4. The visited set is read once, after the count reaches zero
//
// Lock scope:
// - LockScope::Claim (default) gives the gate back as soon as the node is
//   claimed, so fetches run in parallel. Marking before fetching is all the
//   deduplication needs.
// - LockScope::SpanFetch keeps the gate through the fetch and the fan-out,
//   so at most one fetch is in flight per session.
//
// There is no limit on how many tasks or fetches are in flight at once.
//
// The session also counts how many tasks are inside the gate. More than one
// at a time means the configured gate failed to exclude; that is logged and
// reported as an exclusion violation.
//
// Rust concepts:
// - Arc: shared ownership of session state across tasks
// - Drop guards: the gate permit and the work ticket release themselves
// - Trait objects: the fetcher, gate and spawner are all swappable
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use super::{CrawlConfig, CrawlEvent, CrawlReport, LockScope, VisitedRegistry};
use crate::fetch::Fetcher;
use crate::sync::{gate_for, ExclusionGate, GatePermit, Spawn, TokioSpawner, WaitGroup, WorkTicket};

/// Everything one crawl shares between its tasks.
struct SessionState {
    config: CrawlConfig,
    fetcher: Arc<dyn Fetcher>,
    spawner: Arc<dyn Spawn>,
    gate: Box<dyn ExclusionGate>,
    registry: VisitedRegistry,
    tracker: Arc<WaitGroup>,
    events: Mutex<Vec<CrawlEvent>>,
    gate_holders: AtomicUsize,
    gate_overlaps: AtomicUsize,
}

// Held while a task is inside the gate. Fields drop in declaration order, so
// the holder count goes down before the gate is released.
struct Exclusive<'a> {
    _holder: HolderCount<'a>,
    permit: GatePermit<'a>,
}

struct HolderCount<'a> {
    holders: &'a AtomicUsize,
}

impl Drop for HolderCount<'_> {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::AcqRel);
    }
}

impl SessionState {
    async fn enter_gate(&self) -> Exclusive<'_> {
        let permit = self.gate.acquire().await;
        if self.gate_holders.fetch_add(1, Ordering::AcqRel) > 0 {
            error!(gate = ?self.gate.kind(), "two tasks inside the exclusion gate at once");
            self.gate_overlaps.fetch_add(1, Ordering::AcqRel);
        }
        Exclusive {
            _holder: HolderCount {
                holders: &self.gate_holders,
            },
            permit,
        }
    }

    fn exclusion_violations(&self) -> usize {
        self.gate_overlaps.load(Ordering::Acquire) + self.registry.violations()
    }

    fn record(&self, event: CrawlEvent) {
        match &event {
            CrawlEvent::FetchFailed { .. } => warn!("{}", event),
            _ => info!("{}", event),
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// One crawl: its own registry, gate and completion tracker.
///
/// Sessions share nothing, so several can run side by side.
pub struct CrawlSession {
    state: Arc<SessionState>,
}

impl CrawlSession {
    /// A session that spawns its tasks on the ambient tokio runtime.
    pub fn new(config: CrawlConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_spawner(config, fetcher, Arc::new(TokioSpawner))
    }

    pub fn with_spawner(
        config: CrawlConfig,
        fetcher: Arc<dyn Fetcher>,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        Self::assemble(config, fetcher, spawner, gate_for(config.gate))
    }

    fn assemble(
        config: CrawlConfig,
        fetcher: Arc<dyn Fetcher>,
        spawner: Arc<dyn Spawn>,
        gate: Box<dyn ExclusionGate>,
    ) -> Self {
        Self {
            state: Arc::new(SessionState {
                config,
                fetcher,
                spawner,
                gate,
                registry: VisitedRegistry::new(),
                tracker: WaitGroup::new(),
                events: Mutex::new(Vec::new()),
                gate_holders: AtomicUsize::new(0),
                gate_overlaps: AtomicUsize::new(0),
            }),
        }
    }

    /// Units of work registered but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.state.tracker.outstanding()
    }

    /// Crawls from `root` and returns once every spawned task has finished.
    pub async fn run(&self, root: &str) -> CrawlReport {
        let config = self.state.config;
        info!(
            root,
            max_depth = config.max_depth,
            gate = ?self.state.gate.kind(),
            lock_scope = ?config.lock_scope,
            "starting crawl"
        );

        spawn_traversal(&self.state, root.to_string(), config.max_depth);
        self.state.tracker.wait().await;

        let visited = {
            let exclusive = self.state.enter_gate().await;
            self.state.registry.visited(&exclusive.permit)
        };
        let events = self
            .state
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let exclusion_violations = self.state.exclusion_violations();
        info!(visited = visited.len(), exclusion_violations, "crawl complete");

        CrawlReport {
            root: root.to_string(),
            config,
            visited,
            events,
            exclusion_violations,
        }
    }
}

/// Crawls `root` down to `max_depth` with the default gate and lock scope.
pub async fn run(root: &str, max_depth: usize, fetcher: Arc<dyn Fetcher>) -> CrawlReport {
    CrawlSession::new(CrawlConfig::new(max_depth), fetcher)
        .run(root)
        .await
}

// Registers the child's unit of work here, in the spawning context, and only
// then starts it.
fn spawn_traversal(state: &Arc<SessionState>, node: String, depth: usize) {
    let ticket = state.tracker.enter();
    let task_state = Arc::clone(state);

    state
        .spawner
        .spawn(Box::pin(traverse(task_state, node, depth, ticket)));
}

async fn traverse(state: Arc<SessionState>, node: String, depth: usize, _ticket: WorkTicket) {
    if depth == 0 {
        debug!(node = %node, "depth budget exhausted");
        return;
    }

    let exclusive = state.enter_gate().await;
    if !state.registry.claim(&exclusive.permit, &node) {
        debug!(node = %node, "already visited");
        return;
    }

    let held = match state.config.lock_scope {
        LockScope::Claim => {
            drop(exclusive);
            None
        }
        LockScope::SpanFetch => Some(exclusive),
    };

    state.record(CrawlEvent::FetchAttempt { node: node.clone() });

    match state.fetcher.fetch(&node).await {
        Ok(page) => {
            state.record(CrawlEvent::Found {
                node: node.clone(),
                depth,
                content: page.content,
            });
            for edge in page.edges {
                spawn_traversal(&state, edge, depth - 1);
            }
        }
        Err(err) => {
            state.record(CrawlEvent::FetchFailed {
                node: err.node().to_string(),
                error: err.to_string(),
            });
        }
    }

    // Gate first, then the ticket (dropped when the function returns).
    drop(held);
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does spawn_traversal take the ticket before spawning?
//    - tokio::spawn only schedules the task; it may not run for a while
//    - If the child registered itself, the parent could finish first and the
//      counter could briefly hit zero, letting wait() return too early
//
// 2. Why is `_ticket` a parameter and not a local?
//    - The ticket has to exist from the moment of spawning
//    - Parameters are dropped when the function returns on any path
//      (including the early returns above), so done() always runs once
//
// 3. Why is the recursion split across two functions?
//    - An async fn can't directly contain its own future (infinite size)
//    - spawn_traversal is a plain fn that boxes the child future, which
//      breaks the cycle
// -----------------------------------------------------------------------------
