// src/crawl/report.rs
// =============================================================================
// What a crawl session observed.
//
// - CrawlEvent: one line of the crawl log (attempt, found, failed)
// - CrawlReport: the final result, with the visited set and the event log
//
// Events arrive in whatever order concurrent tasks produce them; only the
// per-node order (attempt before found/failed) is guaranteed.
// =============================================================================

use std::fmt;

use serde::Serialize;

use super::CrawlConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    /// The node was claimed and is about to be fetched
    FetchAttempt { node: String },
    /// The fetch succeeded at this remaining depth
    Found {
        node: String,
        depth: usize,
        content: String,
    },
    /// The fetch failed; nothing below this node is explored
    FetchFailed { node: String, error: String },
}

impl CrawlEvent {
    pub fn node(&self) -> &str {
        match self {
            CrawlEvent::FetchAttempt { node }
            | CrawlEvent::Found { node, .. }
            | CrawlEvent::FetchFailed { node, .. } => node,
        }
    }
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlEvent::FetchAttempt { node } => write!(f, "Fetching: {}", node),
            CrawlEvent::Found {
                node,
                depth,
                content,
            } => write!(f, "found:[depth:{}] {} {:?}", depth, node, content),
            CrawlEvent::FetchFailed { error, .. } => write!(f, "{}", error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub root: String,
    pub config: CrawlConfig,
    /// Every node claimed during the run, failed fetches included. Sorted.
    pub visited: Vec<String>,
    pub events: Vec<CrawlEvent>,
    /// Times the gate was found not to exclude. Always 0 for a sound gate.
    pub exclusion_violations: usize,
}

impl CrawlReport {
    /// How many fetch attempts were logged for `node`.
    pub fn fetch_attempts(&self, node: &str) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, CrawlEvent::FetchAttempt { .. }) && e.node() == node)
            .count()
    }

    pub fn found(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            CrawlEvent::Found { node, .. } => Some(node.as_str()),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            CrawlEvent::FetchFailed { node, .. } => Some(node.as_str()),
            _ => None,
        })
    }
}
