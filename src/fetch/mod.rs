// src/fetch/mod.rs
// =============================================================================
// The Fetcher capability: given a node (a URL), return its content and the
// edges (links) found in it, or an error.
//
// Submodules:
// - canned: deterministic in-memory pages, optionally loaded from JSON
// - http: live pages over HTTP, links pulled out of the HTML
//
// The crawler treats a fetch as a black box. It is never retried and its
// result isn't cached; the visited registry alone decides whether it runs.
// =============================================================================

mod canned;
mod http;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use canned::{CannedFetcher, CannedPage};
pub use http::HttpFetcher;

/// What a successful fetch yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub content: String,
    pub edges: Vec<String>,
}

/// Why a fetch failed. Every variant names the node it was fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request to {node} failed: {source}")]
    Request {
        node: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{node} returned HTTP {status}")]
    Status { node: String, status: u16 },
}

impl FetchError {
    /// The node whose fetch failed.
    pub fn node(&self) -> &str {
        match self {
            FetchError::NotFound(node) => node,
            FetchError::Request { node, .. } => node,
            FetchError::Status { node, .. } => node,
        }
    }
}

/// Retrieves a node's content and outbound edges.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, node: &str) -> Result<Page, FetchError>;
}
