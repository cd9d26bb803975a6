// src/fetch/canned.rs
// =============================================================================
// A Fetcher that answers from a fixed table of pages.
//
// Used for:
// - The built-in `fixture` demo (the golang.org page graph)
// - Fixture files on disk (JSON: { "<url>": { "body": "...", "urls": [...] } })
// - Tests, which also read back how many times each node was fetched
//
// An optional latency makes every fetch sleep first, which widens the
// window for concurrent tasks to race each other.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FetchError, Fetcher, Page};

/// One page in a canned fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannedPage {
    pub body: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CannedFetcher {
    pages: HashMap<String, CannedPage>,
    latency: Duration,
    calls: Mutex<HashMap<String, usize>>,
}

impl CannedFetcher {
    pub fn new(pages: HashMap<String, CannedPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// Adds (or replaces) a page. Handy for building fixtures inline.
    pub fn page(mut self, node: &str, body: &str, urls: &[&str]) -> Self {
        self.pages.insert(
            node.to_string(),
            CannedPage {
                body: body.to_string(),
                urls: urls.iter().map(|u| u.to_string()).collect(),
            },
        );
        self
    }

    /// Makes every fetch sleep for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Parses a fixture from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let pages: HashMap<String, CannedPage> =
            serde_json::from_str(json).context("fixture is not a map of url -> {body, urls}")?;
        Ok(Self::new(pages))
    }

    /// Loads a fixture file from disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("invalid fixture {}", path.display()))
    }

    /// The golang.org page graph: four known pages, and `/cmd/` is linked
    /// from two of them but missing.
    pub fn golang_fixture() -> Self {
        Self::default()
            .page(
                "http://golang.org/",
                "The Go Programming Language",
                &["http://golang.org/pkg/", "http://golang.org/cmd/"],
            )
            .page(
                "http://golang.org/pkg/",
                "Packages",
                &[
                    "http://golang.org/",
                    "http://golang.org/cmd/",
                    "http://golang.org/pkg/fmt/",
                    "http://golang.org/pkg/os/",
                ],
            )
            .page(
                "http://golang.org/pkg/fmt/",
                "Package fmt",
                &["http://golang.org/", "http://golang.org/pkg/"],
            )
            .page(
                "http://golang.org/pkg/os/",
                "Package os",
                &["http://golang.org/", "http://golang.org/pkg/"],
            )
    }

    /// How many times `node` has been fetched, found or not.
    pub fn call_count(&self, node: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch(&self, node: &str) -> Result<Page, FetchError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(node.to_string())
            .or_insert(0) += 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.pages.get(node) {
            Some(page) => {
                debug!(node, edges = page.urls.len(), "serving canned page");
                Ok(Page {
                    content: page.body.clone(),
                    edges: page.urls.clone(),
                })
            }
            None => Err(FetchError::NotFound(node.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_golang_fixture_serves_known_page() {
        let fetcher = CannedFetcher::golang_fixture();
        let page = fetcher.fetch("http://golang.org/pkg/fmt/").await.unwrap();

        assert_eq!(page.content, "Package fmt");
        assert_eq!(page.edges, vec!["http://golang.org/", "http://golang.org/pkg/"]);
        assert_eq!(fetcher.pages.len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_page_is_not_found() {
        let fetcher = CannedFetcher::golang_fixture();
        let err = fetcher.fetch("http://golang.org/cmd/").await.unwrap_err();

        assert!(matches!(err, FetchError::NotFound(_)));
        assert_eq!(err.node(), "http://golang.org/cmd/");
        // A failed lookup still counts as a call.
        assert_eq!(fetcher.call_count("http://golang.org/cmd/"), 1);
        assert_eq!(fetcher.call_count("http://golang.org/"), 0);
    }

    #[tokio::test]
    async fn test_calls_are_counted_per_node() {
        let fetcher = CannedFetcher::default().page("a", "A", &[]);
        fetcher.fetch("a").await.unwrap();
        fetcher.fetch("a").await.unwrap();
        let _ = fetcher.fetch("b").await;

        assert_eq!(fetcher.call_count("a"), 2);
        assert_eq!(fetcher.call_count("b"), 1);
        assert_eq!(fetcher.total_calls(), 3);
    }

    #[test]
    fn test_fixture_from_json() {
        let json = r#"{
            "http://a/": { "body": "A", "urls": ["http://b/"] },
            "http://b/": { "body": "B" }
        }"#;
        let fetcher = CannedFetcher::from_json_str(json).unwrap();

        assert_eq!(fetcher.pages.len(), 2);
        assert_eq!(fetcher.pages["http://b/"].urls, Vec::<String>::new());
    }

    #[test]
    fn test_fixture_rejects_malformed_json() {
        assert!(CannedFetcher::from_json_str(r#"["not", "a", "map"]"#).is_err());
    }

    #[test]
    fn test_missing_fixture_file_reports_path() {
        let err = CannedFetcher::from_json_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let fetcher = CannedFetcher::default()
            .page("a", "A", &[])
            .with_latency(Duration::from_millis(50));

        let started = tokio::time::Instant::now();
        fetcher.fetch("a").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
