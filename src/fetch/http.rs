// src/fetch/http.rs
// =============================================================================
// A Fetcher that downloads real pages.
//
// How it works:
// 1. GET the node's URL (10 second timeout)
// 2. Anything other than a 2xx response is a fetch error
// 3. Parse the body as HTML and collect every <a href>
// 4. Resolve relative links against the page URL, keep http/https only
// 5. Optionally keep only links on one domain
//
// Links are resolved with Url::join and nothing more, so two spellings of
// the same resource are two different nodes.
// =============================================================================

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::{FetchError, Fetcher, Page};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    allowed_domain: Option<String>,
}

impl HttpFetcher {
    /// Builds a fetcher. With `allowed_domain` set, links to other domains
    /// are dropped from every page's edges.
    pub fn new(allowed_domain: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            allowed_domain,
        })
    }

    /// Builds a fetcher for crawling `root`, staying on its domain unless
    /// `follow_external` is set.
    pub fn for_site(root: &str, follow_external: bool) -> Result<Self> {
        let start = Url::parse(root).map_err(|e| anyhow!("Invalid URL '{}': {}", root, e))?;

        let allowed_domain = if follow_external {
            None
        } else {
            let domain = start
                .domain()
                .ok_or_else(|| anyhow!("URL has no domain: {}", root))?;
            Some(domain.to_string())
        };

        Self::new(allowed_domain)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, node: &str) -> Result<Page, FetchError> {
        let request_error = |source| FetchError::Request {
            node: node.to_string(),
            source,
        };

        let response = self.client.get(node).send().await.map_err(request_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                node: node.to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await.map_err(request_error)?;
        let edges = extract_links(&html, node, self.allowed_domain.as_deref());
        debug!(node, edges = edges.len(), "downloaded page");

        Ok(Page {
            content: page_title(&html).unwrap_or_default(),
            edges,
        })
    }
}

// The page's <title>, used as the node's content in crawl output.
fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").expect("static selector is valid");

    document
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
}

// Collects absolute http(s) links from an HTML page.
//
// Example:
//   html = "<a href='/docs'>Docs</a>", page_url = "https://example.com/page"
//   -> ["https://example.com/docs"]
fn extract_links(html: &str, page_url: &str, allowed_domain: Option<&str>) -> Vec<String> {
    let mut links = Vec::new();

    let base = match Url::parse(page_url) {
        Ok(url) => url,
        Err(_) => return links,
    };

    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(edge) = web_edge(&base, href) else {
            continue;
        };

        if allowed_domain.map_or(true, |domain| edge.domain() == Some(domain)) {
            links.push(edge.to_string());
        }
    }

    links
}

// Turns an href into a crawlable edge: resolved against the page and on
// http(s). In-page anchors point back at the same node and are dropped.
fn web_edge(base: &Url, href: &str) -> Option<Url> {
    if href.starts_with('#') {
        return None;
    }

    let edge = base.join(href).ok()?;
    matches!(edge.scheme(), "http" | "https").then_some(edge)
}
