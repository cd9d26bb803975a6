// src/lib.rs
// =============================================================================
// graph-crawler: a concurrent, depth-bounded link-graph crawler.
//
// Modules:
// - crawl: the traversal engine, its configuration and its report
// - fetch: the Fetcher capability plus canned and HTTP implementations
// - sync: the locking gates, the wait group and the spawn capability
//
// Quick start:
//
//     let fetcher = Arc::new(CannedFetcher::golang_fixture());
//     let report = graph_crawler::crawl::run("http://golang.org/", 4, fetcher).await;
//     for node in &report.visited { println!("{}", node); }
// =============================================================================

pub mod crawl;
pub mod fetch;
pub mod sync;
