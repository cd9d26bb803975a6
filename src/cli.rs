// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands, both running the same concurrent crawl:
// - fixture: crawl a canned page graph (built-in golang.org graph or a JSON file)
// - site: crawl a live website over HTTP
//
// The traversal knobs (depth, gate, lock scope, output) are shared by both
// and pulled in with #[command(flatten)].
// =============================================================================

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use graph_crawler::crawl::{CrawlConfig, GateKind, LockScope};

#[derive(Parser, Debug)]
#[command(
    name = "graph-crawler",
    version = "0.1.0",
    about = "Crawl a link graph concurrently, visiting every page at most once",
    long_about = "graph-crawler follows links from a root page up to a maximum depth. \
                  Every discovered link is crawled by its own task, and a shared visited \
                  set guarantees each page is fetched once."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a canned page graph
    ///
    /// Example: graph-crawler fixture --gate channel
    Fixture {
        /// JSON fixture: { "<url>": { "body": "...", "urls": ["<url>", ...] } }
        ///
        /// Without it, the built-in golang.org graph is used
        #[arg(long)]
        file: Option<PathBuf>,

        /// Page to start from
        #[arg(long, default_value = "http://golang.org/")]
        root: String,

        /// Simulated latency of every fetch, in milliseconds
        #[arg(long, default_value_t = 500)]
        latency_ms: u64,

        #[command(flatten)]
        traversal: TraversalArgs,
    },

    /// Crawl a live website
    ///
    /// Example: graph-crawler site https://example.com --max-depth 2
    Site {
        /// Website URL to start from
        website_url: String,

        /// Also follow links that leave the starting domain
        #[arg(long)]
        follow_external: bool,

        #[command(flatten)]
        traversal: TraversalArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct TraversalArgs {
    /// Maximum crawl depth
    ///
    /// Depth 1 = just the starting page
    /// Depth 2 = starting page + all pages it links to
    /// Depth 0 = nothing is fetched
    #[arg(long, default_value_t = 4)]
    pub max_depth: usize,

    /// How the visited set is locked
    #[arg(long, value_enum, default_value_t = GateKind::Lock)]
    pub gate: GateKind,

    /// How long the lock is held once a page is claimed
    #[arg(long, value_enum, default_value_t = LockScope::Claim)]
    pub lock_scope: LockScope,

    /// Output the report as JSON instead of a plain list
    #[arg(long)]
    pub json: bool,

    /// Log debug detail (skipped pages, link counts) to stderr
    #[arg(long, short)]
    pub verbose: bool,
}

impl TraversalArgs {
    pub fn config(&self) -> CrawlConfig {
        CrawlConfig::new(self.max_depth)
            .with_gate(self.gate)
            .with_lock_scope(self.lock_scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fixture_defaults() {
        let cli = Cli::parse_from(["graph-crawler", "fixture"]);
        match cli.command {
            Commands::Fixture {
                file,
                root,
                latency_ms,
                traversal,
            } => {
                assert_eq!(file, None);
                assert_eq!(root, "http://golang.org/");
                assert_eq!(latency_ms, 500);
                assert_eq!(traversal.config(), CrawlConfig::default());
                assert!(!traversal.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_site_with_traversal_flags() {
        let cli = Cli::parse_from([
            "graph-crawler",
            "site",
            "https://example.com",
            "--max-depth",
            "2",
            "--gate",
            "channel",
            "--lock-scope",
            "span-fetch",
            "--json",
        ]);
        match cli.command {
            Commands::Site {
                website_url,
                follow_external,
                traversal,
            } => {
                assert_eq!(website_url, "https://example.com");
                assert!(!follow_external);
                assert_eq!(
                    traversal.config(),
                    CrawlConfig::new(2)
                        .with_gate(GateKind::Channel)
                        .with_lock_scope(LockScope::SpanFetch)
                );
                assert!(traversal.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
