//! Archival crawler command line.
//!
//! Attaches to a browser started with `--remote-debugging-port`, crawls
//! breadth-first from the seed URLs within the scope prefixes, and appends
//! every captured exchange to a WARC file.
//!
//! Usage:
//!   cdp-crawler --seed https://example.com/
//!   cdp-crawler --seed https://example.com/docs/ --scope https://example.com/ --max-pages 50
//!   cdp-crawler --port 9222 --new-tab --warc out/site.warc --seed https://example.com/ --debug

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cdp_crawler::driver::{DEFAULT_HOST, DEFAULT_PORT};
use cdp_crawler::{
    Crawler, MemoryFrontier, Result, SessionBuilder, SessionOptions, UrlScope, WarcWriter,
};

// ============================================================================
// Constants
// ============================================================================

/// Analytics scripts blocked unless `--block` overrides the list.
const DEFAULT_BLOCKED_URLS: [&str; 2] = [
    "http://www.google-analytics.com/ga.js",
    "https://ssl.google-analytics.com/ga.js",
];

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "cdp-crawler",
    about = "Crawl a site through a running browser and archive it as WARC",
    version
)]
struct Args {
    /// Remote-debugging host
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Remote-debugging port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// URL to start from (repeatable)
    #[arg(long = "seed", required = true)]
    seeds: Vec<String>,

    /// URL prefix to stay within (repeatable; defaults to each seed)
    #[arg(long = "scope")]
    scopes: Vec<String>,

    /// WARC output file
    #[arg(long, default_value = "data/crawl.warc")]
    warc: PathBuf,

    /// URL pattern to block (repeatable; defaults to analytics scripts)
    #[arg(long = "block")]
    blocked: Vec<String>,

    /// Open a fresh tab instead of attaching to the first one
    #[arg(long)]
    new_tab: bool,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Per-visit timeout in seconds
    #[arg(long, default_value_t = 10)]
    visit_timeout: u64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        error!(error = %e, "Crawl aborted");
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` takes precedence unless `--debug` is given.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("cdp_crawler=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cdp_crawler=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Returns the configured block list, or the analytics scripts if none.
fn blocked_or_default(blocked: Vec<String>) -> Vec<String> {
    if blocked.is_empty() {
        DEFAULT_BLOCKED_URLS.iter().map(|s| s.to_string()).collect()
    } else {
        blocked
    }
}

async fn run(args: Args) -> Result<()> {
    let scope = if args.scopes.is_empty() {
        UrlScope::from_prefixes(&args.seeds)
    } else {
        UrlScope::from_prefixes(&args.scopes)
    };

    let blocked = blocked_or_default(args.blocked);

    let writer = WarcWriter::create(&args.warc)?;

    let options = SessionOptions::new().with_visit_timeout(Duration::from_secs(args.visit_timeout));
    let mut session = SessionBuilder::new()
        .host(args.host)
        .port(args.port)
        .new_tab(args.new_tab)
        .block_urls(blocked)
        .options(options)
        .connect()
        .await?;
    session.set_exchange_handler(writer.into_handler());

    let mut crawler = Crawler::new(session, MemoryFrontier::new(), scope);
    for seed in &args.seeds {
        crawler.seed(seed)?;
    }

    let outcome = tokio::select! {
        result = crawler.run(args.max_pages) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    crawler.session().close();

    match outcome {
        Some(result) => {
            let stats = result?;
            info!(warc = %args.warc.display(), "Archive written");
            println!("{stats}");
        }
        None => warn!(warc = %args.warc.display(), "Interrupted"),
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
