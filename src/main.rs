//! CLI entry point for the quote crawler.
//!
//! Three independent selectors: a page count, a corpus-file rename (takes
//! effect on future runs), and an author lookup. The browser session is
//! released on every exit path of the scrape.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quotescrape::{Authenticator, QuoteExtractor, QuoteStore, ScraperConfig, Session};

#[derive(Debug, Parser)]
#[command(name = "quotescrape", version, about = "Sample pages from quotes.toscrape.com and keep a deduplicated quote corpus")]
struct Cli {
    /// Number of pages to sample (defaults to the configured count)
    #[arg(short, long)]
    pages: Option<usize>,

    /// Rename the corpus file in the persisted configuration, then exit
    #[arg(short, long)]
    output: Option<String>,

    /// Print stored quotes by this author and rebuild the projection file
    #[arg(short, long)]
    author: Option<String>,

    /// Configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ScraperConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    info!("quotescrape started");

    if let Some(output) = cli.output.as_deref() {
        // affects future runs, not this one
        ScraperConfig::set_corpus_file(output, &cli.config)?;
        return Ok(());
    }

    let store = QuoteStore::open(&config).await?;

    if let Some(author) = cli.author.as_deref() {
        println!("{}", store.quotes_by_author(author).await);
        if cli.pages.is_none() {
            return Ok(());
        }
    }

    let session = Session::launch(&config).await?;
    let result = scrape(&session, &store, &config, cli.pages).await;
    session.close().await;
    result
}

async fn scrape(
    session: &Session,
    store: &QuoteStore,
    config: &ScraperConfig,
    pages: Option<usize>,
) -> Result<()> {
    let authenticator = Authenticator::new(config);
    // extraction is not gated on a successful login
    if let Err(e) = authenticator.login(session).await {
        warn!("login failed, continuing unauthenticated: {e}");
    }

    let extractor = QuoteExtractor::new(session, store, config);
    extractor.scrape_random_pages(pages).await?;
    Ok(())
}
