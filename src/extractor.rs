//! Page sampling and quote extraction.
//!
//! Draws a uniform random sample of page numbers from the configured
//! universe, visits each one through the session's retry wrapper, and turns
//! every quote block into a [`Quote`]. The whole batch is handed to storage
//! in one piece: a failure on any page discards everything from the run.

use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::selectors;
use crate::session::{Session, WaitTimeout};
use crate::storage::{Quote, QuoteStore, StorageError};

/// Extraction failure. Raw driver errors are re-tagged at this boundary.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("page {page} unreachable after all retry attempts: {url}")]
    NavigationExhausted { page: usize, url: String },

    #[error("page {page} never showed any quote blocks: {source}")]
    PageTimeout {
        page: usize,
        #[source]
        source: WaitTimeout,
    },

    #[error("malformed quote block on page {page}: {detail}")]
    MalformedQuote { page: usize, detail: String },

    #[error("browser error while reading page {page}: {source}")]
    Driver {
        page: usize,
        #[source]
        source: CdpError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Pick which pages to visit.
///
/// With no request the configured default applies. Requests beyond the
/// universe are clamped down to it; a request of zero means the whole
/// universe, not zero pages. The sample is uniform and without replacement,
/// so the result never repeats a page and every value lies in
/// `[1, total_pages]`.
#[must_use]
pub fn select_pages(requested: Option<usize>, default_count: usize, total_pages: usize) -> Vec<usize> {
    let mut count = requested.unwrap_or(default_count);

    if count > total_pages {
        warn!(
            requested = count,
            total_pages, "more pages requested than exist, sampling all of them"
        );
        count = total_pages;
    }
    if count == 0 {
        warn!(total_pages, "page count must be positive, sampling all pages");
        count = total_pages;
    }

    rand::seq::index::sample(&mut rand::rng(), total_pages, count)
        .into_iter()
        .map(|i| i + 1)
        .collect()
}

/// Visits sampled pages and extracts one [`Quote`] per matched block.
pub struct QuoteExtractor<'a> {
    session: &'a Session,
    store: &'a QuoteStore,
    config: &'a ScraperConfig,
}

impl<'a> QuoteExtractor<'a> {
    #[must_use]
    pub fn new(session: &'a Session, store: &'a QuoteStore, config: &'a ScraperConfig) -> Self {
        Self {
            session,
            store,
            config,
        }
    }

    /// Sample pages, extract every quote on each, and persist the batch.
    ///
    /// All-or-nothing per invocation: a partially-scraped batch is not to be
    /// trusted, so the first failure throws the accumulated records away.
    pub async fn scrape_random_pages(&self, requested: Option<usize>) -> Result<(), ExtractError> {
        let pages = select_pages(
            requested,
            self.config.behavior.pages_to_scrape,
            self.config.behavior.total_pages,
        );
        info!(count = pages.len(), ?pages, "pages selected for this run");

        let mut batch = Vec::new();
        for page in pages {
            batch.extend(self.extract_page(page).await?);
        }

        info!(quotes = batch.len(), "handing the batch to storage");
        self.store.save(&batch).await?;
        info!("scrape completed");
        Ok(())
    }

    /// Extract all quotes from one listing page.
    ///
    /// Navigation exhaustion is fatal for the run, not a silent skip.
    pub async fn extract_page(&self, page: usize) -> Result<Vec<Quote>, ExtractError> {
        let url = self.config.site.page_url(page);
        if !self.session.navigate_with_retry(&url).await {
            return Err(ExtractError::NavigationExhausted { page, url });
        }

        let blocks = self
            .session
            .wait_for_all(selectors::QUOTE)
            .await
            .map_err(|source| ExtractError::PageTimeout { page, source })?;

        let mut quotes = Vec::with_capacity(blocks.len());
        for block in &blocks {
            quotes.push(parse_quote_block(block, page).await?);
        }
        info!(page, count = quotes.len(), "page extracted");
        Ok(quotes)
    }
}

/// Map one quote block to a [`Quote`] via its text, author, and tag
/// sub-elements.
async fn parse_quote_block(block: &Element, page: usize) -> Result<Quote, ExtractError> {
    let text = read_text(block, selectors::QUOTE_TEXT, page).await?;
    let author = read_text(block, selectors::QUOTE_AUTHOR, page).await?;
    let tag_line = read_text(block, selectors::QUOTE_TAGS, page).await?;

    Ok(Quote {
        author,
        quote: text,
        tags: parse_tags(&tag_line),
    })
}

async fn read_text(block: &Element, selector: &str, page: usize) -> Result<String, ExtractError> {
    let element =
        block
            .find_element(selector)
            .await
            .map_err(|e| ExtractError::MalformedQuote {
                page,
                detail: format!("missing '{selector}': {e}"),
            })?;
    element
        .inner_text()
        .await
        .map_err(|source| ExtractError::Driver { page, source })?
        .ok_or_else(|| ExtractError::MalformedQuote {
            page,
            detail: format!("'{selector}' has no text"),
        })
}

/// Split a tag line into tag words, dropping the fixed literal prefix.
fn parse_tags(tag_line: &str) -> Vec<String> {
    tag_line
        .strip_prefix(selectors::TAGS_PREFIX)
        .unwrap_or(tag_line)
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_prefix_is_stripped() {
        assert_eq!(parse_tags("Tags: change deep-thoughts world"), vec![
            "change",
            "deep-thoughts",
            "world"
        ]);
    }

    #[test]
    fn tag_line_without_prefix_still_splits() {
        assert_eq!(parse_tags("love life"), vec!["love", "life"]);
    }

    #[test]
    fn empty_tag_line_yields_no_tags() {
        assert!(parse_tags("Tags: ").is_empty());
        assert!(parse_tags("").is_empty());
    }
}
