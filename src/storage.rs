//! Deduplicated corpus persistence and the per-author projection.
//!
//! The corpus file is the dedup index: a quote's text is its identity key,
//! and the file is rewritten sorted by that key so repeated runs produce
//! reproducible diffs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ScraperConfig;

/// One extracted quote.
///
/// Field order matches the sorted-key form the corpus file is written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub author: String,
    pub quote: String,
    pub tags: Vec<String>,
}

/// Error type for corpus and projection I/O. Nothing here is retried.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize quotes for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable quote storage rooted at the configured output directory.
pub struct QuoteStore {
    corpus_path: PathBuf,
    author_path: PathBuf,
}

impl QuoteStore {
    /// Open the store, creating the output directory and an empty corpus
    /// file if none exists yet. Idempotent.
    pub async fn open(config: &ScraperConfig) -> Result<Self, StorageError> {
        let dir = &config.files.directory;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;

        let store = Self {
            corpus_path: config.corpus_path(),
            author_path: config.author_path(),
        };
        if !store.corpus_path.exists() {
            store.write_quotes(&store.corpus_path, &[]).await?;
        }
        info!(corpus = %store.corpus_path.display(), "quote store ready");
        Ok(store)
    }

    /// Read the full corpus back from disk.
    pub async fn read_corpus(&self) -> Result<Vec<Quote>, StorageError> {
        let bytes =
            tokio::fs::read(&self.corpus_path)
                .await
                .map_err(|source| StorageError::Io {
                    path: self.corpus_path.clone(),
                    source,
                })?;
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            path: self.corpus_path.clone(),
            source,
        })
    }

    /// Merge a batch of quotes into the corpus.
    ///
    /// The merge is a set union keyed by quote text: records whose text is
    /// already present are dropped, first seen wins. Duplicates inside the
    /// batch are folded the same way, so the corpus never carries two records
    /// with the same text.
    pub async fn save(&self, batch: &[Quote]) -> Result<(), StorageError> {
        if batch.is_empty() {
            info!("empty batch, nothing to save");
            return Ok(());
        }

        let mut corpus = self.read_corpus().await?;
        let mut seen: HashSet<String> = corpus.iter().map(|q| q.quote.clone()).collect();

        let before = corpus.len();
        for quote in batch {
            if seen.insert(quote.quote.clone()) {
                corpus.push(quote.clone());
            }
        }

        let added = corpus.len() - before;
        if added == 0 {
            info!(batch = batch.len(), "no new quotes in batch");
        } else {
            info!(added, batch = batch.len(), "merging new quotes into corpus");
        }
        self.write_quotes(&self.corpus_path, &corpus).await
    }

    /// Overwrite the corpus with an empty list.
    pub async fn clear(&self) -> Result<(), StorageError> {
        info!(corpus = %self.corpus_path.display(), "clearing corpus");
        self.write_quotes(&self.corpus_path, &[]).await
    }

    /// Look up all quotes by an author and rebuild the projection file.
    ///
    /// The projection is a view, not an accumulator: the file is recreated
    /// empty before anything else happens, then overwritten with the matches.
    /// Returns a 1-indexed enumeration of the matched quote texts, or a
    /// human-readable message; storage failures become messages too, never
    /// errors, so this is safe to call from an interactive invocation.
    pub async fn quotes_by_author(&self, author: &str) -> String {
        if let Err(e) = self.write_quotes(&self.author_path, &[]).await {
            warn!("failed to reset author projection: {e}");
            return format!("Failed to look up quotes: {e}");
        }

        if author.trim().is_empty() {
            warn!("blank author name given");
            return "Author name must not be empty".to_string();
        }

        let corpus = match self.read_corpus().await {
            Ok(corpus) => corpus,
            Err(e) => {
                warn!("failed to read corpus for author lookup: {e}");
                return format!("Failed to look up quotes: {e}");
            }
        };

        let matched: Vec<Quote> = corpus.into_iter().filter(|q| q.author == author).collect();
        if matched.is_empty() {
            info!(author, "no quotes stored for author");
            return format!("No quotes found for author '{author}'");
        }

        if let Err(e) = self.write_quotes(&self.author_path, &matched).await {
            warn!("failed to write author projection: {e}");
            return format!("Failed to look up quotes: {e}");
        }
        info!(author, count = matched.len(), "author projection written");

        matched
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q.quote))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write a quote list sorted by quote text, pretty-printed.
    async fn write_quotes(&self, path: &Path, quotes: &[Quote]) -> Result<(), StorageError> {
        let mut sorted: Vec<&Quote> = quotes.iter().collect();
        sorted.sort_by(|a, b| a.quote.cmp(&b.quote));

        let json = serde_json::to_vec_pretty(&sorted).map_err(|source| StorageError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), count = quotes.len(), "quote file written");
        Ok(())
    }
}
