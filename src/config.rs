//! Run configuration, loaded once at startup and passed by reference into
//! every component.
//!
//! The file is JSON with one object per concern (site, credentials, behavior,
//! files, browser). Every field has a default so a partial file loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Error type for configuration loading and rewriting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("configuration file must be JSON: {0}")]
    NotJson(PathBuf),

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus file name must not be empty")]
    EmptyFileName,
}

/// Target site parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://quotes.toscrape.com".to_string(),
        }
    }
}

impl SiteConfig {
    /// URL of one listing page in the sampling universe.
    #[must_use]
    pub fn page_url(&self, page: usize) -> String {
        format!("{}/page/{}/", self.base_url.trim_end_matches('/'), page)
    }
}

/// Login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

/// Sampling bounds and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Pages sampled per run when the CLI does not override it.
    pub pages_to_scrape: usize,
    /// Size of the page universe; pages are drawn from `[1, total_pages]`.
    pub total_pages: usize,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            pages_to_scrape: 5,
            total_pages: 10,
            retry_attempts: 3,
            retry_delay_secs: 2,
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub directory: PathBuf,
    pub corpus_file: String,
    pub author_file: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./quotes"),
            corpus_file: "quotes.json".to_string(),
            author_file: "author_quotes.json".to_string(),
        }
    }
}

/// Browser rendering and wait timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound for element waits.
    pub wait_timeout_secs: u64,
    /// Interval between element lookups while waiting.
    pub poll_interval_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            wait_timeout_secs: 10,
            poll_interval_ms: 500,
        }
    }
}

/// Retry parameters applied uniformly to every resilient navigation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, never less than one.
    pub attempts: u32,
    /// Sleep between attempts. Not applied after the final attempt.
    pub delay: Duration,
}

/// Bounded-wait parameters for element lookups.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Immutable run parameters for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub site: SiteConfig,
    pub credentials: Credentials,
    pub behavior: BehaviorConfig,
    pub files: FilesConfig,
    pub browser: BrowserSettings,
}

impl ScraperConfig {
    /// Load the configuration from a JSON file.
    ///
    /// A missing file, a non-`.json` path, or a file that does not parse is
    /// fatal for the run.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(ConfigError::NotJson(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Rewrite the corpus filename in the persisted configuration file.
    ///
    /// This changes what FUTURE runs write to; the configuration already
    /// loaded by the current run is left untouched. A `.json` suffix is
    /// appended when absent.
    pub fn set_corpus_file(name: &str, config_path: &Path) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyFileName);
        }
        let file_name = if name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{name}.json")
        };

        let text = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;
        let mut value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
                path: config_path.to_path_buf(),
                source,
            })?;

        value["files"]["corpus_file"] = serde_json::Value::String(file_name.clone());

        let pretty =
            serde_json::to_string_pretty(&value).map_err(|source| ConfigError::Malformed {
                path: config_path.to_path_buf(),
                source,
            })?;
        std::fs::write(config_path, pretty).map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;

        info!(file_name, path = %config_path.display(), "corpus file renamed in persisted configuration");
        Ok(())
    }

    /// Navigation retry parameters.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.behavior.retry_attempts.max(1),
            delay: Duration::from_secs(self.behavior.retry_delay_secs),
        }
    }

    /// Element-wait parameters.
    #[must_use]
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_secs(self.browser.wait_timeout_secs),
            poll_interval: Duration::from_millis(self.browser.poll_interval_ms),
        }
    }

    /// Path of the persisted corpus file.
    #[must_use]
    pub fn corpus_path(&self) -> PathBuf {
        self.files.directory.join(&self.files.corpus_file)
    }

    /// Path of the per-author projection file.
    #[must_use]
    pub fn author_path(&self) -> PathBuf {
        self.files.directory.join(&self.files.author_file)
    }
}
