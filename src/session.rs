//! Browser session lifecycle and resilient navigation.
//!
//! One chromiumoxide browser, its event-handler task, and a single tab the
//! whole run navigates. Transient navigation failures are retried here with a
//! fixed delay; element lookups are bounded polling loops. Nothing below this
//! boundary surfaces a raw navigation error to callers of the retry path.

use std::future::Future;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::seq::IndexedRandom;
use thiserror::Error;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::{RetryPolicy, ScraperConfig, WaitPolicy};

/// Client identity strings one of which is picked at random per session.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.6778.205 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.6723.91 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:132.0) Gecko/20100101 Firefox/132.0",
];

/// An element wait that hit its deadline.
#[derive(Debug, Error)]
#[error("timed out after {waited:?} waiting for '{selector}'")]
pub struct WaitTimeout {
    pub selector: String,
    pub waited: Duration,
}

/// One live browser session, exclusively owned by the run.
pub struct Session {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
    page: Page,
    user_data_dir: Option<PathBuf>,
    retry: RetryPolicy,
    wait: WaitPolicy,
}

impl Session {
    /// Launch the browser and open the tab the run will navigate.
    ///
    /// Failure here is fatal: without a session nothing else can proceed.
    pub async fn launch(config: &ScraperConfig) -> Result<Self> {
        let chrome_path = match find_browser_executable() {
            Ok(path) => path,
            Err(_) => download_managed_browser().await?,
        };

        let user_agent = USER_AGENTS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let user_data_dir =
            std::env::temp_dir().join(format!("quotescrape_chrome_{}", std::process::id()));
        std::fs::create_dir_all(&user_data_dir)
            .context("failed to create browser user data directory")?;

        let mut builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(config.browser.window_width, config.browser.window_height)
            .user_data_dir(user_data_dir.clone())
            .chrome_executable(chrome_path)
            .arg(format!("--user-agent={user_agent}"))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--mute-audio");
        if config.browser.headless {
            builder = builder.headless_mode(HeadlessMode::default());
        } else {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        info!(user_agent, "launching browser");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch browser")?;

        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("browser handler error: {e:?}");
                }
            }
            debug!("browser event handler task completed");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open browser tab")?;

        Ok(Self {
            browser,
            handler: Some(handler_task),
            page,
            user_data_dir: Some(user_data_dir),
            retry: config.retry_policy(),
            wait: config.wait_policy(),
        })
    }

    /// Navigate in a single attempt, surfacing the raw driver error.
    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        self.page.goto(url).await?;
        Ok(())
    }

    /// Navigate with the configured retry policy.
    ///
    /// Returns `true` on the first successful attempt and `false` only after
    /// every attempt failed. Callers that ignore the result proceed against
    /// stale page state, so they must check it.
    pub async fn navigate_with_retry(&self, url: &str) -> bool {
        run_with_retry(&self.retry, url, || async move {
            self.page.goto(url).await.map(|_| ())
        })
        .await
    }

    /// Wait for one element matching `selector` to appear.
    pub async fn wait_for(&self, selector: &str) -> Result<Element, WaitTimeout> {
        let start = Instant::now();
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if start.elapsed() >= self.wait.timeout {
                return Err(WaitTimeout {
                    selector: selector.to_string(),
                    waited: self.wait.timeout,
                });
            }
            tokio::time::sleep(self.wait.poll_interval).await;
        }
    }

    /// Wait until at least one element matches `selector`, returning all of
    /// them.
    pub async fn wait_for_all(&self, selector: &str) -> Result<Vec<Element>, WaitTimeout> {
        let start = Instant::now();
        loop {
            if let Ok(elements) = self.page.find_elements(selector).await
                && !elements.is_empty()
            {
                return Ok(elements);
            }
            if start.elapsed() >= self.wait.timeout {
                return Err(WaitTimeout {
                    selector: selector.to_string(),
                    waited: self.wait.timeout,
                });
            }
            tokio::time::sleep(self.wait.poll_interval).await;
        }
    }

    /// Look an element up once, without waiting.
    pub async fn find(&self, selector: &str) -> Result<Element, CdpError> {
        self.page.find_element(selector).await
    }

    /// Close the browser and release everything it holds.
    ///
    /// Runs on every exit path of the binary; the `Drop` impl only covers the
    /// handler task and temp directory as a fallback.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("failed to close browser: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("failed to wait for browser exit: {e}");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if let Some(dir) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&dir)
        {
            warn!(
                "failed to remove user data directory {}: {e}",
                dir.display()
            );
        }
        info!("browser session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if let Some(dir) = self.user_data_dir.take() {
            warn!("session dropped without explicit close, removing user data directory");
            let _ = std::fs::remove_dir_all(&dir);
        }
    }
}

/// Run `op` under the retry policy, logging each failure.
///
/// Sleeps `policy.delay` between attempts but not after the last one.
pub(crate) async fn run_with_retry<F, Fut, E>(policy: &RetryPolicy, url: &str, mut op: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        match op().await {
            Ok(()) => return true,
            Err(e) => {
                error!("failed to load {url} (attempt {attempt}/{attempts}): {e}");
                if attempt < attempts {
                    debug!("retrying in {:?}", policy.delay);
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
    error!("giving up on {url} after {attempts} attempts");
    false
}

/// Find a Chrome/Chromium executable on this machine.
///
/// The `CHROMIUM_PATH` environment variable overrides all other lookups.
fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to a non-existent file: {}",
            path.display()
        );
    }

    let paths: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for path_str in paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("found browser via 'which': {}", path.display());
                    return Ok(path);
                }
            }
        }
    }

    warn!("no Chrome/Chromium executable found, falling back to the fetcher");
    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium build and return its executable path.
async fn download_managed_browser() -> Result<PathBuf> {
    info!("downloading managed Chromium browser");

    let cache_dir = std::env::temp_dir().join("quotescrape_chromium");
    std::fs::create_dir_all(&cache_dir).context("failed to create browser cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("failed to build fetcher options")?,
    );
    let revision_info = fetcher.fetch().await.context("failed to fetch browser")?;

    info!(
        "downloaded Chromium to: {}",
        revision_info.folder_path.display()
    );
    Ok(revision_info.executable_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32, delay_secs: u64) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_secs(delay_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhausts_after_configured_attempts() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let ok = run_with_retry(&policy(4, 2), "http://unreachable.invalid/", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("connection refused") }
        })
        .await;

        assert!(!ok);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // three inter-attempt delays, none after the final attempt
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_short_circuits_on_first_success() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let ok = run_with_retry(&policy(3, 2), "http://example.com/", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), &str>(()) }
        })
        .await;

        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let ok = run_with_retry(&policy(5, 1), "http://flaky.example/", || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err("connection reset")
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_is_floored_to_one() {
        let calls = AtomicU32::new(0);

        let ok = run_with_retry(&policy(0, 1), "http://example.com/", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("refused") }
        })
        .await;

        assert!(!ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
