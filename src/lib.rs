pub mod auth;
pub mod config;
pub mod extractor;
pub mod selectors;
pub mod session;
pub mod storage;

pub use auth::{AuthError, Authenticator};
pub use config::{ConfigError, RetryPolicy, ScraperConfig, WaitPolicy};
pub use extractor::{ExtractError, QuoteExtractor, select_pages};
pub use session::{Session, WaitTimeout};
pub use storage::{Quote, QuoteStore, StorageError};
