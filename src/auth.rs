//! Login transaction against the target site.
//!
//! One fixed sequence: open the base URL, open the login form, fill the
//! credentials, submit, then verify by waiting for the logout link. Any
//! failure aborts the whole attempt; retries are the caller's business.

use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::selectors;
use crate::session::{Session, WaitTimeout};

/// Login failure, tagged by cause. No raw driver error escapes this module.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login timed out while {stage}: {source}")]
    Timeout {
        stage: &'static str,
        #[source]
        source: WaitTimeout,
    },

    #[error("login element '{selector}' not found: {source}")]
    ElementNotFound {
        selector: &'static str,
        #[source]
        source: CdpError,
    },

    #[error("browser error during login: {0}")]
    Driver(#[from] CdpError),
}

/// Drives the login sequence over a [`Session`].
pub struct Authenticator {
    base_url: String,
    username: String,
    password: String,
}

impl Authenticator {
    #[must_use]
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            username: config.credentials.username.clone(),
            password: config.credentials.password.clone(),
        }
    }

    /// Perform the login transaction and confirm it took effect.
    ///
    /// Navigation here is a single attempt on purpose: a failure to even
    /// reach the site is surfaced immediately rather than retried.
    pub async fn login(&self, session: &Session) -> Result<(), AuthError> {
        info!(url = %self.base_url, username = %self.username, "starting login");
        session.navigate(&self.base_url).await?;

        self.fill_login_form(session).await?;
        self.verify_logged_in(session).await?;

        info!("login completed");
        Ok(())
    }

    async fn fill_login_form(&self, session: &Session) -> Result<(), AuthError> {
        debug!("opening login form");
        let login_link = session
            .wait_for(selectors::LOGIN_LINK)
            .await
            .map_err(|source| AuthError::Timeout {
                stage: "opening the login form",
                source,
            })?;
        login_link.click().await?;

        debug!("filling username field");
        let username_field = session.wait_for(selectors::USERNAME_FIELD).await.map_err(
            |source| AuthError::Timeout {
                stage: "waiting for the username field",
                source,
            },
        )?;
        clear_field(&username_field).await?;
        username_field.type_str(&self.username).await?;

        debug!("filling password field");
        let password_field = session.wait_for(selectors::PASSWORD_FIELD).await.map_err(
            |source| AuthError::Timeout {
                stage: "waiting for the password field",
                source,
            },
        )?;
        clear_field(&password_field).await?;
        password_field.type_str(&self.password).await?;

        let submit = session.find(selectors::SUBMIT_BUTTON).await.map_err(|source| {
            AuthError::ElementNotFound {
                selector: selectors::SUBMIT_BUTTON,
                source,
            }
        })?;
        submit.click().await?;
        Ok(())
    }

    /// Success means the logout link shows up within the session's wait
    /// bound.
    async fn verify_logged_in(&self, session: &Session) -> Result<(), AuthError> {
        session
            .wait_for(selectors::LOGOUT_LINK)
            .await
            .map_err(|source| AuthError::Timeout {
                stage: "verifying the logout link",
                source,
            })?;
        debug!("logout link present, login verified");
        Ok(())
    }
}

async fn clear_field(field: &Element) -> Result<(), CdpError> {
    field
        .call_js_fn("function() { this.value = ''; }", false)
        .await?;
    Ok(())
}
