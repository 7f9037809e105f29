//! Client configuration.
//!
//! The connection details for the hosted backend are supplied externally (CLI
//! flags or environment, see the `clubhub` binary); this module only validates
//! and carries them.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;
use url::Url;

use crate::Error;

/// Default per-request timeout for remote calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors raised while building a [`ClientConfig`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("Missing configuration value: {name}")]
    MissingValue { name: &'static str },

    /// A URL setting could not be parsed.
    #[error("Invalid URL for {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Connection settings shared by the identity client and the data client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the hosted project, e.g. `https://xyz.example.co`.
    pub url: Url,
    /// Public (anonymous) API key sent with every request.
    pub anon_key: String,
    /// Where the identity provider sends the browser after email confirmation or OAuth.
    pub redirect_url: Url,
    /// File the current session is persisted to, if any.
    pub session_file: Option<PathBuf>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Build a configuration from raw strings, validating both URLs.
    pub fn new(url: &str, anon_key: &str, redirect_url: &str) -> crate::Result<Self> {
        if anon_key.trim().is_empty() {
            return Err(ConfigError::MissingValue { name: "anon_key" }.into());
        }
        Ok(Self {
            url: parse_url("url", url)?,
            anon_key: anon_key.to_string(),
            redirect_url: parse_url("redirect_url", redirect_url)?,
            session_file: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Persist sessions to the given file.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve an endpoint path against the project URL.
    ///
    /// The project URL may carry a path prefix; endpoints are always appended to it.
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{}", path.trim_start_matches('/')));
        url
    }
}

fn parse_url(name: &'static str, value: &str) -> crate::Result<Url> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingValue { name }.into());
    }
    Url::parse(value).map_err(|e| {
        ConfigError::InvalidUrl {
            name,
            reason: e.to_string(),
        }
        .into()
    })
}
