//! Hosted REST backend.
//!
//! [`SupabaseAuth`] talks to the auth API (`/auth/v1`), [`SupabaseRest`] to the
//! table API (`/rest/v1`). Both send the project's anonymous key as `apikey`.
//! Data requests carry the signed-in user's access token as bearer, so the
//! backend's row-level security sees the real caller.

mod auth;
mod pkce;
mod rest;

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;

pub use auth::SupabaseAuth;
pub use rest::SupabaseRest;

use crate::{
    Clock, ClientConfig, Result, auth::AuthError, auth::IdentityProvider, store::DataStore,
};

/// An auth client and a data client built from one configuration.
#[derive(Debug, Clone)]
pub struct SupabaseBackend {
    pub identity: Arc<SupabaseAuth>,
    pub store: Arc<SupabaseRest>,
}

impl SupabaseBackend {
    /// Build both clients, restoring a persisted session if the configuration names a file.
    pub async fn connect(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let identity = Arc::new(SupabaseAuth::connect(config.clone(), clock).await?);
        let store = Arc::new(SupabaseRest::new(
            config,
            identity.clone() as Arc<dyn IdentityProvider>,
        )?);
        Ok(Self { identity, store })
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        self.identity.clone()
    }

    pub fn store(&self) -> Arc<dyn DataStore> {
        self.store.clone()
    }
}

fn http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| {
            AuthError::Transport {
                reason: format!("failed to build HTTP client: {e}"),
            }
            .into()
        })
}

/// Attach the project key and a bearer token (the anonymous key when signed out).
fn authorize(request: RequestBuilder, config: &ClientConfig, token: Option<&str>) -> RequestBuilder {
    request
        .header("apikey", &config.anon_key)
        .bearer_auth(token.unwrap_or(&config.anon_key))
}

/// The error shapes both APIs use. Fields that are absent stay `None`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A decoded error response: machine code, if any, and a human message.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ApiFailure {
    status: u16,
    code: Option<String>,
    message: String,
}

impl ApiFailure {
    fn from_body(status: StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        // `code` is the HTTP status on some auth errors and a string on others.
        let code = parsed
            .error_code
            .or_else(|| match parsed.code {
                Some(serde_json::Value::String(code)) => Some(code),
                _ => None,
            })
            .or(parsed.error);
        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body.trim().to_string()
                }
            });
        Self {
            status: status.as_u16(),
            code,
            message,
        }
    }

    fn code_is(&self, codes: &[&str]) -> bool {
        self.code.as_deref().is_some_and(|code| codes.contains(&code))
    }
}
