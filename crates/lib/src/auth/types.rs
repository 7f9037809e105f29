//! Core types for identity and session state.
//!
//! Field names follow the identity provider's JSON so these types deserialize
//! straight from its responses.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Credential bundle issued by the identity provider.
///
/// Replaced wholesale on every auth transition. Only its presence, expiry and
/// embedded [`User`] are inspected locally.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Expiry as unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// Identifier of the signed-in user.
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// Whether the session expires within `margin_secs` of `now_secs`.
    ///
    /// Sessions without an expiry never need a refresh.
    pub fn expires_within(&self, now_secs: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - margin_secs <= now_secs)
    }

    /// Fill in `expires_at` from `expires_in` when the provider only sent the latter.
    pub(crate) fn with_expiry_from(mut self, now_secs: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now_secs + secs);
        }
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Provider-supplied metadata attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Everything else the provider sent (avatar, OAuth claims, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Account record issued by the identity provider. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// The part of the email address before the `@`, if there is an email.
    pub fn email_local_part(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
    }
}

/// Access tier stored on a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-owned record extending a [`User`] with display name and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Anything other than `"admin"`, including null, reads as [`Role::User`].
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Role,
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw.as_str() {
        Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
        _ => Role::User,
    })
}

/// Kind of session transition reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthChangeEvent::SignedIn => "SIGNED_IN",
            AuthChangeEvent::SignedOut => "SIGNED_OUT",
            AuthChangeEvent::TokenRefreshed => "TOKEN_REFRESHED",
            AuthChangeEvent::UserUpdated => "USER_UPDATED",
        };
        f.write_str(name)
    }
}

/// A session transition notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthChangeEvent,
    /// The session after the transition; `None` once signed out.
    pub session: Option<Session>,
}

impl AuthChange {
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Email/password pair for a credential sign-in.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account registration request.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub credentials: Credentials,
    /// Display name, attached to the account as `full_name` metadata.
    pub full_name: String,
    /// Where the confirmation email sends the user back to.
    pub redirect_to: Url,
}

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: User,
    /// Present when the provider signs the user in immediately; `None` while
    /// the email address awaits confirmation.
    pub session: Option<Session>,
}

impl SignUpResponse {
    pub fn needs_confirmation(&self) -> bool {
        self.session.is_none()
    }
}

/// Third-party identity providers available for redirect sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(format!("unsupported OAuth provider: {other}")),
        }
    }
}

/// Where to send the user to start a redirect sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthRedirect {
    pub provider: OAuthProvider,
    pub url: Url,
}
