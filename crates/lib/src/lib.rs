//!
//! Clubhub: the client core of a university clubs platform.
//! This library provides everything a front end needs to sign users in, gate views by role,
//! show per-club events and cross-club announcements, and let administrators publish content.
//!
//! ## Core Concepts
//!
//! * **Identity providers (`auth::IdentityProvider`)**: The remote account service. Issues sessions,
//!   runs credential and OAuth sign-in, and notifies listeners of every session transition.
//! * **Data stores (`store::DataStore`)**: Table-scoped select/insert against the remote database
//!   that holds profiles, events and announcements.
//! * **Session resolver (`auth::SessionResolver`)**: The single in-process view of
//!   session, user, profile and loading state, kept in sync with the identity provider.
//! * **Routes (`routes`)**: Pure guard policies deciding whether a view renders, waits, or redirects.
//! * **Views (`dashboard::DashboardView`, `publisher::ContentPublisher`)**: The data-bearing view
//!   state machines for the member dashboard and the admin content publisher.
//! * **Backends (`backend`)**: A hosted REST implementation of both remote seams, and an in-memory
//!   implementation for development and tests.
//!
//! Role checks here are advisory UI behaviour. Authorization is enforced by the backend's
//! row-level security, and every write carries the signed-in user's own bearer token.

pub mod auth;
pub mod backend;
pub mod clock;
pub mod clubs;
pub mod config;
pub mod constants;
pub mod content;
pub mod dashboard;
pub mod publisher;
pub mod routes;
pub mod store;

pub use auth::{AuthState, SessionResolver};
pub use clock::{Clock, SystemClock};
pub use config::ClientConfig;
pub use routes::Route;

#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;

/// Result type used throughout the Clubhub library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Clubhub library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from the identity provider
    #[error(transparent)]
    Auth(auth::AuthError),

    /// Structured errors from the remote data store
    #[error(transparent)]
    Store(store::StoreError),

    /// Form validation failures from the content publisher
    #[error(transparent)]
    Form(publisher::FormError),

    /// Invalid client configuration
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Auth(_) => "auth",
            Error::Store(_) => "store",
            Error::Form(_) => "publisher",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error came from the network layer rather than the remote service.
    pub fn is_transport_error(&self) -> bool {
        match self {
            Error::Auth(auth_err) => auth_err.is_transport_error(),
            Error::Store(store_err) => store_err.is_transport_error(),
            _ => false,
        }
    }

    /// Check if this error was reported by the remote service.
    pub fn is_service_error(&self) -> bool {
        match self {
            Error::Auth(auth_err) => auth_err.is_service_error(),
            Error::Store(store_err) => store_err.is_service_error(),
            _ => false,
        }
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_integrity_error(),
            _ => false,
        }
    }

    /// Check if this error is a local validation failure.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Form(_) | Error::Config(_))
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// Check if this error indicates a missing session.
    pub fn is_missing_session(&self) -> bool {
        match self {
            Error::Auth(auth_err) => auth_err.is_missing_session(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
