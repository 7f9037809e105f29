//! Authentication error types for the Clubhub library.
//!
//! This module defines structured error types for identity-provider operations,
//! keeping transport failures apart from errors the provider itself reported.

use thiserror::Error as ThisError;

use crate::Error;

/// Errors that can occur during identity-provider operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum AuthError {
    /// The request never produced a response (DNS, TLS, timeout, connection reset).
    #[error("Identity provider unreachable: {reason}")]
    Transport {
        /// Description of the network failure
        reason: String,
    },

    /// The identity provider answered with an error.
    #[error("Identity provider error ({status}): {message}")]
    Api {
        /// HTTP status of the response
        status: u16,
        /// Provider error code, when one was given
        code: Option<String>,
        /// Human-readable message from the provider
        message: String,
    },

    /// Email/password pair was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The email address already belongs to an account.
    #[error("User already registered: {email}")]
    EmailAlreadyRegistered {
        /// The email that was submitted
        email: String,
    },

    /// The account exists but its email address has not been confirmed yet.
    #[error("Email not confirmed: {email}")]
    EmailNotConfirmed {
        /// The unconfirmed email
        email: String,
    },

    /// The operation needs a signed-in session and there is none.
    #[error("Auth session missing")]
    MissingSession,

    /// The OAuth authorization code is unknown, expired, or was already used.
    #[error("Invalid or expired authorization code")]
    InvalidAuthCode,

    /// The provider answered with a body this client could not interpret.
    #[error("Invalid response from identity provider: {reason}")]
    InvalidResponse {
        /// What was wrong with the body
        reason: String,
    },
}

impl AuthError {
    /// Check if this error came from the network layer.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, AuthError::Transport { .. })
    }

    /// Check if this error was reported by the identity provider.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            AuthError::Api { .. }
                | AuthError::InvalidCredentials
                | AuthError::EmailAlreadyRegistered { .. }
                | AuthError::EmailNotConfirmed { .. }
                | AuthError::InvalidAuthCode
        )
    }

    /// Check if this error means there is no session to act on.
    pub fn is_missing_session(&self) -> bool {
        matches!(self, AuthError::MissingSession)
    }

    /// Check if the submitted credentials were at fault.
    pub fn is_credentials_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials | AuthError::EmailNotConfirmed { .. }
        )
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        Error::Auth(err)
    }
}
