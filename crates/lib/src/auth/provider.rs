//! The identity provider seam.

use async_trait::async_trait;
use url::Url;

use super::{
    listeners::{AuthListener, Subscription},
    types::{Credentials, OAuthProvider, OAuthRedirect, Session, SignUpRequest, SignUpResponse},
};
use crate::Result;

/// Remote account service: credential and OAuth sign-in, session persistence,
/// and session-change notifications.
///
/// Every state-changing operation that succeeds notifies the registered
/// listeners before it returns. Callers observe state through those
/// notifications rather than through the return values.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current session, if any. Refreshes a session that is about to expire.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Register a new account.
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse>;

    /// Exchange an email and password for a session.
    async fn sign_in_with_password(&self, credentials: Credentials) -> Result<Session>;

    /// Start a redirect sign-in. The returned URL must be opened by the user; the
    /// provider sends them back to `redirect_to` with an authorization code.
    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &Url,
    ) -> Result<OAuthRedirect>;

    /// Finish a redirect sign-in by trading the authorization code for a session.
    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session>;

    /// Trade the refresh token for a new session.
    async fn refresh_session(&self) -> Result<Session>;

    /// Invalidate the current session.
    async fn sign_out(&self) -> Result<()>;

    /// Register a session-change listener. See [`super::listeners`] for the
    /// rules listeners must follow.
    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;

    /// Bearer token for data requests: the session's access token when signed in.
    async fn access_token(&self) -> Option<String>;
}
