//! Auth API client.
//!
//! Owns the current session behind an async lock. Every transition replaces
//! the session, persists it, and notifies listeners, all before the lock is
//! released.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, info, warn};
use url::Url;

use super::{ApiFailure, authorize, http_client, pkce::Pkce};
use crate::{
    Clock, ClientConfig, Result,
    auth::{
        AuthChange, AuthChangeEvent, AuthError, AuthListener, Credentials, IdentityProvider,
        ListenerRegistry, OAuthProvider, OAuthRedirect, Session, SignUpRequest, SignUpResponse,
        Subscription, User,
    },
    constants::REFRESH_MARGIN,
};

/// Codes the auth API uses for a rejected email/password pair.
const INVALID_CREDENTIALS: &[&str] = &["invalid_grant", "invalid_credentials"];
const ALREADY_REGISTERED: &[&str] = &["user_already_exists", "email_exists"];
const NOT_CONFIRMED: &[&str] = &["email_not_confirmed"];
const BAD_AUTH_CODE: &[&str] = &["flow_state_not_found", "flow_state_expired", "bad_code_verifier"];

/// [`IdentityProvider`] over the hosted auth API.
pub struct SupabaseAuth {
    config: ClientConfig,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    session: AsyncMutex<Option<Session>>,
    /// Verifier of the redirect sign-in in progress, if any.
    pkce: Mutex<Option<Pkce>>,
    listeners: ListenerRegistry,
}

impl SupabaseAuth {
    /// Build the client and restore the session persisted in `config.session_file`, if any.
    ///
    /// A restored session is not announced to listeners; callers read it with
    /// [`get_session`](IdentityProvider::get_session).
    pub async fn connect(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let session = match &config.session_file {
            Some(path) => load_session(path).await,
            None => None,
        };
        Ok(Self {
            http: http_client(&config)?,
            config,
            clock,
            session: AsyncMutex::new(session),
            pkce: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    /// The URL a redirect sign-in starts at.
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &Url, pkce: &Pkce) -> Url {
        let mut url = self.config.endpoint("auth/v1/authorize");
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to.as_str())
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "s256");
        url
    }

    /// POST to an auth endpoint and decode the JSON answer.
    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
        token: Option<&str>,
    ) -> std::result::Result<T, AuthCallError> {
        let mut url = self.config.endpoint(path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let response = authorize(self.http.post(url), &self.config, token)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthCallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthCallError::Api(ApiFailure::from_body(status, &body)));
        }
        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(Value::Null)
                .map_err(|e| AuthCallError::Decode(e.to_string()));
        }
        response
            .json()
            .await
            .map_err(|e| AuthCallError::Decode(e.to_string()))
    }

    /// Ask for a token and install the resulting session.
    async fn grant(
        &self,
        session: &mut MutexGuard<'_, Option<Session>>,
        grant_type: &str,
        body: Value,
        event: AuthChangeEvent,
        classify: fn(ApiFailure) -> AuthError,
    ) -> Result<Session> {
        let issued: Session = self
            .post("auth/v1/token", &[("grant_type", grant_type)], &body, None)
            .await
            .map_err(|e| e.into_auth_error(classify))?;
        let issued = issued.with_expiry_from(self.clock.now_secs());
        self.transition(session, event, Some(issued.clone())).await;
        Ok(issued)
    }

    /// Replace the session, persist it and notify, while the lock is held.
    async fn transition(
        &self,
        session: &mut MutexGuard<'_, Option<Session>>,
        event: AuthChangeEvent,
        next: Option<Session>,
    ) {
        **session = next.clone();
        if let Some(path) = &self.config.session_file {
            store_session(path, next.as_ref()).await;
        }
        self.listeners.notify(&AuthChange::new(event, next));
    }

    async fn refresh_locked(&self, session: &mut MutexGuard<'_, Option<Session>>) -> Result<Session> {
        let refresh_token = session
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(AuthError::MissingSession)?;
        self.grant(
            session,
            "refresh_token",
            json!({ "refresh_token": refresh_token }),
            AuthChangeEvent::TokenRefreshed,
            |failure| AuthError::from(failure),
        )
        .await
    }
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("url", &self.config.url.as_str())
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn get_session(&self) -> Result<Option<Session>> {
        let mut session = self.session.lock().await;
        let expiring = session.as_ref().is_some_and(|s| {
            s.expires_within(self.clock.now_secs(), REFRESH_MARGIN.as_secs() as i64)
        });
        if !expiring {
            return Ok(session.clone());
        }

        debug!("session about to expire; refreshing");
        match self.refresh_locked(&mut session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) if e.is_service_error() => {
                // The refresh token was rejected; the stored session is dead.
                warn!(error = %e, "session refresh rejected; signing out locally");
                self.transition(&mut session, AuthChangeEvent::SignedOut, None)
                    .await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse> {
        let email = request.credentials.email.clone();
        let mut session = self.session.lock().await;
        let body = json!({
            "email": request.credentials.email,
            "password": request.credentials.password,
            "data": { "full_name": request.full_name },
        });
        let answer: Value = self
            .post(
                "auth/v1/signup",
                &[("redirect_to", request.redirect_to.as_str())],
                &body,
                None,
            )
            .await
            .map_err(|e| {
                e.into_auth_error(|failure| {
                    if failure.code_is(ALREADY_REGISTERED)
                        || failure.message.contains("already registered")
                    {
                        AuthError::EmailAlreadyRegistered {
                            email: email.clone(),
                        }
                    } else {
                        failure.into()
                    }
                })
            })?;

        // With autoconfirm the answer is a session; otherwise it is the bare user.
        if answer.get("access_token").is_some() {
            let issued: Session = decode(answer)?;
            let issued = issued.with_expiry_from(self.clock.now_secs());
            info!(user_id = %issued.user.id, "account registered and signed in");
            self.transition(&mut session, AuthChangeEvent::SignedIn, Some(issued.clone()))
                .await;
            return Ok(SignUpResponse {
                user: issued.user.clone(),
                session: Some(issued),
            });
        }
        let user: User = match answer.get("user") {
            Some(user) => decode(user.clone())?,
            None => decode(answer)?,
        };
        info!(user_id = %user.id, "account registered; confirmation pending");
        Ok(SignUpResponse {
            user,
            session: None,
        })
    }

    async fn sign_in_with_password(&self, credentials: Credentials) -> Result<Session> {
        let email = credentials.email.clone();
        let mut session = self.session.lock().await;
        let issued = self
            .grant(
                &mut session,
                "password",
                json!({ "email": credentials.email, "password": credentials.password }),
                AuthChangeEvent::SignedIn,
                |failure| {
                    if failure.code_is(INVALID_CREDENTIALS) {
                        AuthError::InvalidCredentials
                    } else {
                        failure.into()
                    }
                },
            )
            .await
            .map_err(|e| match e {
                crate::Error::Auth(AuthError::Api { code, .. })
                    if code.as_deref().is_some_and(|c| NOT_CONFIRMED.contains(&c)) =>
                {
                    AuthError::EmailNotConfirmed { email }.into()
                }
                other => other,
            })?;
        info!(user_id = %issued.user.id, "signed in with password");
        Ok(issued)
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &Url,
    ) -> Result<OAuthRedirect> {
        let pkce = Pkce::generate();
        let url = self.authorize_url(provider, redirect_to, &pkce);
        *self.pkce.lock().unwrap() = Some(pkce);
        debug!(%provider, "redirect sign-in started");
        Ok(OAuthRedirect { provider, url })
    }

    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session> {
        let pkce = self
            .pkce
            .lock()
            .unwrap()
            .take()
            .ok_or(AuthError::InvalidAuthCode)?;
        let mut session = self.session.lock().await;
        let issued = self
            .grant(
                &mut session,
                "pkce",
                json!({ "auth_code": auth_code, "code_verifier": pkce.verifier }),
                AuthChangeEvent::SignedIn,
                |failure| {
                    if failure.code_is(BAD_AUTH_CODE) || failure.status == 404 {
                        AuthError::InvalidAuthCode
                    } else {
                        failure.into()
                    }
                },
            )
            .await?;
        info!(user_id = %issued.user.id, "signed in with authorization code");
        Ok(issued)
    }

    async fn refresh_session(&self) -> Result<Session> {
        let mut session = self.session.lock().await;
        self.refresh_locked(&mut session).await
    }

    async fn sign_out(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if let Some(current) = session.as_ref() {
            let token = current.access_token.clone();
            let result: std::result::Result<Value, _> = self
                .post("auth/v1/logout", &[], &json!({}), Some(&token))
                .await;
            // The local session goes regardless; a stale remote token expires on its own.
            if let Err(e) = result {
                let error = e.into_auth_error(AuthError::from);
                warn!(%error, "remote sign-out failed");
            }
            info!(user_id = %current.user.id, "signed out");
        }
        self.transition(&mut session, AuthChangeEvent::SignedOut, None)
            .await;
        Ok(())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    async fn access_token(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }
}

/// Failure of a single auth call before it is classified.
#[derive(Debug)]
enum AuthCallError {
    Transport(String),
    Api(ApiFailure),
    Decode(String),
}

impl AuthCallError {
    fn into_auth_error(self, classify: impl FnOnce(ApiFailure) -> AuthError) -> AuthError {
        match self {
            AuthCallError::Transport(reason) => AuthError::Transport { reason },
            AuthCallError::Api(failure) => classify(failure),
            AuthCallError::Decode(reason) => AuthError::InvalidResponse { reason },
        }
    }
}

impl From<ApiFailure> for AuthError {
    fn from(failure: ApiFailure) -> Self {
        AuthError::Api {
            status: failure.status,
            code: failure.code,
            message: failure.message,
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        AuthError::InvalidResponse {
            reason: e.to_string(),
        }
        .into()
    })
}

async fn load_session(path: &Path) -> Option<Session> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable session file");
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read session file");
            None
        }
    }
}

async fn store_session(path: &Path, session: Option<&Session>) {
    let result = match session {
        Some(session) => match serde_json::to_string_pretty(session) {
            Ok(json) => tokio::fs::write(path, json).await,
            Err(e) => Err(std::io::Error::other(e)),
        },
        None => match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    };
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "failed to persist session");
    }
}
