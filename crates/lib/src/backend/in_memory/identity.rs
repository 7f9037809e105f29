//! In-memory identity provider.
//!
//! Accounts live in a map keyed by lowercase email, passwords hashed with
//! Argon2id. Like the hosted provider, every transition notifies listeners
//! while the session lock is still held, so a listener that calls back into
//! this provider deadlocks. That is the contract listeners are written against.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};
use async_trait::async_trait;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::InMemoryStore;
use crate::{
    Clock, Result, SystemClock,
    auth::{
        AuthChange, AuthChangeEvent, AuthError, AuthListener, Credentials, IdentityProvider,
        ListenerRegistry, OAuthProvider, OAuthRedirect, Role, Session, SignUpRequest,
        SignUpResponse, Subscription, User, UserMetadata,
    },
    constants::{self, REFRESH_MARGIN},
};

/// Lifetime of issued access tokens.
const SESSION_LIFETIME_SECS: i64 = 3600;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Account {
    pub(crate) user: User,
    /// Argon2 PHC string. Empty for accounts created through OAuth.
    pub(crate) password_hash: String,
    pub(crate) confirmed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct IdentityState {
    pub(crate) accounts: HashMap<String, Account>,
    pub(crate) session: Option<Session>,
    /// Outstanding OAuth authorization codes and the account each signs in.
    oauth_codes: HashMap<String, String>,
}

/// Identity provider backed by process memory.
pub struct InMemoryIdentity {
    pub(crate) state: Mutex<IdentityState>,
    listeners: ListenerRegistry,
    clock: Arc<dyn Clock>,
    require_confirmation: bool,
    profiles: Option<Arc<InMemoryStore>>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(IdentityState::default()),
            listeners: ListenerRegistry::new(),
            clock,
            require_confirmation: false,
            profiles: None,
        }
    }

    /// New accounts stay unconfirmed, and cannot sign in, until
    /// [`confirm_email`](Self::confirm_email) is called.
    pub fn require_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// Write a `profiles` row with role `user` for every new account.
    pub fn provision_profiles(mut self, store: Arc<InMemoryStore>) -> Self {
        self.profiles = Some(store);
        self
    }

    /// Mark an account's email as confirmed.
    pub fn confirm_email(&self, email: &str) -> Result<()> {
        let mut state = self.lock();
        let account = state
            .accounts
            .get_mut(&email.to_lowercase())
            .ok_or(AuthError::InvalidCredentials)?;
        account.confirmed = true;
        Ok(())
    }

    /// Play the part of the external OAuth provider: the user consented as
    /// `email`. Returns the code the redirect would deliver.
    pub fn authorize_oauth(&self, email: &str, full_name: Option<&str>) -> String {
        let email = email.to_lowercase();
        let code = random_token(24);
        let mut state = self.lock();
        if !state.accounts.contains_key(&email) {
            let account = Account {
                user: new_user(&email, full_name),
                password_hash: String::new(),
                confirmed: true,
            };
            self.provision_profile(&account.user);
            state.accounts.insert(email.clone(), account);
        }
        state.oauth_codes.insert(code.clone(), email);
        code
    }

    /// The account registered under `email`, if any.
    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.lock()
            .accounts
            .get(&email.trim().to_lowercase())
            .map(|account| account.user.clone())
    }

    /// Number of registered accounts.
    pub fn account_count(&self) -> usize {
        self.lock().accounts.len()
    }

    /// Live listener subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn issue_session(&self, user: &User) -> Session {
        Session {
            access_token: random_token(40),
            refresh_token: random_token(24),
            token_type: "bearer".to_string(),
            expires_in: Some(SESSION_LIFETIME_SECS),
            expires_at: Some(self.clock.now_secs() + SESSION_LIFETIME_SECS),
            user: user.clone(),
        }
    }

    /// Replace the session and notify, with the session lock held throughout.
    fn transition(
        &self,
        state: &mut MutexGuard<'_, IdentityState>,
        event: AuthChangeEvent,
        session: Option<Session>,
    ) {
        state.session = session.clone();
        self.listeners.notify(&AuthChange::new(event, session));
    }

    fn provision_profile(&self, user: &User) {
        if let Some(store) = &self.profiles {
            store.seed(
                constants::PROFILES,
                json!({
                    "id": user.id,
                    "full_name": user.user_metadata.full_name,
                    "role": Role::User,
                }),
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, IdentityState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sign_up_locked(&self, request: SignUpRequest) -> Result<SignUpResponse> {
        let email = request.credentials.email.trim().to_lowercase();
        let mut state = self.lock();
        if state.accounts.contains_key(&email) {
            return Err(AuthError::EmailAlreadyRegistered { email }.into());
        }

        let password_hash = hash_password(&request.credentials.password)?;
        let user = new_user(&email, Some(&request.full_name));
        let confirmed = !self.require_confirmation;
        state.accounts.insert(
            email.clone(),
            Account {
                user: user.clone(),
                password_hash,
                confirmed,
            },
        );
        self.provision_profile(&user);
        info!(user_id = %user.id, confirmed, "account registered");

        if !confirmed {
            debug!(redirect_to = %request.redirect_to, "confirmation pending");
            return Ok(SignUpResponse {
                user,
                session: None,
            });
        }
        let session = self.issue_session(&user);
        self.transition(&mut state, AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(SignUpResponse {
            user,
            session: Some(session),
        })
    }

    fn sign_in_locked(&self, credentials: &Credentials) -> Result<Session> {
        let email = credentials.email.trim().to_lowercase();
        let mut state = self.lock();
        let account = state
            .accounts
            .get(&email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;
        if account.password_hash.is_empty()
            || !verify_password(&credentials.password, &account.password_hash)
        {
            return Err(AuthError::InvalidCredentials.into());
        }
        if !account.confirmed {
            return Err(AuthError::EmailNotConfirmed { email }.into());
        }

        let session = self.issue_session(&account.user);
        info!(user_id = %account.user.id, "signed in with password");
        self.transition(&mut state, AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn exchange_code_locked(&self, auth_code: &str) -> Result<Session> {
        let mut state = self.lock();
        let email = state
            .oauth_codes
            .remove(auth_code)
            .ok_or(AuthError::InvalidAuthCode)?;
        let user = state
            .accounts
            .get(&email)
            .map(|account| account.user.clone())
            .ok_or(AuthError::InvalidAuthCode)?;

        let session = self.issue_session(&user);
        info!(user_id = %user.id, "signed in with authorization code");
        self.transition(&mut state, AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn refresh_locked(&self) -> Result<Session> {
        let mut state = self.lock();
        let current = state.session.clone().ok_or(AuthError::MissingSession)?;
        let session = self.issue_session(&current.user);
        debug!(user_id = %session.user.id, "session refreshed");
        self.transition(&mut state, AuthChangeEvent::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryIdentity")
            .field("accounts", &state.accounts.len())
            .field("signed_in", &state.session.is_some())
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn get_session(&self) -> Result<Option<Session>> {
        let session = self.lock().session.clone();
        match session {
            Some(session)
                if session.expires_within(self.clock.now_secs(), REFRESH_MARGIN.as_secs() as i64) =>
            {
                self.refresh_locked().map(Some)
            }
            session => Ok(session),
        }
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse> {
        self.sign_up_locked(request)
    }

    async fn sign_in_with_password(&self, credentials: Credentials) -> Result<Session> {
        self.sign_in_locked(&credentials)
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &Url,
    ) -> Result<OAuthRedirect> {
        // No external consent screen: the caller completes the flow with
        // `authorize_oauth` and `exchange_code_for_session`.
        let mut url = redirect_to.clone();
        url.query_pairs_mut().append_pair("provider", provider.as_str());
        Ok(OAuthRedirect { provider, url })
    }

    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session> {
        self.exchange_code_locked(auth_code)
    }

    async fn refresh_session(&self) -> Result<Session> {
        self.refresh_locked()
    }

    async fn sign_out(&self) -> Result<()> {
        let mut state = self.lock();
        if let Some(session) = &state.session {
            info!(user_id = %session.user.id, "signed out");
        }
        self.transition(&mut state, AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    async fn access_token(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.access_token.clone())
    }
}

fn new_user(email: &str, full_name: Option<&str>) -> User {
    User {
        id: Uuid::new_v4(),
        email: Some(email.to_string()),
        user_metadata: UserMetadata {
            full_name: full_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            ..Default::default()
        },
        app_metadata: Default::default(),
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            AuthError::InvalidResponse {
                reason: format!("password hashing failed: {e}"),
            }
            .into()
        })
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
