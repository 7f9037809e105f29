//! Session resolution.
//!
//! [`SessionResolver`] owns the in-process view of the signed-in account and
//! keeps it in step with the identity provider:
//!
//! 1. On start it registers a session-change listener, then asks the provider
//!    for the current session, resolves that user's profile, and only then
//!    clears `loading`.
//! 2. Every later notification updates session and user inside the listener
//!    and enqueues a profile lookup on the resolver's worker task. The lookup
//!    never runs inside the listener: providers notify while holding their
//!    session lock, and the data store asks the provider for a bearer token.
//! 3. Profile jobs run one at a time in the order they were enqueued. A stale
//!    job still completes and writes its result.
//!
//! Profile lookups never fail loudly. No row, several rows, or a failed request
//! all leave the profile empty, which every consumer treats as role `user`.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::AbortHandle,
};
use tracing::{debug, info, trace, warn};
use url::Url;

use super::{
    listeners::{AuthListener, Subscription},
    provider::IdentityProvider,
    types::{
        AuthChange, Credentials, OAuthProvider, OAuthRedirect, Profile, Role, Session,
        SignUpRequest, SignUpResponse, User,
    },
};
use crate::{
    Result, constants,
    store::{self, DataStore, Select},
};

/// Snapshot of the signed-in account as the application sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub profile: Option<Profile>,
    /// True until the startup session has been resolved. Never true again afterwards.
    pub loading: bool,
}

impl AuthState {
    /// State before the startup session has been resolved.
    pub fn initializing() -> Self {
        Self {
            session: None,
            user: None,
            profile: None,
            loading: true,
        }
    }

    /// Resolved state with nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::initializing()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The account's role. A missing profile means [`Role::User`].
    pub fn role(&self) -> Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    /// Name shown on the profile page.
    pub fn display_name(&self) -> String {
        self.profile_name()
            .or_else(|| {
                self.user
                    .as_ref()
                    .and_then(|u| u.user_metadata.full_name.as_deref())
                    .filter(|name| !name.is_empty())
            })
            .or_else(|| self.user.as_ref().and_then(User::email_local_part))
            .unwrap_or("User")
            .to_string()
    }

    /// Name shown in the admin publisher greeting.
    pub fn admin_name(&self) -> String {
        self.profile_name()
            .or_else(|| self.user.as_ref().and_then(User::email_local_part))
            .unwrap_or("Admin")
            .to_string()
    }

    fn profile_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.full_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

/// Work item for the profile worker.
struct ProfileJob {
    user: Option<User>,
    /// Signalled once the job's result has been written.
    done: Option<oneshot::Sender<()>>,
}

struct Shared {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DataStore>,
    state: watch::Sender<AuthState>,
    /// Notifications applied so far. Read and written only inside `send_modify`.
    notifications: AtomicU64,
}

impl Shared {
    async fn resolve_profile(&self, user: Option<&User>) -> Option<Profile> {
        let user = user?;
        let query = Select::from(constants::PROFILES).eq("id", user.id);
        match store::maybe_single::<Profile>(self.store.as_ref(), &query).await {
            Ok(Some(profile)) => {
                debug!(user_id = %user.id, role = %profile.role, "profile resolved");
                Some(profile)
            }
            Ok(None) => {
                debug!(user_id = %user.id, "no profile row; treating as a regular user");
                None
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "failed to fetch user profile");
                None
            }
        }
    }
}

/// The single source of truth for session, user, profile and loading state.
///
/// Constructed explicitly with its collaborators; there is no global instance.
/// Dropping the resolver (or calling [`dispose`](Self::dispose)) unsubscribes
/// from the provider and stops its background tasks.
pub struct SessionResolver {
    shared: Arc<Shared>,
    state: watch::Receiver<AuthState>,
    redirect_url: Url,
    subscription: Option<Subscription>,
    tasks: Vec<AbortHandle>,
}

impl SessionResolver {
    /// Start resolving. Must be called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `identity` - The identity provider to follow
    /// * `store` - The data store holding profiles
    /// * `redirect_url` - Where confirmation emails and OAuth send the user back to
    pub fn start(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DataStore>,
        redirect_url: Url,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(AuthState::initializing());
        let shared = Arc::new(Shared {
            identity,
            store,
            state: state_tx,
            notifications: AtomicU64::new(0),
        });
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        let subscription = shared
            .identity
            .on_auth_state_change(change_listener(Arc::downgrade(&shared), jobs_tx.clone()));
        let worker = tokio::spawn(run_profile_worker(Arc::downgrade(&shared), jobs_rx));
        let bootstrap = tokio::spawn(bootstrap(shared.clone(), jobs_tx));

        Self {
            shared,
            state: state_rx,
            redirect_url,
            subscription: Some(subscription),
            tasks: vec![worker.abort_handle(), bootstrap.abort_handle()],
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.clone()
    }

    /// Wait until the startup session has been resolved, then return the state.
    pub async fn resolved(&self) -> AuthState {
        let mut state = self.state.clone();
        if let Ok(resolved) = state.wait_for(|s| !s.loading).await {
            return resolved.clone();
        }
        state.borrow().clone()
    }

    /// Register a new account with `name` attached as its display name.
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<SignUpResponse> {
        let request = SignUpRequest {
            credentials: Credentials::new(email, password),
            full_name: name.to_string(),
            redirect_to: self.redirect_url.clone(),
        };
        self.shared.identity.sign_up(request).await
    }

    /// Credential sign-in. State follows from the resulting notification.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.shared
            .identity
            .sign_in_with_password(Credentials::new(email, password))
            .await
    }

    /// Start a redirect sign-in; finish it with [`exchange_code`](Self::exchange_code).
    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<OAuthRedirect> {
        self.shared
            .identity
            .sign_in_with_oauth(provider, &self.redirect_url)
            .await
    }

    /// Finish a redirect sign-in with the code delivered to the redirect target.
    pub async fn exchange_code(&self, auth_code: &str) -> Result<Session> {
        self.shared
            .identity
            .exchange_code_for_session(auth_code)
            .await
    }

    /// Sign out. The resulting notification clears session, user and profile.
    pub async fn sign_out(&self) -> Result<()> {
        self.shared.identity.sign_out().await
    }

    /// Release the provider subscription and stop background work.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for SessionResolver {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        trace!("session resolver disposed");
    }
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver")
            .field("state", &*self.state.borrow())
            .field("redirect_url", &self.redirect_url.as_str())
            .finish()
    }
}

fn change_listener(
    shared: Weak<Shared>,
    jobs: mpsc::UnboundedSender<ProfileJob>,
) -> AuthListener {
    Arc::new(move |change: &AuthChange| {
        // A disposed resolver ignores late notifications.
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let user = change.user().cloned();
        debug!(event = %change.event, user_id = ?user.as_ref().map(|u| u.id), "session changed");

        shared.state.send_modify(|state| {
            shared.notifications.fetch_add(1, Ordering::SeqCst);
            state.session = change.session.clone();
            state.user = user.clone();
        });

        if jobs.send(ProfileJob { user, done: None }).is_err() {
            debug!("profile worker stopped; profile left unchanged");
        }
    })
}

async fn run_profile_worker(shared: Weak<Shared>, mut jobs: mpsc::UnboundedReceiver<ProfileJob>) {
    while let Some(job) = jobs.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let profile = shared.resolve_profile(job.user.as_ref()).await;
        shared.state.send_modify(|state| state.profile = profile);
        if let Some(done) = job.done {
            let _ = done.send(());
        }
    }
    trace!("profile worker stopped");
}

async fn bootstrap(shared: Arc<Shared>, jobs: mpsc::UnboundedSender<ProfileJob>) {
    let session = match shared.identity.get_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "failed to restore session; starting signed out");
            None
        }
    };

    let mut user = None;
    shared.state.send_modify(|state| {
        if shared.notifications.load(Ordering::SeqCst) == 0 {
            state.user = session.as_ref().map(|s| s.user.clone());
            state.session = session;
        } else {
            debug!("session changed while restoring; keeping the newer state");
        }
        user = state.user.clone();
    });

    // Route the startup lookup through the worker so it is ordered with the
    // lookups of any notification that already arrived.
    let (done_tx, done_rx) = oneshot::channel();
    if jobs
        .send(ProfileJob {
            user,
            done: Some(done_tx),
        })
        .is_ok()
    {
        let _ = done_rx.await;
    }
    drop(jobs);

    shared.state.send_modify(|state| state.loading = false);
    let state = shared.state.borrow();
    info!(
        signed_in = state.is_authenticated(),
        role = %state.role(),
        "session resolved"
    );
}
