//! In-memory backend implementation
//!
//! This module provides in-memory implementations of the identity provider
//! and the data store, suitable for testing, development, or running the
//! terminal client without a hosted project.
//!
//! [`InMemoryBackend`] pairs the two so that new accounts get a profile row,
//! and provides basic persistence via `save_to_file` and `load_from_file`.
//!
//! **Security Note**: Session tokens are stored in plaintext, and nothing
//! checks who may write which table. This is acceptable for development and
//! testing only.

mod identity;
mod persistence;
mod store;

use std::{path::Path, sync::Arc};

pub use identity::InMemoryIdentity;
pub use store::InMemoryStore;

use serde_json::json;
use tracing::info;

use crate::{
    Clock, Result, SystemClock,
    auth::{AuthError, Role},
    constants,
};

/// An identity provider and data store sharing one clock.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    pub identity: Arc<InMemoryIdentity>,
    pub store: Arc<InMemoryStore>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let identity = InMemoryIdentity::with_clock(clock).provision_profiles(store.clone());
        Self {
            identity: Arc::new(identity),
            store,
        }
    }

    /// Set the profile role of the account registered under `email`.
    ///
    /// Development stand-in for editing the `profiles` table by hand.
    pub fn set_role(&self, email: &str, role: Role) -> Result<()> {
        let user = self
            .identity
            .user_by_email(email)
            .ok_or(AuthError::InvalidCredentials)?;
        let id = user.id.to_string();
        if self
            .store
            .update(constants::PROFILES, "id", &id, &json!({ "role": role }))
            == 0
        {
            self.store.seed(
                constants::PROFILES,
                json!({ "id": id, "full_name": user.user_metadata.full_name, "role": role }),
            );
        }
        info!(user_id = %user.id, %role, "profile role set");
        Ok(())
    }

    /// Saves accounts, the current session and all tables to `path` as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads backend state from a JSON file written by [`save_to_file`](Self::save_to_file).
    ///
    /// If the file does not exist, a new, empty backend is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self> {
        persistence::load_from_file(path, clock).await
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}
