//! Persistence operations for the in-memory backend
//!
//! Accounts, the current session and every table are written to one JSON
//! file and read back on start.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, atomic::Ordering},
};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{InMemoryBackend, InMemoryIdentity, InMemoryStore, identity::Account};
use crate::{Clock, Result, auth::Session};

/// The current persistence file format version.
/// v0 indicates this is an unstable format subject to breaking changes.
const PERSISTENCE_VERSION: u8 = 0;

/// Helper to check if version is default (0) for serde skip_serializing_if
fn is_v0(v: &u8) -> bool {
    *v == 0
}

/// Validates the persistence version during deserialization.
fn validate_persistence_version<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let version = u8::deserialize(deserializer)?;
    if version != PERSISTENCE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported persistence version {version}; only version {PERSISTENCE_VERSION} is supported"
        )));
    }
    Ok(version)
}

#[derive(Serialize, Deserialize)]
struct SerializableBackend {
    /// File format version for compatibility checking
    #[serde(
        rename = "_v",
        default,
        skip_serializing_if = "is_v0",
        deserialize_with = "validate_persistence_version"
    )]
    version: u8,
    #[serde(default)]
    accounts: HashMap<String, Account>,
    #[serde(default)]
    session: Option<Session>,
    #[serde(default)]
    tables: HashMap<String, Vec<Value>>,
    #[serde(default = "first_id")]
    next_id: i64,
}

fn first_id() -> i64 {
    1
}

/// Saves accounts, session and tables to `path` as pretty JSON.
pub(crate) async fn save_to_file<P: AsRef<Path>>(backend: &InMemoryBackend, path: P) -> Result<()> {
    let serializable = {
        let identity = backend.identity.state.lock().unwrap();
        SerializableBackend {
            version: PERSISTENCE_VERSION,
            accounts: identity.accounts.clone(),
            session: identity.session.clone(),
            tables: backend.store.tables.read().unwrap().clone(),
            next_id: backend.store.next_id.load(Ordering::SeqCst),
        }
    };

    let json = serde_json::to_string_pretty(&serializable)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Loads backend state from `path`.
///
/// If the file does not exist, a new, empty backend is returned.
pub(crate) async fn load_from_file<P: AsRef<Path>>(
    path: P,
    clock: Arc<dyn Clock>,
) -> Result<InMemoryBackend> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let serializable: SerializableBackend = serde_json::from_str(&json)?;

            let store = InMemoryStore::with_clock(clock.clone());
            *store.tables.write().unwrap() = serializable.tables;
            store.next_id.store(serializable.next_id, Ordering::SeqCst);
            let store = Arc::new(store);

            let identity = InMemoryIdentity::with_clock(clock).provision_profiles(store.clone());
            {
                let mut state = identity.state.lock().unwrap();
                state.accounts = serializable.accounts;
                state.session = serializable.session;
            }

            Ok(InMemoryBackend {
                identity: Arc::new(identity),
                store,
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(InMemoryBackend::with_clock(clock))
        }
        Err(e) => Err(e.into()),
    }
}
