use std::{fs, sync::Arc};

use clubhub::{
    FixedClock,
    auth::{Credentials, IdentityProvider, Role},
    backend::InMemoryBackend,
    constants::PROFILES,
};
use tempfile::TempDir;

use crate::helpers::*;

#[tokio::test]
async fn test_in_memory_backend_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clubhub.json");

    let user = {
        let (backend, _clock) = backend();
        let user = register_admin(&backend, "keeper@uni.edu", "Keeper").await;
        backend
            .identity
            .sign_in_with_password(Credentials::new("keeper@uni.edu", PASSWORD))
            .await
            .unwrap();
        backend.save_to_file(&path).await.unwrap();
        user
    };
    assert!(path.exists());

    let loaded = InMemoryBackend::load_from_file(&path, Arc::new(FixedClock::default()))
        .await
        .unwrap();
    assert_eq!(loaded.identity.account_count(), 1);
    let session = loaded.identity.get_session().await.unwrap().unwrap();
    assert_eq!(session.user_id(), user.id);

    let resolver = start(&loaded);
    let state = resolver.resolved().await;
    assert_eq!(state.role(), Role::Admin);

    // Passwords survive the round trip as hashes only.
    let raw = fs::read_to_string(&path).unwrap();
    assert!(!raw.contains(PASSWORD));
    assert!(raw.contains("$argon2"));
}

#[tokio::test]
async fn test_load_non_existent_file() {
    let dir = TempDir::new().unwrap();
    let loaded = InMemoryBackend::load_from_file(
        dir.path().join("missing.json"),
        Arc::new(FixedClock::default()),
    )
    .await
    .unwrap();
    assert_eq!(loaded.identity.account_count(), 0);
    assert!(loaded.store.rows(PROFILES).is_empty());
}

#[tokio::test]
async fn test_load_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let err = InMemoryBackend::load_from_file(&path, Arc::new(FixedClock::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, clubhub::Error::Serialize(_)));
}

#[tokio::test]
async fn test_load_rejects_unknown_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("future.json");
    fs::write(&path, r#"{ "_v": 7, "tables": {} }"#).unwrap();

    assert!(
        InMemoryBackend::load_from_file(&path, Arc::new(FixedClock::default()))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_loaded_backend_keeps_assigning_fresh_ids() {
    use clubhub::store::DataStore;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ids.json");
    let (backend, _clock) = backend();
    backend
        .store
        .insert("announcements", serde_json::json!({ "title": "one" }))
        .await
        .unwrap();
    backend.save_to_file(&path).await.unwrap();

    let loaded = InMemoryBackend::load_from_file(&path, Arc::new(FixedClock::default()))
        .await
        .unwrap();
    loaded
        .store
        .insert("announcements", serde_json::json!({ "title": "two" }))
        .await
        .unwrap();
    let rows = loaded.store.rows("announcements");
    assert_eq!(rows[0]["id"], 1);
    assert_eq!(rows[1]["id"], 2);
}
