use std::sync::{Arc, Mutex};

use clubhub::{
    SessionResolver,
    auth::{IdentityProvider, Role},
    constants::PROFILES,
};
use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn resolves_signed_out_when_there_is_no_session() {
    let (backend, _clock) = backend();
    let resolver = start(&backend);

    let state = resolver.resolved().await;
    assert!(!state.loading);
    assert!(state.session.is_none());
    assert!(state.user.is_none());
    assert!(state.profile.is_none());
}

#[tokio::test]
async fn restores_existing_session_with_profile_before_loading_clears() {
    let (backend, _clock) = backend();
    let user = register_admin(&backend, "ada@uni.edu", "Ada Lovelace").await;
    backend
        .identity
        .sign_in_with_password(clubhub::auth::Credentials::new("ada@uni.edu", PASSWORD))
        .await
        .unwrap();

    let resolver = start(&backend);
    let state = resolver.resolved().await;
    assert_eq!(state.user.as_ref().map(|u| u.id), Some(user.id));
    assert_eq!(state.role(), Role::Admin);
    assert_eq!(state.display_name(), "Ada Lovelace");
}

#[tokio::test]
async fn loading_clears_exactly_once_across_transitions() {
    let (backend, _clock) = backend();
    register(&backend.identity, "grace@uni.edu", "Grace").await;
    let resolver = start(&backend);

    let observed = Arc::new(Mutex::new(Vec::new()));
    let mut rx = resolver.subscribe();
    let record = observed.clone();
    let collector = tokio::spawn(async move {
        record.lock().unwrap().push(rx.borrow_and_update().loading);
        while rx.changed().await.is_ok() {
            record.lock().unwrap().push(rx.borrow_and_update().loading);
        }
    });

    resolver.resolved().await;
    for _ in 0..3 {
        resolver.sign_in("grace@uni.edu", PASSWORD).await.unwrap();
        settle(&resolver, |s| s.profile.is_some()).await;
        resolver.sign_out().await.unwrap();
        settle(&resolver, |s| s.user.is_none() && s.profile.is_none()).await;
    }
    assert!(!resolver.state().loading);

    drop(resolver);
    tokio::time::timeout(SETTLE_TIMEOUT, collector)
        .await
        .expect("collector did not stop")
        .unwrap();

    let observed = observed.lock().unwrap();
    let first_resolved = observed
        .iter()
        .position(|loading| !loading)
        .expect("loading never cleared");
    assert!(observed[first_resolved..].iter().all(|loading| !loading));
}

#[tokio::test]
async fn sign_in_then_sign_out_clears_user_and_profile() {
    let (backend, _clock) = backend();
    register(&backend.identity, "linus@uni.edu", "Linus").await;
    let resolver = start(&backend);
    resolver.resolved().await;

    resolver.sign_in("linus@uni.edu", PASSWORD).await.unwrap();
    // Session and user are set inside the notification, before sign-in returns.
    assert!(resolver.state().is_authenticated());
    let state = settle(&resolver, |s| s.profile.is_some()).await;
    assert_eq!(state.role(), Role::User);

    resolver.sign_out().await.unwrap();
    assert!(resolver.state().user.is_none());
    let state = settle(&resolver, |s| s.profile.is_none()).await;
    assert!(state.session.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn missing_profile_row_is_a_regular_user() {
    let (backend, _clock) = backend();
    // No profile provisioning: the account has no row at all.
    let identity = Arc::new(clubhub::backend::InMemoryIdentity::new());
    register(&identity, "new@uni.edu", "Newcomer").await;
    identity
        .sign_in_with_password(clubhub::auth::Credentials::new("new@uni.edu", PASSWORD))
        .await
        .unwrap();

    let resolver = SessionResolver::start(identity.clone(), backend.store.clone(), redirect_url());
    let state = resolver.resolved().await;
    assert!(state.is_authenticated());
    assert!(state.profile.is_none());
    assert_eq!(state.role(), Role::User);
    assert!(!state.is_admin());
    assert_eq!(backend.store.queries_for(PROFILES).len(), 1);
}

#[tokio::test]
async fn duplicate_profile_rows_degrade_to_no_profile() {
    let (backend, _clock) = backend();
    let user = register_admin(&backend, "dup@uni.edu", "Dup").await;
    backend.store.seed(
        PROFILES,
        json!({ "id": user.id, "full_name": "Shadow", "role": "admin" }),
    );
    backend
        .identity
        .sign_in_with_password(clubhub::auth::Credentials::new("dup@uni.edu", PASSWORD))
        .await
        .unwrap();

    let resolver = start(&backend);
    let state = resolver.resolved().await;
    assert!(state.is_authenticated());
    assert!(state.profile.is_none());
    assert!(!state.is_admin());
}

#[tokio::test]
async fn profile_with_null_role_is_kept_as_a_regular_user() {
    let (backend, _clock) = backend();
    let identity = Arc::new(clubhub::backend::InMemoryIdentity::new());
    let user = register(&identity, "legacy@uni.edu", "legacy").await;
    backend.store.seed(
        PROFILES,
        json!({ "id": user.id, "full_name": "Legacy Person", "role": null }),
    );
    identity
        .sign_in_with_password(clubhub::auth::Credentials::new("legacy@uni.edu", PASSWORD))
        .await
        .unwrap();

    let resolver = SessionResolver::start(identity.clone(), backend.store.clone(), redirect_url());
    let state = resolver.resolved().await;
    let profile = state.profile.as_ref().expect("profile row was discarded");
    assert_eq!(profile.id, user.id);
    assert_eq!(state.role(), Role::User);
    assert!(!state.is_admin());
    assert_eq!(state.display_name(), "Legacy Person");
}

#[tokio::test]
async fn notification_during_startup_wins_over_restored_session() {
    let (backend, _clock) = backend();
    let user = register_admin(&backend, "early@uni.edu", "Early Bird").await;
    let (identity, release) = GatedIdentity::new(backend.identity.clone());
    let resolver =
        SessionResolver::start(Arc::new(identity), backend.store.clone(), redirect_url());

    let observed = Arc::new(Mutex::new(Vec::new()));
    let mut rx = resolver.subscribe();
    let record = observed.clone();
    let collector = tokio::spawn(async move {
        record.lock().unwrap().push(rx.borrow_and_update().loading);
        while rx.changed().await.is_ok() {
            record.lock().unwrap().push(rx.borrow_and_update().loading);
        }
    });

    // The startup lookup is still blocked; this notification arrives first.
    resolver.sign_in("early@uni.edu", PASSWORD).await.unwrap();
    let state = resolver.state();
    assert!(state.loading);
    assert_eq!(state.user.as_ref().map(|u| u.id), Some(user.id));

    release.send(()).unwrap();
    let state = resolver.resolved().await;
    assert!(state.session.is_some());
    assert_eq!(state.user.as_ref().map(|u| u.id), Some(user.id));
    assert_eq!(state.profile.as_ref().map(|p| p.id), Some(user.id));
    assert_eq!(state.role(), Role::Admin);

    drop(resolver);
    tokio::time::timeout(SETTLE_TIMEOUT, collector)
        .await
        .expect("collector did not stop")
        .unwrap();

    let observed = observed.lock().unwrap();
    assert_eq!(observed.first(), Some(&true));
    let first_resolved = observed
        .iter()
        .position(|loading| !loading)
        .expect("loading never cleared");
    assert!(observed[first_resolved..].iter().all(|loading| !loading));
}

#[tokio::test]
async fn failed_profile_lookup_does_not_block_resolution() {
    let (backend, _clock) = backend();
    register(&backend.identity, "offline@uni.edu", "Offline").await;
    backend
        .identity
        .sign_in_with_password(clubhub::auth::Credentials::new("offline@uni.edu", PASSWORD))
        .await
        .unwrap();
    backend.store.set_unavailable(PROFILES, true);

    let resolver = start(&backend);
    let state = resolver.resolved().await;
    assert!(state.is_authenticated());
    assert!(state.profile.is_none());
}

#[tokio::test]
async fn profile_lookup_runs_outside_the_notification() {
    let (backend, _clock) = backend();
    register(&backend.identity, "token@uni.edu", "Token").await;

    // This store calls back into the identity provider, which holds its
    // session lock while notifying. A lookup inside the listener would hang.
    let store = Arc::new(TokenCheckingStore {
        identity: backend.identity.clone(),
        inner: backend.store.clone(),
    });
    let resolver = SessionResolver::start(backend.identity.clone(), store, redirect_url());
    resolver.resolved().await;

    tokio::time::timeout(SETTLE_TIMEOUT, resolver.sign_in("token@uni.edu", PASSWORD))
        .await
        .expect("sign-in deadlocked")
        .unwrap();
    let state = settle(&resolver, |s| s.profile.is_some()).await;
    assert_eq!(state.display_name(), "Token");
}

#[tokio::test]
async fn sign_up_attaches_full_name() {
    let (backend, _clock) = backend();
    let resolver = start(&backend);
    resolver.resolved().await;

    let response = resolver
        .sign_up("Barbara Liskov", "barbara@uni.edu", PASSWORD)
        .await
        .unwrap();
    assert_eq!(
        response.user.user_metadata.full_name.as_deref(),
        Some("Barbara Liskov")
    );
    let state = settle(&resolver, |s| s.profile.is_some()).await;
    assert_eq!(state.display_name(), "Barbara Liskov");
}

#[tokio::test]
async fn wrong_password_leaves_state_untouched() {
    let (backend, _clock) = backend();
    register(&backend.identity, "eve@uni.edu", "Eve").await;
    let resolver = start(&backend);
    let before = resolver.resolved().await;

    let err = resolver.sign_in("eve@uni.edu", "guess").await.unwrap_err();
    assert!(err.is_authentication_error());
    assert_eq!(resolver.state(), before);
}

#[tokio::test]
async fn oauth_code_exchange_signs_in() {
    let (backend, _clock) = backend();
    let resolver = start(&backend);
    resolver.resolved().await;

    let redirect = resolver
        .sign_in_with_oauth(clubhub::auth::OAuthProvider::Google)
        .await
        .unwrap();
    assert_eq!(redirect.provider, clubhub::auth::OAuthProvider::Google);

    let code = backend.identity.authorize_oauth("oauth@uni.edu", Some("O. Auth"));
    resolver.exchange_code(&code).await.unwrap();
    let state = settle(&resolver, |s| s.profile.is_some()).await;
    assert_eq!(state.display_name(), "O. Auth");
}

#[tokio::test]
async fn disposed_resolver_stops_listening() {
    let (backend, _clock) = backend();
    register(&backend.identity, "bye@uni.edu", "Bye").await;
    let resolver = start(&backend);
    resolver.resolved().await;
    assert_eq!(backend.identity.listener_count(), 1);

    let mut state = resolver.subscribe();
    resolver.dispose();
    assert_eq!(backend.identity.listener_count(), 0);

    backend
        .identity
        .sign_in_with_password(clubhub::auth::Credentials::new("bye@uni.edu", PASSWORD))
        .await
        .unwrap();
    assert!(state.borrow_and_update().user.is_none());
}
