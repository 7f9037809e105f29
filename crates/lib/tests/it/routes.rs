//! Guard scenarios against resolver state from the in-memory backend.

use clubhub::{
    Route,
    auth::Credentials,
    routes::{Guard, History, guard},
};

use crate::helpers::*;

#[tokio::test]
async fn unauthenticated_dashboard_visit_goes_to_sign_in() {
    let (backend, _clock) = backend();
    let resolver = start(&backend);
    let auth = resolver.resolved().await;

    let mut history = History::default();
    let decision = history.navigate(Route::Dashboard, &auth);
    assert_eq!(decision, Guard::Render);
    assert_eq!(history.current(), Route::SignIn);
    // The protected entry was replaced, so going back skips it.
    assert_eq!(history.entries(), &[Route::Landing, Route::SignIn]);
}

#[tokio::test]
async fn non_admin_admin_dashboard_visit_goes_to_dashboard() {
    let (backend, _clock) = backend();
    register(&backend.identity, "member@uni.edu", "Member").await;
    let resolver = start(&backend);
    resolver.resolved().await;
    resolver.sign_in("member@uni.edu", PASSWORD).await.unwrap();
    let auth = settle(&resolver, |s| s.profile.is_some()).await;

    let mut history = History::new(Route::Profile);
    history.navigate(Route::AdminDashboard, &auth);
    assert_eq!(history.current(), Route::Dashboard);
    assert_eq!(history.entries(), &[Route::Profile, Route::Dashboard]);
}

#[tokio::test]
async fn profileless_user_is_kept_out_of_admin_dashboard() {
    let (backend, _clock) = backend();
    let identity = std::sync::Arc::new(clubhub::backend::InMemoryIdentity::new());
    register(&identity, "ghost@uni.edu", "Ghost").await;
    let resolver =
        clubhub::SessionResolver::start(identity.clone(), backend.store.clone(), redirect_url());
    resolver.resolved().await;
    resolver.sign_in("ghost@uni.edu", PASSWORD).await.unwrap();
    let auth = settle(&resolver, |s| s.user.is_some()).await;

    assert_eq!(
        guard(Route::AdminDashboard, &auth),
        Guard::Redirect {
            to: Route::Dashboard,
            replace: true
        }
    );
    assert_eq!(guard(Route::Dashboard, &auth), Guard::Render);
}

#[tokio::test]
async fn admin_is_never_redirected_from_member_pages() {
    let (backend, _clock) = backend();
    register_admin(&backend, "admin@uni.edu", "Admin Person").await;
    use clubhub::auth::IdentityProvider;
    backend
        .identity
        .sign_in_with_password(Credentials::new("admin@uni.edu", PASSWORD))
        .await
        .unwrap();
    let resolver = start(&backend);
    let auth = resolver.resolved().await;
    assert!(auth.is_admin());

    for route in [Route::Dashboard, Route::Profile, Route::AdminDashboard] {
        assert_eq!(guard(route, &auth), Guard::Render, "{route}");
    }
}

#[tokio::test]
async fn signed_in_guest_pages_push_dashboard() {
    let (backend, _clock) = backend();
    register(&backend.identity, "back@uni.edu", "Back").await;
    let resolver = start(&backend);
    resolver.resolved().await;
    resolver.sign_in("back@uni.edu", PASSWORD).await.unwrap();
    let auth = resolver.state();

    let mut history = History::default();
    history.navigate(Route::SignIn, &auth);
    assert_eq!(
        history.entries(),
        &[Route::Landing, Route::SignIn, Route::Dashboard]
    );
    assert_eq!(history.back(), Some(Route::SignIn));
}

#[tokio::test]
async fn guarded_routes_wait_while_loading() {
    let auth = clubhub::AuthState::initializing();
    let mut history = History::new(Route::AdminDashboard);
    assert_eq!(history.resolve(&auth), Guard::Loading);
    assert_eq!(history.current(), Route::AdminDashboard);
}

#[tokio::test]
async fn sign_out_resolves_protected_page_to_sign_in() {
    let (backend, _clock) = backend();
    register(&backend.identity, "leave@uni.edu", "Leave").await;
    let resolver = start(&backend);
    resolver.resolved().await;
    resolver.sign_in("leave@uni.edu", PASSWORD).await.unwrap();

    let mut history = History::default();
    history.navigate(Route::Profile, &resolver.state());
    assert_eq!(history.current(), Route::Profile);

    resolver.sign_out().await.unwrap();
    history.resolve(&resolver.state());
    assert_eq!(history.current(), Route::SignIn);
}
