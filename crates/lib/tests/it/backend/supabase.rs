//! Hosted REST clients against a local stub of the auth and table APIs.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clubhub::{
    ClientConfig, Clock, FixedClock,
    auth::{AuthChange, AuthChangeEvent, AuthError, Credentials, IdentityProvider, OAuthProvider, SignUpRequest},
    backend::{SupabaseAuth, SupabaseBackend},
    content,
    publisher::{ContentPublisher, SubmitOutcome},
    store::{DataStore, Select, StoreError},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

const ANON_KEY: &str = "anon-key";
const ACCESS_TOKEN: &str = "user-access-token";
const USER_ID: &str = "6f1c1a1e-8a7e-4c1b-9a55-1d2f3e4a5b6c";

/// One request as the stub saw it.
#[derive(Debug, Clone)]
struct Recorded {
    method: &'static str,
    path: String,
    query: Option<String>,
    apikey: Option<String>,
    authorization: Option<String>,
    prefer: Option<String>,
    body: Option<Value>,
}

#[derive(Clone, Default)]
struct Stub {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    fn record(
        &self,
        method: &'static str,
        path: String,
        query: Option<String>,
        headers: &HeaderMap,
        body: Option<Value>,
    ) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            query,
            apikey: header("apikey"),
            authorization: header("authorization"),
            prefer: header("prefer"),
            body,
        });
    }

    fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

fn session_json() -> Value {
    json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-token",
        "user": {
            "id": USER_ID,
            "email": "ada@uni.edu",
            "user_metadata": { "full_name": "Ada Lovelace" },
            "app_metadata": { "provider": "email" }
        }
    })
}

#[derive(serde::Deserialize)]
struct Grant {
    grant_type: String,
}

async fn token(
    State(stub): State<Stub>,
    Query(grant): Query<Grant>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record(
        "POST",
        "/auth/v1/token".into(),
        Some(format!("grant_type={}", grant.grant_type)),
        &headers,
        Some(body.clone()),
    );
    match grant.grant_type.as_str() {
        "password" if body["password"] == "secret" => Json(session_json()).into_response(),
        "password" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
        )
            .into_response(),
        "pkce" if body["auth_code"] == "good-code" => Json(session_json()).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "code": 404, "error_code": "flow_state_not_found", "msg": "invalid flow state" })),
        )
            .into_response(),
    }
}

async fn signup(
    State(stub): State<Stub>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", "/auth/v1/signup".into(), query, &headers, Some(body.clone()));
    if body["email"] == "taken@uni.edu" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 422, "error_code": "user_already_exists", "msg": "User already registered" })),
        )
            .into_response();
    }
    Json(json!({
        "id": USER_ID,
        "email": body["email"],
        "user_metadata": body["data"],
        "app_metadata": {}
    }))
    .into_response()
}

async fn logout(State(stub): State<Stub>, headers: HeaderMap) -> StatusCode {
    stub.record("POST", "/auth/v1/logout".into(), None, &headers, None);
    StatusCode::NO_CONTENT
}

async fn select(
    State(stub): State<Stub>,
    Path(table): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    stub.record("GET", format!("/rest/v1/{table}"), query, &headers, None);
    match table.as_str() {
        "events" => Json(json!([{
            "id": 1,
            "club_id": "stereo",
            "title": "Open mic",
            "event_date": "2025-03-01T18:00:00+00:00",
            "venue": "Hall B",
            "description": "Bring an instrument",
            "registration_link": null,
            "created_at": "2025-02-01T10:00:00.123456+00:00"
        }]))
        .into_response(),
        "announcements" | "profiles" => Json(json!([])).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "code": "42P01", "details": null, "hint": null, "message": format!("relation \"public.{table}\" does not exist") })),
        )
            .into_response(),
    }
}

async fn insert(
    State(stub): State<Stub>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    stub.record("POST", format!("/rest/v1/{table}"), None, &headers, Some(body));
    StatusCode::CREATED
}

async fn serve_stub() -> (Stub, SocketAddr) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/logout", post(logout))
        .route("/rest/v1/{table}", get(select).post(insert))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (stub, addr)
}

fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(
        &format!("http://{addr}"),
        ANON_KEY,
        "http://127.0.0.1:5454/auth/callback",
    )
    .unwrap()
}

async fn connect(config: ClientConfig) -> SupabaseBackend {
    SupabaseBackend::connect(config, Arc::new(FixedClock::default()))
        .await
        .unwrap()
}

#[tokio::test]
async fn password_sign_in_notifies_and_persists() {
    let (stub, addr) = serve_stub().await;
    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");
    let backend = connect(config(addr).with_session_file(&session_file)).await;

    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = events.clone();
    let _subscription = backend
        .identity
        .on_auth_state_change(Arc::new(move |change: &AuthChange| {
            seen.lock().unwrap().push(change.event)
        }));

    let session = backend
        .identity
        .sign_in_with_password(Credentials::new("ada@uni.edu", "secret"))
        .await
        .unwrap();
    assert_eq!(session.user.user_metadata.full_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(
        session.expires_at,
        Some(FixedClock::default().now_secs() + 3600)
    );
    assert_eq!(*events.lock().unwrap(), [AuthChangeEvent::SignedIn]);

    let sent = &stub.requests_to("/auth/v1/token")[0];
    assert_eq!(sent.query.as_deref(), Some("grant_type=password"));
    assert_eq!(sent.apikey.as_deref(), Some(ANON_KEY));
    assert_eq!(sent.body.as_ref().unwrap()["email"], "ada@uni.edu");

    // A fresh client picks the session up from disk.
    let restored = SupabaseAuth::connect(
        config(addr).with_session_file(&session_file),
        Arc::new(FixedClock::default()),
    )
    .await
    .unwrap();
    let restored = restored.get_session().await.unwrap().unwrap();
    assert_eq!(restored.access_token, ACCESS_TOKEN);
}

#[tokio::test]
async fn rejected_password_maps_to_invalid_credentials() {
    let (_stub, addr) = serve_stub().await;
    let backend = connect(config(addr)).await;
    let err = backend
        .identity
        .sign_in_with_password(Credentials::new("ada@uni.edu", "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, clubhub::Error::Auth(AuthError::InvalidCredentials)));
    assert!(backend.identity.access_token().await.is_none());
}

#[tokio::test]
async fn sign_up_sends_name_and_redirect() {
    let (stub, addr) = serve_stub().await;
    let backend = connect(config(addr)).await;
    let request = SignUpRequest {
        credentials: Credentials::new("new@uni.edu", "secret"),
        full_name: "New Member".into(),
        redirect_to: Url::parse("http://127.0.0.1:5454/").unwrap(),
    };
    let response = backend.identity.sign_up(request.clone()).await.unwrap();
    assert!(response.needs_confirmation());
    assert_eq!(response.user.user_metadata.full_name.as_deref(), Some("New Member"));

    let sent = &stub.requests_to("/auth/v1/signup")[0];
    assert_eq!(
        sent.query.as_deref(),
        Some("redirect_to=http%3A%2F%2F127.0.0.1%3A5454%2F")
    );
    assert_eq!(sent.body.as_ref().unwrap()["data"]["full_name"], "New Member");

    let taken = SignUpRequest {
        credentials: Credentials::new("taken@uni.edu", "secret"),
        ..request
    };
    let err = backend.identity.sign_up(taken).await.unwrap_err();
    assert!(matches!(
        err,
        clubhub::Error::Auth(AuthError::EmailAlreadyRegistered { .. })
    ));
}

#[tokio::test]
async fn oauth_redirect_uses_pkce_and_exchange_consumes_it() {
    let (stub, addr) = serve_stub().await;
    let backend = connect(config(addr)).await;
    let redirect_to = Url::parse("http://127.0.0.1:5454/auth/callback").unwrap();

    let redirect = backend
        .identity
        .sign_in_with_oauth(OAuthProvider::Google, &redirect_to)
        .await
        .unwrap();
    assert_eq!(redirect.url.path(), "/auth/v1/authorize");
    let params: std::collections::HashMap<_, _> = redirect.url.query_pairs().into_owned().collect();
    assert_eq!(params["provider"], "google");
    assert_eq!(params["redirect_to"], redirect_to.as_str());
    assert_eq!(params["code_challenge_method"], "s256");
    assert_eq!(params["code_challenge"].len(), 43);

    backend
        .identity
        .exchange_code_for_session("good-code")
        .await
        .unwrap();
    let sent = &stub.requests_to("/auth/v1/token")[0];
    assert_eq!(sent.query.as_deref(), Some("grant_type=pkce"));
    assert_eq!(
        sent.body.as_ref().unwrap()["code_verifier"].as_str().map(str::len),
        Some(64)
    );

    // The verifier is single use.
    let err = backend
        .identity
        .exchange_code_for_session("good-code")
        .await
        .unwrap_err();
    assert!(matches!(err, clubhub::Error::Auth(AuthError::InvalidAuthCode)));
}

#[tokio::test]
async fn unknown_auth_code_is_rejected() {
    let (_stub, addr) = serve_stub().await;
    let backend = connect(config(addr)).await;
    backend
        .identity
        .sign_in_with_oauth(
            OAuthProvider::Github,
            &Url::parse("http://127.0.0.1:5454/").unwrap(),
        )
        .await
        .unwrap();
    let err = backend
        .identity
        .exchange_code_for_session("stale-code")
        .await
        .unwrap_err();
    assert!(matches!(err, clubhub::Error::Auth(AuthError::InvalidAuthCode)));
}

#[tokio::test]
async fn selects_carry_query_key_and_user_token() {
    let (stub, addr) = serve_stub().await;
    let backend = connect(config(addr)).await;

    // Signed out: the anonymous key doubles as the bearer.
    let events = content::fetch_events(backend.store.as_ref(), "stereo")
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Open mic");
    let sent = &stub.requests_to("/rest/v1/events")[0];
    assert_eq!(
        sent.query.as_deref(),
        Some("select=*&club_id=eq.stereo&order=event_date.desc")
    );
    assert_eq!(sent.apikey.as_deref(), Some(ANON_KEY));
    assert_eq!(sent.authorization.as_deref(), Some("Bearer anon-key"));

    backend
        .identity
        .sign_in_with_password(Credentials::new("ada@uni.edu", "secret"))
        .await
        .unwrap();
    let announcements = content::fetch_announcements(backend.store.as_ref())
        .await
        .unwrap();
    assert!(announcements.is_empty());
    let sent = &stub.requests_to("/rest/v1/announcements")[0];
    assert_eq!(
        sent.query.as_deref(),
        Some("select=*&order=created_at.desc&limit=5")
    );
    assert_eq!(
        sent.authorization.as_deref(),
        Some(format!("Bearer {ACCESS_TOKEN}").as_str())
    );
}

#[tokio::test]
async fn table_errors_surface_code_and_message() {
    let (_stub, addr) = serve_stub().await;
    let backend = connect(config(addr)).await;
    let err = backend
        .store
        .select(&Select::from("clubs"))
        .await
        .unwrap_err();
    assert!(err.is_service_error());
    let clubhub::Error::Store(StoreError::Api {
        status, code, message, ..
    }) = err
    else {
        panic!("expected an API error");
    };
    assert_eq!(status, 404);
    assert_eq!(code.as_deref(), Some("42P01"));
    assert!(message.contains("public.clubs"));
}

#[tokio::test]
async fn published_event_omits_blank_link_on_the_wire() {
    let (stub, addr) = serve_stub().await;
    let backend = connect(config(addr)).await;
    let publisher = ContentPublisher::new(backend.store(), Arc::new(FixedClock::default()));
    publisher.select_club("stereo");
    publisher.edit_event(|form| {
        form.title = "Open mic".into();
        form.event_date = "2025-03-01T18:00".into();
        form.venue = "Hall B".into();
        form.description = "Bring an instrument".into();
    });

    assert_eq!(publisher.publish_event().await, SubmitOutcome::Published);
    let sent = &stub.requests_to("/rest/v1/events")[0];
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.prefer.as_deref(), Some("return=minimal"));
    let body = sent.body.as_ref().unwrap().as_object().unwrap();
    assert!(!body.contains_key("registration_link"));
    assert_eq!(body["club_id"], "stereo");
}

#[tokio::test]
async fn sign_out_revokes_remotely_and_forgets_session() {
    let (stub, addr) = serve_stub().await;
    let dir = TempDir::new().unwrap();
    let session_file = dir.path().join("session.json");
    let backend = connect(config(addr).with_session_file(&session_file)).await;
    backend
        .identity
        .sign_in_with_password(Credentials::new("ada@uni.edu", "secret"))
        .await
        .unwrap();
    assert!(session_file.exists());

    backend.identity.sign_out().await.unwrap();
    let sent = &stub.requests_to("/auth/v1/logout")[0];
    assert_eq!(
        sent.authorization.as_deref(),
        Some(format!("Bearer {ACCESS_TOKEN}").as_str())
    );
    assert!(backend.identity.get_session().await.unwrap().is_none());
    assert!(!session_file.exists());
}
