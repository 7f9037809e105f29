//! Local listener for the OAuth redirect.
//!
//! The provider sends the browser to the configured redirect URL with either
//! `?code=…` or `?error=…&error_description=…`. When that URL points at this
//! machine we serve it and forward the outcome to the UI loop.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

/// What the redirect delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Code(String),
    Denied(String),
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    fn into_callback(self) -> Option<Callback> {
        if let Some(code) = self.code.filter(|c| !c.is_empty()) {
            return Some(Callback::Code(code));
        }
        self.error_description
            .or(self.error)
            .map(Callback::Denied)
    }
}

const SIGNED_IN_PAGE: &str = "<!doctype html><title>Clubhub</title>\
<p>Sign-in received. You can close this tab and return to the terminal.</p>";
const DENIED_PAGE: &str = "<!doctype html><title>Clubhub</title>\
<p>Sign-in was not completed. Return to the terminal to try again.</p>";

async fn handle_callback(
    State(callbacks): State<mpsc::UnboundedSender<Callback>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    match params.into_callback() {
        Some(callback) => {
            let page = match &callback {
                Callback::Code(_) => SIGNED_IN_PAGE,
                Callback::Denied(_) => DENIED_PAGE,
            };
            debug!(?callback, "OAuth redirect received");
            if callbacks.send(callback).is_err() {
                warn!("OAuth redirect arrived after the client shut down");
            }
            Html(page)
        }
        None => Html(DENIED_PAGE),
    }
}

/// Whether `url` names this machine.
fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        Some(url::Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

/// Serve `redirect_url`'s path on its loopback address.
///
/// Returns the bound address, or `None` when the redirect URL is not local
/// (the code then has to come from elsewhere).
pub async fn listen(
    redirect_url: &Url,
    callbacks: mpsc::UnboundedSender<Callback>,
) -> std::io::Result<Option<SocketAddr>> {
    if !is_loopback(redirect_url) {
        info!(%redirect_url, "redirect URL is not local; OAuth callback listener disabled");
        return Ok(None);
    }
    let host = match redirect_url.host() {
        Some(url::Host::Domain(_)) | None => "127.0.0.1".to_string(),
        Some(host) => host.to_string(),
    };
    let port = redirect_url.port_or_known_default().unwrap_or(80);

    let app = Router::new()
        .route(redirect_url.path(), get(handle_callback))
        .with_state(callbacks);
    let listener = tokio::net::TcpListener::bind((host.trim_matches(['[', ']']), port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, path = redirect_url.path(), "OAuth callback listener started");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "OAuth callback listener stopped");
        }
    });
    Ok(Some(addr))
}
