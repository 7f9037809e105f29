//! Backend creation and utility functions.

use std::{path::PathBuf, sync::Arc};

use clubhub::{
    ClientConfig, SystemClock,
    auth::{IdentityProvider, OAuthProvider, Role},
    backend::{InMemoryBackend, SupabaseBackend},
    store::DataStore,
};
use tracing::{info, warn};

use crate::cli::{Backend, Cli};

const STORE_FILE: &str = "clubhub.json";
const SESSION_FILE: &str = "session.json";

/// The remote services the client talks to.
pub enum Services {
    InMemory {
        backend: InMemoryBackend,
        path: PathBuf,
    },
    Supabase(SupabaseBackend),
}

impl Services {
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        match self {
            Services::InMemory { backend, .. } => backend.identity.clone(),
            Services::Supabase(backend) => backend.identity(),
        }
    }

    pub fn store(&self) -> Arc<dyn DataStore> {
        match self {
            Services::InMemory { backend, .. } => backend.store.clone(),
            Services::Supabase(backend) => backend.store(),
        }
    }

    /// Complete the provider's consent step locally.
    ///
    /// The in-memory backend has no browser round trip, so it issues the code
    /// directly for `email`. The hosted backend returns `None`; its code
    /// arrives at the callback listener.
    pub fn local_oauth_code(&self, provider: OAuthProvider, email: &str) -> Option<String> {
        match self {
            Services::InMemory { backend, .. } => {
                let email = if email.trim().is_empty() {
                    format!("member@{provider}.local")
                } else {
                    email.trim().to_string()
                };
                Some(backend.identity.authorize_oauth(&email, None))
            }
            Services::Supabase(_) => None,
        }
    }

    /// Persist in-memory state. No-op for the hosted backend.
    pub async fn save(&self) -> clubhub::Result<()> {
        if let Services::InMemory { backend, path } = self {
            backend.save_to_file(path).await?;
            info!(path = %path.display(), "in-memory backend saved");
        }
        Ok(())
    }
}

/// Create the appropriate backend based on configuration
pub async fn create_services(cli: &Cli) -> Result<Services, Box<dyn std::error::Error>> {
    let data_dir = cli.data_dir();

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    match cli.backend {
        Backend::Supabase => {
            if cli.grant_admin.is_some() {
                return Err("--grant-admin is only available with --backend inmemory".into());
            }
            let url = cli
                .url
                .as_deref()
                .ok_or("Supabase backend requires --url or CLUBHUB_URL")?;
            let anon_key = cli
                .anon_key
                .as_deref()
                .ok_or("Supabase backend requires --anon-key or CLUBHUB_ANON_KEY")?;
            let config = ClientConfig::new(url, anon_key, &cli.redirect_url)?
                .with_session_file(data_dir.join(SESSION_FILE));
            info!(url = %config.url, "using hosted backend");
            let backend = SupabaseBackend::connect(config, Arc::new(SystemClock)).await?;
            Ok(Services::Supabase(backend))
        }
        Backend::Inmemory => {
            let path = data_dir.join(STORE_FILE);
            info!(path = %path.display(), "using in-memory backend");
            let backend = match InMemoryBackend::load_from_file(&path, Arc::new(SystemClock)).await
            {
                Ok(backend) => backend,
                Err(e) => {
                    warn!(error = %e, "failed to load in-memory backend; starting fresh");
                    InMemoryBackend::new()
                }
            };
            if let Some(email) = &cli.grant_admin {
                backend
                    .set_role(email, Role::Admin)
                    .map_err(|e| format!("cannot grant admin to {email}: {e}"))?;
                backend.save_to_file(&path).await?;
            }
            Ok(Services::InMemory { backend, path })
        }
    }
}
