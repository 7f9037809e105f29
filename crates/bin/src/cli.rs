//! CLI argument definitions for the Clubhub binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Where the OAuth provider sends the browser back to by default.
pub const DEFAULT_REDIRECT_URL: &str = "http://127.0.0.1:5454/auth/callback";

/// Remote backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Hosted auth and table APIs (default)
    Supabase,
    /// In-memory with JSON persistence (for development and demos)
    Inmemory,
}

/// Clubhub terminal client
#[derive(Parser, Debug)]
#[command(name = "clubhub")]
#[command(about = "Clubhub: events and announcements for university clubs")]
#[command(version)]
pub struct Cli {
    /// Route to open on start, e.g. /dashboard
    #[arg(value_name = "ROUTE", default_value = "/")]
    pub route: String,

    /// Backend to use
    #[arg(short, long, default_value = "supabase", env = "CLUBHUB_BACKEND")]
    pub backend: Backend,

    /// Project URL of the hosted backend (required when backend=supabase)
    #[arg(long, env = "CLUBHUB_URL")]
    pub url: Option<String>,

    /// Public anonymous API key of the hosted backend (required when backend=supabase)
    #[arg(long, env = "CLUBHUB_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Redirect target for email confirmation and OAuth sign-in.
    /// A loopback address is served locally to receive the OAuth code.
    #[arg(long, default_value = DEFAULT_REDIRECT_URL, env = "CLUBHUB_REDIRECT_URL")]
    pub redirect_url: String,

    /// Data directory for the session file, the log file and in-memory storage.
    #[arg(short = 'D', long, env = "CLUBHUB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter directives
    #[arg(long, default_value = "clubhub=info", env = "CLUBHUB_LOG")]
    pub log: String,

    /// Give the account with this email the admin role (backend=inmemory only)
    #[arg(long, value_name = "EMAIL")]
    pub grant_admin: Option<String>,
}

impl Cli {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
