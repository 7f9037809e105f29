//! Authentication module for Clubhub
//!
//! This module defines the identity provider seam, the session and profile
//! types it deals in, and the [`SessionResolver`] that turns provider
//! notifications into the application's view of who is signed in.

pub mod errors;
pub mod listeners;
pub mod provider;
pub mod resolver;
pub mod types;

// Re-export main types for easier access
pub use errors::AuthError;
pub use listeners::{AuthListener, ListenerRegistry, Subscription};
pub use provider::IdentityProvider;
pub use resolver::{AuthState, SessionResolver};
pub use types::*;
