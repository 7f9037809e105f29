//! Backend implementations of the identity provider and data store seams.
//!
//! * [`in_memory`]: a self-contained backend for development and tests, with
//!   optional JSON persistence.
//! * `supabase` (feature `supabase`): the hosted REST backend, an auth client
//!   and a data client sharing one [`ClientConfig`](crate::ClientConfig).

pub mod in_memory;

#[cfg(feature = "supabase")]
pub mod supabase;

pub use in_memory::{InMemoryBackend, InMemoryIdentity, InMemoryStore};

#[cfg(feature = "supabase")]
pub use supabase::{SupabaseAuth, SupabaseBackend, SupabaseRest};
