//! Error types for remote data store operations.

use thiserror::Error;

use crate::Error;

/// Errors raised by a [`DataStore`](super::DataStore) or the typed helpers around it.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response
    #[error("Data store unreachable while accessing '{table}': {reason}")]
    Transport { table: String, reason: String },

    /// The data store answered with an error
    #[error("Data store error on '{table}' ({status}): {message}")]
    Api {
        table: String,
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A single-row lookup matched more than one row
    #[error("Expected at most one row from '{table}', found {count}")]
    MultipleRows { table: String, count: usize },

    /// A row could not be decoded into the requested type
    #[error("Failed to decode row from '{table}': {reason}")]
    Decode { table: String, reason: String },

    /// A value could not be encoded into a row
    #[error("Failed to encode row for '{table}': {reason}")]
    Encode { table: String, reason: String },
}

impl StoreError {
    /// Check if this error came from the network layer
    pub fn is_transport_error(&self) -> bool {
        matches!(self, StoreError::Transport { .. })
    }

    /// Check if this error was reported by the data store itself
    pub fn is_service_error(&self) -> bool {
        matches!(self, StoreError::Api { .. } | StoreError::MultipleRows { .. })
    }

    /// Check if this error is related to data integrity
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, StoreError::MultipleRows { .. })
    }

    /// Check if this error is related to (de)serialization
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, StoreError::Decode { .. } | StoreError::Encode { .. })
    }

    /// The table the failing operation targeted
    pub fn table(&self) -> &str {
        match self {
            StoreError::Transport { table, .. }
            | StoreError::Api { table, .. }
            | StoreError::MultipleRows { table, .. }
            | StoreError::Decode { table, .. }
            | StoreError::Encode { table, .. } => table,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}
