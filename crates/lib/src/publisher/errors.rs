//! Error types for publisher form validation.

use thiserror::Error;

use crate::Error;

/// A form that failed validation. Nothing was sent.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A required field was left blank
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A link field does not hold an absolute URL
    #[error("{field} must be a full URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    /// A date field is not in `YYYY-MM-DDTHH:MM` form
    #[error("{field} is not a valid date and time: {value}")]
    InvalidDate { field: &'static str, value: String },
}

impl FormError {
    /// The form field that failed validation
    pub fn field(&self) -> &'static str {
        match self {
            FormError::MissingField { field }
            | FormError::InvalidUrl { field, .. }
            | FormError::InvalidDate { field, .. } => field,
        }
    }

    /// Check if a required field was missing
    pub fn is_missing_field(&self) -> bool {
        matches!(self, FormError::MissingField { .. })
    }
}

impl From<FormError> for Error {
    fn from(err: FormError) -> Self {
        Error::Form(err)
    }
}
