use thiserror::Error;

use crate::identity::IdentityError;

/// Errors surfaced by explicit client actions.
///
/// Provider and exchange messages are passed through verbatim so the UI can
/// show them as-is.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Provider(String),
    #[error("{0}")]
    Exchange(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Response error: {0}")]
    Parse(String),
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(message) => Self::Provider(message),
            IdentityError::Disabled => Self::Provider(err.to_string()),
            IdentityError::Network(message) => Self::Network(message),
            IdentityError::Parse(message) => Self::Parse(message),
        }
    }
}
