//! Usecase-local error conditions, folded into `concrnt_core::ConcrntError`
//! at the boundary so HTTP adapters only ever match on one taxonomy.

use concrnt_core::error::ConcrntError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitError {
    /// The signed document's `document` field is not valid JSON, or is
    /// missing a field required by the schema it claims.
    #[error("invalid commit document: {0}")]
    InvalidDocument(String),

    /// A downstream store or federation call failed.
    #[error(transparent)]
    Domain(#[from] ConcrntError),
}

impl From<CommitError> for ConcrntError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::InvalidDocument(msg) => ConcrntError::InvalidArgument(msg),
            CommitError::Domain(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, CommitError>;
