//! Errors local to federation, folded into `ConcrntError` at the boundary.

use concrnt_core::ConcrntError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("peer request failed: {0}")]
    Upstream(String),

    #[error("could not resolve identifier: {0}")]
    NotFound(String),

    #[error("invalid endpoint template: {0}")]
    InvalidTemplate(String),
}

impl From<FederationError> for ConcrntError {
    fn from(err: FederationError) -> Self {
        match err {
            FederationError::Upstream(msg) => ConcrntError::Upstream(msg),
            FederationError::NotFound(what) => ConcrntError::NotFound(what),
            FederationError::InvalidTemplate(msg) => ConcrntError::InvalidArgument(msg),
        }
    }
}

impl From<reqwest::Error> for FederationError {
    fn from(err: reqwest::Error) -> Self {
        FederationError::Upstream(err.to_string())
    }
}
