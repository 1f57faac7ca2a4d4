//! Domain-level error taxonomy shared across every concrnt crate.
//!
//! HTTP adapters match on the variant (never the message string) to pick
//! a status code; see `concrntd`'s `IntoResponse` impl.

use thiserror::Error;

/// Errors produced by the commit pipeline, the resolver, and the store.
#[derive(Error, Debug)]
pub enum ConcrntError {
    /// Malformed URI, bad JSON, or a missing required parameter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Record, commit, entity, or server not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An association with the same `uniqueHash` already exists.
    #[error("duplicate association")]
    DuplicateAssociation,

    /// An association references a target URI that does not resolve.
    #[error("association target missing: {0}")]
    TargetMissing(String),

    /// JWT validation failed (surfaced by the auth collaborator).
    #[error("unauthorized")]
    Unauthorized,

    /// A peer node returned non-200 or timed out.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Unexpected storage or serialization failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type used throughout the concrnt workspace.
pub type Result<T> = std::result::Result<T, ConcrntError>;

impl From<serde_json::Error> for ConcrntError {
    fn from(err: serde_json::Error) -> Self {
        ConcrntError::InvalidArgument(format!("json: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_variant_specific_messages() {
        assert!(ConcrntError::NotFound("cc://a/b".into())
            .to_string()
            .contains("cc://a/b"));
        assert_eq!(
            ConcrntError::DuplicateAssociation.to_string(),
            "duplicate association"
        );
    }
}
