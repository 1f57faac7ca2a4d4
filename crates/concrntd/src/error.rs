//! Maps the domain error taxonomy (`concrnt_core::ConcrntError`) to HTTP
//! status codes (spec §7 "Propagation policy"). Handlers return
//! `Result<T, ApiError>` and never construct a `Response` by hand for the
//! error path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use concrnt_core::error::ConcrntError;
use serde_json::json;

pub struct ApiError(pub ConcrntError);

impl From<ConcrntError> for ApiError {
    fn from(err: ConcrntError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Spec §7 enumerates exactly five status codes (400/404/401/502/500)
        // for seven error kinds: duplicate-association and target-missing
        // both fall under 400, alongside invalid-argument.
        let status = match &self.0 {
            ConcrntError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ConcrntError::NotFound(_) => StatusCode::NOT_FOUND,
            ConcrntError::DuplicateAssociation => StatusCode::BAD_REQUEST,
            ConcrntError::TargetMissing(_) => StatusCode::BAD_REQUEST,
            ConcrntError::Unauthorized => StatusCode::UNAUTHORIZED,
            ConcrntError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ConcrntError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
