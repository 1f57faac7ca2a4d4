use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use concrnt_core::document::SignedDocument;
use concrnt_usecase::CommitOutcome;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn commit(
    State(state): State<Arc<AppState>>,
    Json(signed): Json<SignedDocument>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.usecase.commit(&signed).await.map_err(concrnt_core::error::ConcrntError::from)?;
    let body = match outcome {
        CommitOutcome::Created { document_id, uri } => json!({"status": "ok", "documentId": document_id, "uri": uri}),
        CommitOutcome::Associated { document_id, target_uri } => {
            json!({"status": "ok", "documentId": document_id, "targetUri": target_uri})
        }
        CommitOutcome::Deleted { target_uri } => json!({"status": "ok", "targetUri": target_uri}),
    };
    Ok(Json(body))
}
