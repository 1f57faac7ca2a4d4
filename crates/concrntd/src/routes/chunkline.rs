use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use concrnt_core::error::ConcrntError;
use concrnt_core::uri::compose_cc_uri;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

fn parse_chunk(chunk: &str) -> Result<i64, ApiError> {
    chunk
        .parse::<i64>()
        .map_err(|_| ApiError(ConcrntError::InvalidArgument(format!("invalid chunk id: {chunk}"))))
}

pub async fn itr(
    State(state): State<Arc<AppState>>,
    Path((owner, id, chunk)): Path<(String, String, String)>,
) -> Result<String, ApiError> {
    let chunk_id = parse_chunk(&chunk)?;
    let parent_uri = compose_cc_uri(&owner, &id);
    let next = state.chunkline.itr(&parent_uri, chunk_id).await?;
    Ok(next.map(|c| c.to_string()).unwrap_or_default())
}

pub async fn body(
    State(state): State<Arc<AppState>>,
    Path((owner, id, chunk)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let chunk_id = parse_chunk(&chunk)?;
    let parent_uri = compose_cc_uri(&owner, &id);
    let items = state.chunkline.body(&parent_uri, chunk_id).await?;
    Ok(Json(serde_json::to_value(items).map_err(ConcrntError::from)?))
}
