use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 16;
const MAX_LIMIT: usize = 64;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub uris: String,
    pub until: Option<chrono::DateTime<Utc>>,
    pub limit: Option<usize>,
}

pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RecentQuery>,
) -> Result<Json<Value>, ApiError> {
    let uris: Vec<String> = q.uris.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    let until = q.until.unwrap_or_else(Utc::now);
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let items = state.chunkline.query_descending(&uris, until, limit).await?;
    Ok(Json(json!(items)))
}
