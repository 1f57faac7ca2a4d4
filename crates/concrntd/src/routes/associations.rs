use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub uri: String,
    pub schema: Option<String>,
    pub variant: Option<String>,
    pub author: Option<String>,
}

pub async fn list(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    let associations = state
        .associations
        .list(&q.uri, q.schema.as_deref(), q.variant.as_deref(), q.author.as_deref())
        .await?;
    Ok(Json(json!(associations)))
}

#[derive(Debug, Deserialize)]
pub struct CountsQuery {
    pub uri: String,
    pub schema: Option<String>,
}

pub async fn counts(State(state): State<Arc<AppState>>, Query(q): Query<CountsQuery>) -> Result<Json<Value>, ApiError> {
    match q.schema {
        Some(schema) => {
            let counts = state.associations.counts_by_variant(&q.uri, &schema).await?;
            Ok(Json(json!(counts)))
        }
        None => {
            let counts = state.associations.counts_by_schema(&q.uri).await?;
            Ok(Json(json!(counts)))
        }
    }
}
