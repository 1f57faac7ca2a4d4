use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use concrnt_core::error::ConcrntError;
use concrnt_store::{QueryOrder, QueryParams};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct QueryQuery {
    pub prefix: String,
    pub schema: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub order: Option<String>,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Query(q): Query<QueryQuery>,
) -> Result<Json<Value>, ApiError> {
    if q.prefix.is_empty() {
        return Err(ApiError(ConcrntError::InvalidArgument("prefix is required".to_string())));
    }

    let order = match q.order.as_deref() {
        None | Some("asc") => QueryOrder::Asc,
        Some("desc") => QueryOrder::Desc,
        Some(other) => {
            return Err(ApiError(ConcrntError::InvalidArgument(format!("invalid order: {other}"))));
        }
    };

    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let params = QueryParams {
        schema: q.schema,
        since: q.since,
        until: q.until,
        limit,
        order,
    };

    let results = state.records.query(&q.prefix, params).await?;
    Ok(Json(json!(results
        .into_iter()
        .map(|r| json!({"uri": r.uri, "record": r.record}))
        .collect::<Vec<_>>())))
}
