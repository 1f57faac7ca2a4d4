use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::state::AppState;

pub async fn well_known(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.well_known())
}
