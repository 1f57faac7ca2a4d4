//! `POST /api/v1/register` (spec §6, §3 Entity).
//!
//! The affiliation document's exact shape is left to the caller's schema;
//! this only pulls out the fields the Entity row needs (`ccid`, `domain`,
//! `alias`). `meta` is accepted and ignored — nothing downstream consumes
//! it yet.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use concrnt_core::error::ConcrntError;
use concrnt_store::Entity;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub affiliation_document: String,
    pub affiliation_signature: String,
    #[serde(default)]
    pub meta: Value,
    pub invite_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AffiliationDocument {
    ccid: String,
    domain: String,
    alias: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Value>, ApiError> {
    use concrnt_core::config::RegistrationMode;

    match state.registration_mode() {
        RegistrationMode::Close => {
            return Err(ApiError(ConcrntError::Unauthorized));
        }
        RegistrationMode::Invite => {
            if req.invite_token.as_deref().unwrap_or("").is_empty() {
                return Err(ApiError(ConcrntError::Unauthorized));
            }
        }
        RegistrationMode::Open => {}
    }

    let affiliation: AffiliationDocument = serde_json::from_str(&req.affiliation_document)
        .map_err(|e| ApiError(ConcrntError::InvalidArgument(format!("invalid affiliationDocument: {e}"))))?;

    let entity = Entity {
        ccid: affiliation.ccid,
        domain: affiliation.domain,
        alias: affiliation.alias,
        affiliation_document: req.affiliation_document,
        affiliation_signature: req.affiliation_signature,
    };

    let stored = state.records.register_entity(entity).await?;
    Ok(Json(json!({"status": "ok", "entity": stored})))
}
