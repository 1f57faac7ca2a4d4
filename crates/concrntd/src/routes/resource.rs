//! `GET /resource/:uri` (spec §6).
//!
//! The URI segment is percent-decoded by axum's path extractor before this
//! handler ever sees it, so `parse_cc_uri` only has to split on `cc://`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use concrnt_core::uri::{classify_owner, parse_cc_uri, OwnerKind};
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

const CHUNKLINE_MEDIA_TYPE: &str = "application/chunkline+json";
const SIGNED_DOCUMENT_MEDIA_TYPE: &str = "application/concrnt.signed-document+json";

pub async fn resource(
    State(state): State<Arc<AppState>>,
    Path(uri): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok((StatusCode::SEE_OTHER, Json(json!({"location": uri}))).into_response());
    }

    if !uri.starts_with("cc://") {
        return Err(ApiError(concrnt_core::error::ConcrntError::InvalidArgument(format!(
            "not a cc:// uri: {uri}"
        ))));
    }

    let (owner, key) = parse_cc_uri(&uri).map_err(|e| concrnt_core::error::ConcrntError::InvalidArgument(e.to_string()))?;

    if key.is_empty() {
        return resolve_owner(&state, &owner).await;
    }

    let resolved = state.records.resolve(&uri).await?;

    let accept = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if accept.contains(CHUNKLINE_MEDIA_TYPE) {
        let manifest = state.chunkline.manifest(&uri).await?;
        return Ok(Json(manifest).into_response());
    }

    // There is no separate store of raw ingress bytes reachable through
    // `RecordStore`; the signed-document rendering falls back to the same
    // materialised record the default rendering serves.
    if accept.contains(SIGNED_DOCUMENT_MEDIA_TYPE) {
        return Ok(Json(resolved.record).into_response());
    }

    Ok(Json(resolved.record).into_response())
}

async fn resolve_owner(state: &AppState, owner: &str) -> Result<Response, ApiError> {
    match classify_owner(owner) {
        OwnerKind::Ccid | OwnerKind::Ckid => match state.records.get_entity(owner).await? {
            Some(entity) => Ok(Json(entity).into_response()),
            None => Err(ApiError(concrnt_core::error::ConcrntError::NotFound(owner.to_string()))),
        },
        _ => {
            if state.is_local_owner(owner) {
                return Ok(Json(state.well_known()).into_response());
            }
            if let Some(server) = state.records.get_server(owner).await? {
                return Ok(Json(server.well_known_blob).into_response());
            }
            let base_url = state
                .resolver
                .resolve(owner, Some(owner))
                .await
                .map_err(concrnt_core::error::ConcrntError::from)?;
            let well_known: serde_json::Value = state
                .federation_client
                .get_json(&format!("{base_url}/.well-known/concrnt"))
                .await
                .map_err(concrnt_core::error::ConcrntError::from)?;
            Ok(Json(well_known).into_response())
        }
    }
}
