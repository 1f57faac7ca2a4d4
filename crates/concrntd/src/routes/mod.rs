//! HTTP/WebSocket route handlers (spec §6).
//!
//! Each handler is a thin adapter: parse/validate the request, call into
//! one of the C2–C7 crates, and shape the response. No domain logic lives
//! here.

mod associations;
mod chunkline;
mod commit;
mod query;
mod realtime;
mod register;
mod resource;
mod timeline;
mod well_known;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/.well-known/concrnt", get(well_known::well_known))
        .route("/commit", post(commit::commit))
        .route("/resource/*uri", get(resource::resource))
        .route("/query", get(query::query))
        .route("/chunkline/:owner/:id/:chunk/itr", get(chunkline::itr))
        .route("/chunkline/:owner/:id/:chunk/body", get(chunkline::body))
        .route("/api/v1/register", post(register::register))
        .route("/api/v1/timeline/recent", get(timeline::recent))
        .route("/associations", get(associations::list))
        .route("/association-counts", get(associations::counts))
        .route("/realtime", get(realtime::realtime))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
