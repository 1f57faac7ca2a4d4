//! End-to-end scenarios driving the full HTTP surface through the axum
//! router directly (spec §8 "End-to-end scenarios"), with an in-memory
//! store standing in for SurrealDB.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use concrnt_core::config::{NodeConfig, RegistrationMode};
use concrnt_core::document::{Document, Proof, SignedDocument};
use concrnt_core::uri::compose_cc_uri;
use concrnt_store::MemoryStore;
use concrntd::routes;
use concrntd::state::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn owner() -> String {
    "con".to_string() + &"a".repeat(39)
}

fn config() -> NodeConfig {
    NodeConfig {
        port: 8000,
        dsn: "mem://".to_string(),
        cache_address: None,
        broker_address: None,
        private_key: "test-key".to_string(),
        fqdn: "node.example.com".to_string(),
        layer: "0".to_string(),
        registration_mode: RegistrationMode::Open,
        trace_endpoint: None,
    }
}

fn router() -> axum::Router {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config(), store.clone(), store));
    routes::build_router(state)
}

fn note(owner: &str, key: &str, value: Value) -> Document {
    Document {
        key: Some(key.to_string()),
        value,
        author: owner.to_string(),
        owner: None,
        schema: "https://example.com/schemas/note".to_string(),
        created_at: Utc::now(),
        member_of: None,
        associate: None,
        variant: None,
        policies: None,
    }
}

fn commit_request(doc: &Document) -> Request<Body> {
    let signed = SignedDocument {
        document: serde_json::to_string(doc).unwrap(),
        proof: Proof::signed("sig"),
    };
    Request::builder()
        .method("POST")
        .uri("/commit")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&signed).unwrap()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// E2E scenario 1: create & read.
#[tokio::test]
async fn create_and_read_round_trips_through_http() {
    let app = router();
    let owner = owner();
    let doc = note(&owner, "hello", json!({"msg": "hi"}));

    let commit_resp = app.clone().oneshot(commit_request(&doc)).await.unwrap();
    assert_eq!(commit_resp.status(), StatusCode::OK);

    let uri = compose_cc_uri(&owner, "hello");
    let encoded = percent_encoding::utf8_percent_encode(&uri, percent_encoding::NON_ALPHANUMERIC).to_string();

    let get_resp = app
        .oneshot(Request::builder().uri(format!("/resource/{encoded}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(get_resp.status(), StatusCode::OK);
    let body = json_body(get_resp).await;
    assert_eq!(body["value"]["msg"], "hi");
}

// E2E scenario 2: overwrite.
#[tokio::test]
async fn overwrite_same_key_returns_newest_value() {
    let app = router();
    let owner = owner();

    let first = note(&owner, "k", json!({"v": 1}));
    app.clone().oneshot(commit_request(&first)).await.unwrap();

    let second = note(&owner, "k", json!({"v": 2}));
    app.clone().oneshot(commit_request(&second)).await.unwrap();

    let uri = compose_cc_uri(&owner, "k");
    let encoded = percent_encoding::utf8_percent_encode(&uri, percent_encoding::NON_ALPHANUMERIC).to_string();
    let resp = app
        .oneshot(Request::builder().uri(format!("/resource/{encoded}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["value"]["v"], 2);
}

// E2E scenario 3: association & counts.
#[tokio::test]
async fn association_counts_reflect_schema_and_variant() {
    let app = router();
    let owner = owner();

    let record = note(&owner, "target", json!({"msg": "hi"}));
    app.clone().oneshot(commit_request(&record)).await.unwrap();
    let target_uri = compose_cc_uri(&owner, "target");

    let mut a1 = note(&owner, "a1", json!({"reaction": "+1"}));
    a1.key = None;
    a1.schema = "https://example.com/schemas/reaction".to_string();
    a1.variant = Some("v1".to_string());
    a1.associate = Some(target_uri.clone());
    let r1 = app.clone().oneshot(commit_request(&a1)).await.unwrap();
    assert_eq!(r1.status(), StatusCode::OK);

    let mut a2 = a1.clone();
    a2.created_at = Utc::now();
    let r2 = app.clone().oneshot(commit_request(&a2)).await.unwrap();
    assert_eq!(r2.status(), StatusCode::BAD_REQUEST);

    let mut a3 = note(&owner, "a3", json!({"reaction": "-1"}));
    a3.key = None;
    a3.schema = "https://example.com/schemas/reaction".to_string();
    a3.variant = Some("v2".to_string());
    a3.associate = Some(target_uri.clone());
    let r3 = app.clone().oneshot(commit_request(&a3)).await.unwrap();
    assert_eq!(r3.status(), StatusCode::OK);

    let encoded_uri = percent_encoding::utf8_percent_encode(&target_uri, percent_encoding::NON_ALPHANUMERIC).to_string();
    let counts_resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/association-counts?uri={encoded_uri}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let counts = json_body(counts_resp).await;
    assert_eq!(counts["https://example.com/schemas/reaction"], 2);

    let variant_resp = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/association-counts?uri={encoded_uri}&schema=https%3A%2F%2Fexample.com%2Fschemas%2Freaction"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let variant_counts = json_body(variant_resp).await;
    assert_eq!(variant_counts, json!([["v1", 1], ["v2", 1]]));
}

#[tokio::test]
async fn well_known_reports_this_nodes_descriptor() {
    let app = router();
    let resp = app.oneshot(Request::builder().uri("/.well-known/concrnt").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["domain"], "node.example.com");
    assert_eq!(body["version"], "2.0");
}

#[tokio::test]
async fn query_without_prefix_is_bad_request() {
    let app = router();
    let resp = app.oneshot(Request::builder().uri("/query").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
