//! End-to-end exercise of the chunkline engine against an in-memory
//! store, covering spec §8 scenario 4 ("Chunkline descending") and the
//! multi-chunk iterator-advance path the unit tests in `engine.rs` don't
//! reach (children spread across more than two 600s buckets).

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use concrnt_chunkline::{time_to_chunk, ChunklineEngine};
use concrnt_core::document::{Document, Proof, SignedDocument};
use concrnt_core::uri::compose_cc_uri;
use concrnt_federation::{FederationClient, Resolver};
use concrnt_store::{MemoryStore, RecordStore};

fn owner() -> String {
    "con".to_string() + &"a".repeat(39)
}

fn signed(owner: &str, key: &str, created_at: chrono::DateTime<Utc>) -> SignedDocument {
    let doc = Document {
        key: Some(key.to_string()),
        value: serde_json::json!({"key": key}),
        author: owner.to_string(),
        owner: None,
        schema: "https://example.com/note".to_string(),
        created_at,
        member_of: None,
        associate: None,
        variant: None,
        policies: None,
    };
    SignedDocument {
        document: serde_json::to_string(&doc).unwrap(),
        proof: Proof::signed("sig"),
    }
}

fn local_engine(store: Arc<MemoryStore>) -> ChunklineEngine<MemoryStore> {
    ChunklineEngine::new(
        store,
        Arc::new(Resolver::new("https://home.example.com")),
        Arc::new(FederationClient::new()),
        |_owner| true,
    )
}

#[tokio::test]
async fn forty_children_across_three_buckets_yield_32_newest_descending() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let parent = compose_cc_uri(&owner, "timeline");
    let now = Utc::now();

    // 40 children spaced 30s apart span 1200s, i.e. three 600s buckets.
    for i in 0..40 {
        let ts = now - ChronoDuration::seconds(30 * i);
        store.create_record(&signed(&owner, &format!("timeline/{i:02}"), ts)).await.unwrap();
    }

    let engine = local_engine(store);
    let chunk = time_to_chunk(now);
    let items = engine.body(&parent, chunk).await.unwrap();

    assert_eq!(items.len(), 32);
    for pair in items.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp, "body must be non-increasing by createdAt");
    }

    // The iterator for an empty future chunk walks back to the newest
    // occupied one.
    let future_chunk = chunk + 10;
    let pointer = engine.itr(&parent, future_chunk).await.unwrap();
    assert_eq!(pointer, Some(chunk));
}

#[tokio::test]
async fn query_descending_dedups_and_caps_across_two_parents() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let a = compose_cc_uri(&owner, "feed-a");
    let b = compose_cc_uri(&owner, "feed-b");
    let now = Utc::now();

    for i in 0..10i64 {
        store
            .create_record(&signed(&owner, &format!("feed-a/{i}"), now - ChronoDuration::seconds(i * 2)))
            .await
            .unwrap();
        store
            .create_record(&signed(&owner, &format!("feed-b/{i}"), now - ChronoDuration::seconds(i * 2 + 1)))
            .await
            .unwrap();
    }

    let engine = local_engine(store);
    let merged = engine.query_descending(&[a, b], now, 8).await.unwrap();

    assert_eq!(merged.len(), 8);
    for pair in merged.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
    let mut hrefs: Vec<_> = merged.iter().map(|item| item.href.clone()).collect();
    hrefs.sort();
    hrefs.dedup();
    assert_eq!(hrefs.len(), 8, "merge must not repeat an item across parents");
}

#[tokio::test]
async fn empty_parent_yields_no_manifest_first_chunk() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let parent = compose_cc_uri(&owner, "empty");
    let engine = local_engine(store);
    let manifest = engine.manifest(&parent).await.unwrap();
    assert_eq!(manifest.first_chunk, None);
}
