//! Chunk arithmetic and the manifest shape a parent URI publishes (spec
//! §4.4 "Chunk model").

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Time bucket width in seconds (spec §4.4).
pub const CHUNK_SECONDS: i64 = 600;

/// Maximum items a single `body` response carries (spec §4.4
/// `defaultChunkSize`).
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// `chunkId = floor(unixSeconds / 600)`.
pub fn time_to_chunk(ts: DateTime<Utc>) -> i64 {
    ts.timestamp().div_euclid(CHUNK_SECONDS)
}

/// Exclusive upper bound of a chunk: the instant the next chunk begins.
pub fn chunk_end(chunk_id: i64) -> DateTime<Utc> {
    Utc.timestamp_opt((chunk_id + 1) * CHUNK_SECONDS, 0).single().expect("valid timestamp")
}

/// Inclusive lower bound of a chunk.
pub fn chunk_start(chunk_id: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(chunk_id * CHUNK_SECONDS, 0).single().expect("valid timestamp")
}

/// The manifest a parent URI publishes (spec §4.4). `iterator_template`
/// and `body_template` mirror the endpoint-templating scheme of spec §4.3
/// (`{owner}`, `{id}`, `{chunk}` placeholders), substituted by the caller
/// before dereferencing a remote chunkline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub version: u32,
    pub chunk_size: i64,
    /// The earliest chunk with at least one child record, or `None` if the
    /// parent has no children yet.
    pub first_chunk: Option<i64>,
    pub iterator_template: String,
    pub body_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Manifest {
    pub fn new(first_chunk: Option<i64>, iterator_template: String, body_template: String) -> Self {
        Manifest {
            version: 1,
            chunk_size: CHUNK_SECONDS,
            first_chunk,
            iterator_template,
            body_template,
            metadata: None,
        }
    }
}

/// One entry in a chunk body listing (spec §4.4 "BodyItem").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyItem {
    pub timestamp: DateTime<Utc>,
    pub href: String,
    pub content_type: String,
}
