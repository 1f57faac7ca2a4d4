//! concrnt-chunkline: the descending, time-bucketed timeline feed engine
//! (component C6).
//!
//! A parent URI's children are never globally indexed — each node only
//! ever sees its own records. This crate lets a caller ask "recent items
//! across these N parent URIs" anyway, by treating each URI as an
//! independent descending producer (local store or remote peer,
//! transparently) and fanning them into one bounded, deduplicated,
//! newest-first stream.
//!
//! - `manifest`: chunk arithmetic (§4.4 "Chunk model") and the wire shapes.
//! - `source`: `ChunklineSource`, the local/remote seam a parent URI's
//!   chunks are read through.
//! - `merge`: the cross-URI descending merge (§4.4 "Descending query
//!   merge") and the single-chunk body loader.
//! - `engine`: manifest caching and local/remote routing, wired together
//!   for a concrnt node binary to call directly.

pub mod engine;
pub mod manifest;
pub mod merge;
pub mod source;

pub use engine::ChunklineEngine;
pub use manifest::{chunk_end, chunk_start, time_to_chunk, BodyItem, Manifest, CHUNK_SECONDS, DEFAULT_CHUNK_SIZE};
pub use merge::{load_local_body, query_descending};
pub use source::{ChunklineSource, LocalSource, RemoteSource};

/// concrnt-chunkline version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
