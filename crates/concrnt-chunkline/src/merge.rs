//! Fan-out/fan-in descending merge across parent URIs (spec §4.4
//! "Descending query merge").
//!
//! Each URI is an independent producer of newest-first chunks; a min-heap
//! (ordered so the globally newest buffered item pops first) drains them
//! into one bounded output, advancing a producer's chunk pointer only when
//! its current buffer is exhausted. This is the same shape as any
//! k-way-merge of sorted streams — the streams just happen to be paged
//! over HTTP or a local store a chunk at a time.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use concrnt_core::error::Result;

use crate::manifest::{time_to_chunk, BodyItem};
use crate::source::ChunklineSource;

struct Cursor {
    uri: String,
    source: Arc<dyn ChunklineSource>,
    buffer: VecDeque<BodyItem>,
    /// Chunk id the buffer's oldest-known item came from; `None` once the
    /// source has nothing earlier left to offer.
    next_chunk: Option<i64>,
}

/// Heap entry: ordered purely by the head item's timestamp so
/// `BinaryHeap` (a max-heap) pops the globally newest item next.
struct HeapEntry {
    timestamp: DateTime<Utc>,
    cursor_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

/// Merge the descending child feeds of several parent URIs into one
/// capped, deduplicated, newest-first stream (spec §4.4 step 1-5).
///
/// `resolve_source` maps a parent URI to the `ChunklineSource` that can
/// answer it — a local store wrapper when this node is authoritative, a
/// remote peer client otherwise (spec §4.4 step 1 "group by owning node").
pub async fn query_descending<F>(
    uris: &[String],
    until: DateTime<Utc>,
    limit: usize,
    resolve_source: F,
) -> Result<Vec<BodyItem>>
where
    F: Fn(&str) -> Arc<dyn ChunklineSource>,
{
    let mut cursors = Vec::with_capacity(uris.len());
    let mut heap = BinaryHeap::new();
    let start_chunk = time_to_chunk(until);

    for uri in uris {
        let source = resolve_source(uri);
        let pointer = source.itr(uri, start_chunk).await?;
        let Some(chunk_id) = pointer else {
            continue;
        };
        let mut items: VecDeque<BodyItem> = source.body(uri, chunk_id).await?.into();
        items.retain(|item| item.timestamp <= until);
        let next_chunk = if items.len() as i64 >= crate::manifest::DEFAULT_CHUNK_SIZE as i64 {
            Some(chunk_id - 1)
        } else {
            None
        };
        if let Some(head) = items.front() {
            heap.push(HeapEntry {
                timestamp: head.timestamp,
                cursor_index: cursors.len(),
            });
        }
        cursors.push(Cursor {
            uri: uri.clone(),
            source,
            buffer: items,
            next_chunk,
        });
    }

    let mut out = Vec::with_capacity(limit.min(256));
    let mut seen: HashSet<(String, DateTime<Utc>)> = HashSet::new();

    while out.len() < limit {
        let Some(HeapEntry { cursor_index, .. }) = heap.pop() else {
            break;
        };
        let cursor = &mut cursors[cursor_index];
        let Some(item) = cursor.buffer.pop_front() else {
            continue;
        };

        if seen.insert((item.href.clone(), item.timestamp)) {
            out.push(item);
        }

        if cursor.buffer.is_empty() {
            if let Some(chunk_id) = cursor.next_chunk {
                if let Some(pointer) = cursor.source.itr(&cursor.uri, chunk_id).await? {
                    let mut more: VecDeque<BodyItem> = cursor.source.body(&cursor.uri, pointer).await?.into();
                    more.retain(|item| item.timestamp <= until);
                    cursor.next_chunk = if more.len() as i64 >= crate::manifest::DEFAULT_CHUNK_SIZE as i64 {
                        Some(pointer - 1)
                    } else {
                        None
                    };
                    cursor.buffer = more;
                }
            }
        }
        if let Some(head) = cursor.buffer.front() {
            heap.push(HeapEntry {
                timestamp: head.timestamp,
                cursor_index,
            });
        }
    }

    Ok(out)
}

/// Load a single chunk's body in isolation (spec §4.4 "loadLocalBody"),
/// used directly by the `GET /chunkline/:owner/:id/:chunk/body` handler
/// without going through the cross-URI merge.
pub async fn load_local_body(source: &dyn ChunklineSource, parent_uri: &str, chunk_id: i64) -> Result<Vec<BodyItem>> {
    source.body(parent_uri, chunk_id).await
}
