//! `ChunklineSource`: the one seam between "ask my own store" and "ask a
//! peer over HTTP" that the descending merge (spec §4.4 step 3) is blind
//! to. `LocalSource` answers from a `RecordStore` directly; `RemoteSource`
//! dereferences the endpoint templates a peer's manifest advertises.

use std::sync::Arc;

use async_trait::async_trait;
use concrnt_core::error::{ConcrntError, Result};
use concrnt_federation::{expand_endpoint, FederationClient};
use concrnt_store::{QueryOrder, QueryParams, RecordStore};

use crate::manifest::{chunk_end, time_to_chunk, BodyItem, Manifest, CHUNK_SECONDS, DEFAULT_CHUNK_SIZE};

/// The schema synthesised `memberOf` commits carry (spec §4.1.7); a
/// `BodyItem` built from one of these overrides `href`/`content_type` from
/// the reference's own value instead of pointing at itself.
const REFERENCE_SCHEMA: &str = "reference";
const DEFAULT_CONTENT_TYPE: &str = "application/concrnt.document+json";

#[async_trait]
pub trait ChunklineSource: Send + Sync {
    /// Build or fetch the manifest a parent URI publishes.
    async fn manifest(&self, parent_uri: &str) -> Result<Manifest>;

    /// `itr(parentURI, chunkId) → latestOccupiedChunkId ≤ chunkId`.
    async fn itr(&self, parent_uri: &str, chunk_id: i64) -> Result<Option<i64>>;

    /// Up to `DEFAULT_CHUNK_SIZE` newest items with `createdAt ≤
    /// chunk-end`, descending (spec §4.4 "body loader"). The upper bound is
    /// the only bound: a sparse chunk's body may reach back past its own
    /// start to fill the page, which is why the merge engine dedups by
    /// `(href, timestamp)` rather than assuming chunk-disjoint results.
    async fn body(&self, parent_uri: &str, chunk_id: i64) -> Result<Vec<BodyItem>>;
}

/// Answers chunkline queries for parent URIs this node is authoritative
/// for, straight off a `RecordStore`.
pub struct LocalSource<S: RecordStore + ?Sized> {
    store: Arc<S>,
}

impl<S: RecordStore + ?Sized> LocalSource<S> {
    pub fn new(store: Arc<S>) -> Self {
        LocalSource { store }
    }

    fn child_prefix(parent_uri: &str) -> String {
        if parent_uri.ends_with('/') {
            parent_uri.to_string()
        } else {
            format!("{parent_uri}/")
        }
    }
}

#[async_trait]
impl<S: RecordStore + ?Sized> ChunklineSource for LocalSource<S> {
    async fn manifest(&self, parent_uri: &str) -> Result<Manifest> {
        let prefix = Self::child_prefix(parent_uri);
        let oldest = self
            .store
            .query(
                &prefix,
                QueryParams {
                    limit: 1,
                    order: QueryOrder::Asc,
                    ..Default::default()
                },
            )
            .await?;
        let first_chunk = oldest.first().map(|r| time_to_chunk(r.record.created_at));
        Ok(Manifest::new(
            first_chunk,
            format!("/chunkline/{{owner}}/{{id}}/{{chunk}}/itr"),
            format!("/chunkline/{{owner}}/{{id}}/{{chunk}}/body"),
        ))
    }

    async fn itr(&self, parent_uri: &str, chunk_id: i64) -> Result<Option<i64>> {
        let prefix = Self::child_prefix(parent_uri);
        let hit = self
            .store
            .query(
                &prefix,
                QueryParams {
                    until: Some(chunk_end(chunk_id)),
                    limit: 1,
                    order: QueryOrder::Desc,
                    ..Default::default()
                },
            )
            .await?;
        Ok(hit.first().map(|r| time_to_chunk(r.record.created_at)))
    }

    async fn body(&self, parent_uri: &str, chunk_id: i64) -> Result<Vec<BodyItem>> {
        let prefix = Self::child_prefix(parent_uri);
        let rows = self
            .store
            .query(
                &prefix,
                QueryParams {
                    until: Some(chunk_end(chunk_id)),
                    limit: DEFAULT_CHUNK_SIZE,
                    order: QueryOrder::Desc,
                    ..Default::default()
                },
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|resolved| {
                let record = resolved.record;
                if record.schema == REFERENCE_SCHEMA {
                    let href = record
                        .value
                        .get("href")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .or(resolved.uri)
                        .unwrap_or_default();
                    let content_type = record
                        .value
                        .get("contentType")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
                    BodyItem {
                        timestamp: record.created_at,
                        href,
                        content_type,
                    }
                } else {
                    BodyItem {
                        timestamp: record.created_at,
                        href: resolved.uri.unwrap_or(record.document_id),
                        content_type: DEFAULT_CONTENT_TYPE.to_string(),
                    }
                }
            })
            .collect())
    }
}

/// Answers chunkline queries for a parent URI owned by a peer node, by
/// dereferencing the endpoint templates that peer's `/.well-known/concrnt`
/// manifest advertised (spec §4.3 "Endpoint templating").
pub struct RemoteSource {
    client: Arc<FederationClient>,
    base_url: String,
}

impl RemoteSource {
    pub fn new(client: Arc<FederationClient>, base_url: impl Into<String>) -> Self {
        RemoteSource {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ChunklineSource for RemoteSource {
    async fn manifest(&self, parent_uri: &str) -> Result<Manifest> {
        let url = format!(
            "{}/resource/{}",
            self.base_url,
            concrnt_core::uri::encode_uri_placeholder(parent_uri)
        );
        self.client.get_json(&url).await.map_err(ConcrntError::from)
    }

    async fn itr(&self, parent_uri: &str, chunk_id: i64) -> Result<Option<i64>> {
        let (owner, key) = concrnt_core::uri::parse_cc_uri(parent_uri)
            .map_err(|e| ConcrntError::InvalidArgument(e.to_string()))?;
        let template = format!("{}/chunkline/{{ccid}}/{{key}}/{{chunk}}/itr", self.base_url);
        let url = expand_endpoint(&template, Some(&owner), Some(&key), None)
            .replacen("{chunk}", &chunk_id.to_string(), 1);
        let text = self.client.get_text(&url).await.map_err(ConcrntError::from)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ConcrntError::Upstream(format!("malformed itr response: {trimmed}")))
        }
    }

    async fn body(&self, parent_uri: &str, chunk_id: i64) -> Result<Vec<BodyItem>> {
        let (owner, key) = concrnt_core::uri::parse_cc_uri(parent_uri)
            .map_err(|e| ConcrntError::InvalidArgument(e.to_string()))?;
        let template = format!("{}/chunkline/{{ccid}}/{{key}}/{{chunk}}/body", self.base_url);
        let url = expand_endpoint(&template, Some(&owner), Some(&key), None)
            .replacen("{chunk}", &chunk_id.to_string(), 1);
        self.client.get_json(&url).await.map_err(ConcrntError::from)
    }
}
