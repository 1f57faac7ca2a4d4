//! Storage trait definitions for the concrnt node (C2/C3).
//!
//! `RecordStore` owns the commit pipeline's create/delete/resolve/query
//! surface; `AssociationStore` is the thin wrapper spec §4.5 describes,
//! factored into its own trait because its uniqueness invariant (I4) and
//! its selective-index queries differ from a plain record lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concrnt_core::document::SignedDocument;
use concrnt_core::error::Result;
use std::collections::BTreeMap;

use crate::schema::{Association, CreateRecordOutcome, Entity, Record, Server};

/// Ordering for `RecordStore::query` (spec §6, `GET /query`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    #[default]
    Asc,
    Desc,
}

/// Filters for a prefix scan over `RecordKey.uri`.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub schema: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: usize,
    pub order: QueryOrder,
}

/// A record resolved from a URI or a content-addressed CDID lookup (spec
/// §4.1 "URI → record resolution policy").
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub record: Record,
    /// The RecordKey URI the record was resolved through, if any — a
    /// content-addressed CDID lookup may resolve a record with no live
    /// pointer.
    pub uri: Option<String>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Apply a signed document as a record commit (spec §4.1). Synthesises
    /// `memberOf` children; logs but does not fail the parent on a member
    /// failure.
    async fn create_record(&self, signed: &SignedDocument) -> Result<CreateRecordOutcome>;

    /// Delete the record and commit log a `delete`-schema document targets.
    /// Publishes no event (spec §4.1 "Delete operation").
    async fn delete(&self, target_uri: &str) -> Result<()>;

    /// Resolve a URI or CDID to its current record (spec §4.1 resolution
    /// policy: content-addressed lookup first, then RecordKey lookup).
    async fn resolve(&self, uri_or_cdid: &str) -> Result<ResolvedRecord>;

    /// Prefix-scan `RecordKey.uri`, ordered by the resolved record's
    /// `created_at` (not URI) per `params.order`, bounded by `params.limit`
    /// (max 100).
    async fn query(&self, prefix: &str, params: QueryParams) -> Result<Vec<ResolvedRecord>>;

    /// Page through CommitLogs flagged `gc_candidate = true`. No sweeper is
    /// implemented; this is the only GC-adjacent surface (spec §9 Non-goals).
    async fn list_gc_candidates(&self, limit: usize) -> Result<Vec<String>>;

    async fn register_entity(&self, entity: Entity) -> Result<Entity>;
    async fn get_entity(&self, ccid: &str) -> Result<Option<Entity>>;
    async fn refresh_server(&self, server: Server) -> Result<Server>;
    async fn get_server(&self, domain: &str) -> Result<Option<Server>>;
}

#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Apply a signed document whose `associate` field is set (spec §4.1
    /// "Create-association operation"). Fails with `TargetMissing` if the
    /// target URI does not resolve, or `DuplicateAssociation` on a
    /// `uniqueHash` collision (I4).
    async fn create_association(&self, signed: &SignedDocument) -> Result<Association>;

    /// List associations on a target, optionally narrowed by schema,
    /// variant, and author (spec §4.5).
    async fn list(
        &self,
        target_uri: &str,
        schema: Option<&str>,
        variant: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<Association>>;

    /// Per-schema counts on a target.
    async fn counts_by_schema(&self, target_uri: &str) -> Result<BTreeMap<String, u64>>;

    /// Per-variant counts within one schema, ordered by first-seen
    /// (earliest `created_at` among that variant's members).
    async fn counts_by_variant(
        &self,
        target_uri: &str,
        schema: &str,
    ) -> Result<Vec<(String, u64)>>;
}
