//! SurrealDB-backed `RecordStore`/`AssociationStore` implementation.
//!
//! `SurrealHandle` owns one connection and implements both storage traits
//! directly — C2 and C3 share tables and a transaction boundary, so
//! splitting them into separate handles would just mean passing the same
//! `Surreal<Any>` to two structs.

use async_trait::async_trait;
use chrono::Utc;
use concrnt_core::document::{Document, Proof, SignedDocument};
use concrnt_core::error::{ConcrntError, Result};
use concrnt_core::uri::{compose_cc_uri, parent_uri, parse_cc_uri, Cdid};
use serde::Deserialize;
use std::collections::BTreeMap;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, instrument, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::migrations::init_schema;
use crate::schema::{Association, CommitLog, CommitOwner, CreateRecordOutcome, Entity, Record, RecordKey, Server};
use crate::storage_traits::{AssociationStore, QueryOrder, QueryParams, RecordStore, ResolvedRecord};

/// Depth bound on the parent-chain walk (spec §9 "Cyclic graphs"): keys are
/// paths so the chain cannot cycle, but a bound still caps a pathologically
/// deep key.
const MAX_PARENT_DEPTH: usize = 64;

pub struct SurrealHandle {
    db: Surreal<Any>,
    /// Serialises the explicit-transaction write paths (spec §4.1: one
    /// serialisable transaction per commit; §5's row-lock / last-committer-
    /// wins ordering) over the single shared session.
    write_lock: tokio::sync::Mutex<()>,
}

impl SurrealHandle {
    /// Connect using a DSN (e.g. `mem://` for tests, a `ws://`/`http://`
    /// SurrealDB endpoint in production) and set up the schema.
    #[instrument(skip_all)]
    pub async fn connect(dsn: &str) -> Result<Self> {
        let db = surrealdb::engine::any::connect(dsn)
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        db.use_ns("concrnt")
            .use_db("node")
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        init_schema(&db)
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(SurrealHandle {
            db,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Open an explicit multi-statement transaction on this session. Must be
    /// paired with `commit_txn`/`cancel_txn`, and the caller must hold
    /// `write_lock` for the duration — SurrealDB's transaction bracket is
    /// per-session, not per-statement, so an interleaved statement from
    /// another task would otherwise land inside the wrong transaction.
    async fn begin_txn(&self) -> Result<()> {
        self.db
            .query("BEGIN TRANSACTION")
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn commit_txn(&self) -> Result<()> {
        self.db
            .query("COMMIT TRANSACTION")
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(())
    }

    /// Best-effort rollback: the transaction is already broken by whatever
    /// error triggered the cancel, so a failure here doesn't change what we
    /// report to the caller.
    async fn cancel_txn(&self) {
        if let Err(e) = self.db.query("CANCEL TRANSACTION").await {
            warn!(error = %e, "CANCEL TRANSACTION failed");
        }
    }

    async fn commit_log_exists(&self, id: &str) -> Result<bool> {
        let existing: Option<CommitLog> = self
            .db
            .select(("commit_logs", id))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(existing.is_some())
    }

    async fn insert_commit_log(&self, signed: &SignedDocument, document_id: &str) -> Result<()> {
        if self.commit_log_exists(document_id).await? {
            return Ok(());
        }
        let log = CommitLog {
            id: document_id.to_string(),
            raw_document: signed.document.clone(),
            proof_type: signed.proof.proof_type.clone(),
            proof_signature: signed.proof.signature.clone(),
            gc_candidate: false,
            created_at: Utc::now(),
        };
        let _created: Option<CommitLog> = self
            .db
            .create(("commit_logs", document_id))
            .content(log)
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn insert_commit_owners(&self, document_id: &str, owners: &[String]) -> Result<()> {
        for owner in owners {
            let key = format!("{document_id}:{owner}");
            let existing: Option<CommitOwner> = self
                .db
                .select(("commit_owners", key.as_str()))
                .await
                .map_err(|e| ConcrntError::Internal(e.to_string()))?;
            if existing.is_some() {
                continue;
            }
            let row = CommitOwner {
                commit_log_id: document_id.to_string(),
                owner: owner.clone(),
            };
            let _created: Option<CommitOwner> = self
                .db
                .create(("commit_owners", key.as_str()))
                .content(row)
                .await
                .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        }
        Ok(())
    }

    async fn insert_record(&self, document_id: &str, document: &Document) -> Result<()> {
        let existing: Option<Record> = self
            .db
            .select(("records", document_id))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        if existing.is_some() {
            return Ok(());
        }
        let record = Record {
            document_id: document_id.to_string(),
            owner: document.effective_owner().to_string(),
            schema: document.schema.clone(),
            value: document.value.clone(),
            created_at: document.created_at,
        };
        let _created: Option<Record> = self
            .db
            .create(("records", document_id))
            .content(record)
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(())
    }

    /// `record_keys`' id is always the deterministic `uuid_like(uri)`
    /// surrogate (every writer agrees on it without a prior lookup), so this
    /// is a direct point lookup rather than a `uri = $uri` scan.
    async fn get_record_key_by_uri(&self, uri: &str) -> Result<Option<RecordKey>> {
        self.db
            .select(("record_keys", uuid_like(uri).as_str()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))
    }

    /// Ensure every RecordKey from `uri`'s immediate parent up to (but
    /// excluding) the owner root exists, creating directory nodes with a
    /// null `record_id` as needed. Returns the id of `uri`'s direct parent,
    /// if any.
    ///
    /// Each node is an idempotent `UPSERT` keyed on its deterministic id, so
    /// two concurrent creators of the same directory node converge instead
    /// of one erroring on a unique-constraint conflict, and an existing
    /// node's `record_id` (if a record was committed directly at that path)
    /// is left untouched because the upsert never sets that field.
    async fn ensure_parent_chain(&self, uri: &str) -> Result<Option<String>> {
        let mut chain = Vec::new();
        let mut cursor = uri.to_string();
        for _ in 0..MAX_PARENT_DEPTH {
            match parent_uri(&cursor).map_err(|e| ConcrntError::InvalidArgument(e.to_string()))? {
                Some(parent) => {
                    chain.push(parent.clone());
                    cursor = parent;
                }
                None => break,
            }
        }
        // chain is root-most-last; walk it root-first so each node's parent
        // already exists when it is created.
        let mut parent_id: Option<String> = None;
        for parent_uri_str in chain.into_iter().rev() {
            let id = uuid_like(&parent_uri_str);
            self.db
                .query("UPSERT type::thing('record_keys', $id) SET id = $id, uri = $uri, parent_id = $parent_id")
                .bind(("id", id.clone()))
                .bind(("uri", parent_uri_str))
                .bind(("parent_id", parent_id.clone()))
                .await
                .map_err(|e| ConcrntError::Internal(e.to_string()))?;
            parent_id = Some(id);
        }
        Ok(parent_id)
    }

    /// Atomic upsert of the leaf RecordKey: a single `UPSERT ... RETURN
    /// BEFORE` statement replaces the old select-then-create/update pair, so
    /// two concurrent commits to the same new URI both converge on one row
    /// instead of the loser hitting a unique-constraint conflict. Returns
    /// the pointer's previous `record_id`, if any, so the caller can
    /// supersede it.
    async fn upsert_record_key(
        &self,
        uri: &str,
        parent_id: Option<String>,
        record_id: &str,
    ) -> Result<Option<String>> {
        let id = uuid_like(uri);
        let mut result = self
            .db
            .query(
                "UPSERT type::thing('record_keys', $id) \
                 SET id = $id, uri = $uri, parent_id = $parent_id, record_id = $record_id \
                 RETURN BEFORE",
            )
            .bind(("id", id))
            .bind(("uri", uri.to_string()))
            .bind(("parent_id", parent_id))
            .bind(("record_id", record_id.to_string()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        let before: Option<RecordKey> = result.take(0).map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(before.and_then(|rk| rk.record_id))
    }

    /// I2: flag the superseded CommitLog and delete its Record row.
    async fn supersede_record(&self, old_document_id: &str) -> Result<()> {
        let mut log: Option<CommitLog> = self
            .db
            .select(("commit_logs", old_document_id))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        if let Some(row) = log.as_mut() {
            row.gc_candidate = true;
            let _: Option<CommitLog> = self
                .db
                .update(("commit_logs", old_document_id))
                .content(row.clone())
                .await
                .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        }
        let _: Option<Record> = self
            .db
            .delete(("records", old_document_id))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(())
    }

    /// The transactional body of a record commit (spec §4.1): everything
    /// here runs inside the caller's `BEGIN`/`COMMIT` bracket. `memberOf`
    /// fan-out is deliberately excluded — those are separate commits, logged
    /// but not fatal on failure, applied only after this transaction lands.
    async fn create_record_primary(&self, signed: &SignedDocument) -> Result<CreateRecordOutcome> {
        let document: Document = signed.parse_document()?;
        let owner = document.effective_owner().to_string();
        let created_at_secs = document.created_at.timestamp().max(0) as u32;
        let document_id = Cdid::from_raw_document(signed.document.as_bytes(), created_at_secs).to_string();

        self.insert_commit_log(signed, &document_id).await?;
        self.insert_commit_owners(&document_id, &document.commit_owners()).await?;
        self.insert_record(&document_id, &document).await?;

        let mut uri = None;
        let mut superseded = None;

        if let Some(key) = &document.key {
            let substituted_key = key.replace("{cdid}", &document_id);
            let composed = compose_cc_uri(&owner, &substituted_key);
            let parent_id = self.ensure_parent_chain(&composed).await?;
            let old = self.upsert_record_key(&composed, parent_id, &document_id).await?;
            if let Some(old_id) = old {
                if old_id != document_id {
                    self.supersede_record(&old_id).await?;
                    superseded = Some(old_id);
                }
            }
            uri = Some(composed);
        }

        Ok(CreateRecordOutcome {
            document_id,
            uri,
            superseded_document_id: superseded,
        })
    }

    async fn synthesize_member_commit(
        &self,
        member_uri: &str,
        owner: &str,
        document_id: &str,
    ) -> Result<()> {
        let (_, parent_key) =
            parse_cc_uri(member_uri).map_err(|e| ConcrntError::InvalidArgument(e.to_string()))?;
        let child_key = format!("{parent_key}/{document_id}");
        let child = Document {
            key: Some(child_key),
            value: serde_json::json!({ "href": member_uri }),
            author: owner.to_string(),
            owner: Some(owner.to_string()),
            schema: "reference".to_string(),
            created_at: Utc::now(),
            member_of: None,
            associate: None,
            variant: None,
            policies: None,
        };
        let child_signed = SignedDocument {
            document: serde_json::to_string(&child)?,
            proof: Proof::document_reference(),
        };
        self.create_record(&child_signed).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SurrealHandle {
    #[instrument(skip(self, signed))]
    async fn create_record(&self, signed: &SignedDocument) -> Result<CreateRecordOutcome> {
        debug!("applying record commit");
        let document: Document = signed.parse_document()?;
        let owner = document.effective_owner().to_string();
        let members = document.member_of.clone();

        let outcome = {
            let _guard = self.write_lock.lock().await;
            self.begin_txn().await?;
            match self.create_record_primary(signed).await {
                Ok(outcome) => {
                    self.commit_txn().await?;
                    outcome
                }
                Err(e) => {
                    self.cancel_txn().await;
                    return Err(e);
                }
            }
        };

        if let Some(members) = members {
            for member_uri in &members {
                if let Err(e) = self
                    .synthesize_member_commit(member_uri, &owner, &outcome.document_id)
                    .await
                {
                    warn!(member_uri, error = %e, "memberOf fan-out commit failed, parent commit unaffected");
                }
            }
        }

        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn delete(&self, target_uri: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.begin_txn().await?;
        match self.delete_primary(target_uri).await {
            Ok(()) => {
                self.commit_txn().await?;
                Ok(())
            }
            Err(e) => {
                self.cancel_txn().await;
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn resolve(&self, uri_or_cdid: &str) -> Result<ResolvedRecord> {
        let (_, key) =
            parse_cc_uri(uri_or_cdid).map_err(|e| ConcrntError::InvalidArgument(e.to_string()))?;

        if !key.is_empty() {
            let by_id: Option<Record> = self
                .db
                .select(("records", key.as_str()))
                .await
                .map_err(|e| ConcrntError::Internal(e.to_string()))?;
            if let Some(record) = by_id {
                return Ok(ResolvedRecord { record, uri: None });
            }
        }

        let rk = self
            .get_record_key_by_uri(uri_or_cdid)
            .await?
            .ok_or_else(|| ConcrntError::NotFound(uri_or_cdid.to_string()))?;
        let record_id = rk
            .record_id
            .as_ref()
            .ok_or_else(|| ConcrntError::NotFound(uri_or_cdid.to_string()))?;
        let record: Option<Record> = self
            .db
            .select(("records", record_id.as_str()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        let record = record.ok_or_else(|| ConcrntError::NotFound(uri_or_cdid.to_string()))?;
        Ok(ResolvedRecord {
            record,
            uri: Some(rk.uri),
        })
    }

    /// Prefix-scan `record_keys`, then order the *records* by `created_at`
    /// (spec §4.1 "Query operation" / the chunkline body/itr loaders that
    /// reuse this method need newest-first, not URI-lexicographic order).
    /// `record_keys` carries no `created_at` of its own — it lives on the
    /// joined `Record` — so the scan fetches every prefix match unordered
    /// and sorts by the field that actually carries time, same as the
    /// in-memory fake.
    #[instrument(skip(self))]
    async fn query(&self, prefix: &str, params: QueryParams) -> Result<Vec<ResolvedRecord>> {
        let limit = params.limit.clamp(1, 100);
        let mut result = self
            .db
            .query("SELECT * FROM record_keys WHERE string::starts_with(uri, $prefix) AND record_id != NONE")
            .bind(("prefix", prefix.to_string()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        let keys: Vec<RecordKey> = result.take(0).map_err(|e| ConcrntError::Internal(e.to_string()))?;

        let mut out = Vec::with_capacity(keys.len());
        for rk in keys {
            let Some(record_id) = &rk.record_id else { continue };
            let record: Option<Record> = self
                .db
                .select(("records", record_id.as_str()))
                .await
                .map_err(|e| ConcrntError::Internal(e.to_string()))?;
            let Some(record) = record else { continue };
            if let Some(schema) = &params.schema {
                if &record.schema != schema {
                    continue;
                }
            }
            if let Some(since) = params.since {
                if record.created_at < since {
                    continue;
                }
            }
            if let Some(until) = params.until {
                if record.created_at > until {
                    continue;
                }
            }
            out.push(ResolvedRecord {
                record,
                uri: Some(rk.uri),
            });
        }

        out.sort_by_key(|r| r.record.created_at);
        if params.order == QueryOrder::Desc {
            out.reverse();
        }
        out.truncate(limit);
        Ok(out)
    }

    #[instrument(skip(self))]
    async fn list_gc_candidates(&self, limit: usize) -> Result<Vec<String>> {
        let limit = limit.clamp(1, 1000);
        let mut result = self
            .db
            .query("SELECT id FROM commit_logs WHERE gc_candidate = true LIMIT $limit")
            .bind(("limit", limit as i64))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;

        #[derive(Deserialize)]
        struct IdOnly {
            id: String,
        }
        let rows: Vec<IdOnly> = result.take(0).map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    #[instrument(skip(self, entity))]
    async fn register_entity(&self, entity: Entity) -> Result<Entity> {
        let created: Option<Entity> = self
            .db
            .update(("entities", entity.ccid.as_str()))
            .content(entity)
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        created.ok_or_else(|| ConcrntError::Internal("entity upsert returned nothing".to_string()))
    }

    async fn get_entity(&self, ccid: &str) -> Result<Option<Entity>> {
        self.db
            .select(("entities", ccid))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))
    }

    #[instrument(skip(self, server))]
    async fn refresh_server(&self, server: Server) -> Result<Server> {
        let created: Option<Server> = self
            .db
            .update(("servers", server.domain.as_str()))
            .content(server)
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        created.ok_or_else(|| ConcrntError::Internal("server upsert returned nothing".to_string()))
    }

    async fn get_server(&self, domain: &str) -> Result<Option<Server>> {
        self.db
            .select(("servers", domain))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))
    }
}

#[async_trait]
impl AssociationStore for SurrealHandle {
    #[instrument(skip(self, signed))]
    async fn create_association(&self, signed: &SignedDocument) -> Result<Association> {
        let _guard = self.write_lock.lock().await;
        self.begin_txn().await?;
        match self.create_association_primary(signed).await {
            Ok(association) => {
                self.commit_txn().await?;
                Ok(association)
            }
            Err(e) => {
                self.cancel_txn().await;
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        target_uri: &str,
        schema: Option<&str>,
        variant: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<Association>> {
        let target = self
            .get_record_key_by_uri(target_uri)
            .await?
            .ok_or_else(|| ConcrntError::NotFound(target_uri.to_string()))?;
        let mut result = self
            .db
            .query("SELECT * FROM associations WHERE target_id = $target_id ORDER BY created_at ASC")
            .bind(("target_id", target.id))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        let rows: Vec<Association> = result.take(0).map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(rows
            .into_iter()
            .filter(|a| schema.map_or(true, |s| a.schema == s))
            .filter(|a| variant.map_or(true, |v| a.variant.as_deref() == Some(v)))
            .filter(|a| author.map_or(true, |auth| a.owner == auth))
            .collect())
    }

    #[instrument(skip(self))]
    async fn counts_by_schema(&self, target_uri: &str) -> Result<BTreeMap<String, u64>> {
        let all = self.list(target_uri, None, None, None).await?;
        let mut counts = BTreeMap::new();
        for a in all {
            *counts.entry(a.schema).or_insert(0u64) += 1;
        }
        Ok(counts)
    }

    #[instrument(skip(self))]
    async fn counts_by_variant(&self, target_uri: &str, schema: &str) -> Result<Vec<(String, u64)>> {
        let all = self.list(target_uri, Some(schema), None, None).await?;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut first_seen: BTreeMap<String, chrono::DateTime<Utc>> = BTreeMap::new();
        for a in all {
            let variant = a.variant.clone().unwrap_or_default();
            *counts.entry(variant.clone()).or_insert(0) += 1;
            first_seen
                .entry(variant)
                .and_modify(|t| {
                    if a.created_at < *t {
                        *t = a.created_at;
                    }
                })
                .or_insert(a.created_at);
        }
        let mut ordered: Vec<(String, u64)> = counts.into_iter().collect();
        ordered.sort_by_key(|(variant, _)| first_seen.get(variant).copied().unwrap_or_else(Utc::now));
        Ok(ordered)
    }
}

impl SurrealHandle {
    async fn association_by_unique_hash(&self, unique_hash: &str) -> Result<Option<Association>> {
        let mut result = self
            .db
            .query("SELECT * FROM associations WHERE unique_hash = $h LIMIT 1")
            .bind(("h", unique_hash.to_string()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        let rows: Vec<Association> = result.take(0).map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    /// Transactional body of `create_association` (spec §4.1).
    async fn create_association_primary(&self, signed: &SignedDocument) -> Result<Association> {
        let document: Document = signed.parse_document()?;
        let owner = document.effective_owner().to_string();
        let target_uri = document
            .associate
            .clone()
            .ok_or_else(|| ConcrntError::InvalidArgument("document.associate is required".to_string()))?;
        let created_at_secs = document.created_at.timestamp().max(0) as u32;
        let document_id = Cdid::from_raw_document(signed.document.as_bytes(), created_at_secs).to_string();

        self.insert_commit_log(signed, &document_id).await?;
        self.insert_commit_owners(&document_id, &document.commit_owners()).await?;

        let target = self
            .get_record_key_by_uri(&target_uri)
            .await?
            .filter(|rk| rk.record_id.is_some())
            .ok_or_else(|| ConcrntError::TargetMissing(target_uri.clone()))?;

        let unique_hash = compute_unique_hash(&owner, &target_uri, document.variant.as_deref());

        let existing = self.association_by_unique_hash(&unique_hash).await?;
        if existing.is_some() {
            return Err(ConcrntError::DuplicateAssociation);
        }

        let association = Association {
            document_id: document_id.clone(),
            target_id: target.id,
            target_uri,
            owner,
            schema: document.schema.clone(),
            variant: document.variant.clone(),
            value: document.value.clone(),
            unique_hash,
            created_at: document.created_at,
        };
        let created: Option<Association> = self
            .db
            .create(("associations", document_id.as_str()))
            .content(association)
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        created.ok_or_else(|| ConcrntError::Internal("association insert returned nothing".to_string()))
    }

    /// Transactional body of `delete` (spec §4.1 "Delete operation"):
    /// removes the Record and CommitLog, cascades to the Associations that
    /// pointed at the deleted RecordKey, then nulls the pointer itself.
    async fn delete_primary(&self, target_uri: &str) -> Result<()> {
        let resolved = self.resolve(target_uri).await?;
        let _: Option<Record> = self
            .db
            .delete(("records", resolved.record.document_id.as_str()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        let _: Option<CommitLog> = self
            .db
            .delete(("commit_logs", resolved.record.document_id.as_str()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        if let Some(uri) = resolved.uri {
            if let Some(rk) = self.get_record_key_by_uri(&uri).await? {
                self.delete_associations_for_target(&rk.id).await?;
                let mut updated = rk.clone();
                updated.record_id = None;
                let _: Option<RecordKey> = self
                    .db
                    .update(("record_keys", rk.id.as_str()))
                    .content(updated)
                    .await
                    .map_err(|e| ConcrntError::Internal(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn delete_associations_for_target(&self, target_id: &str) -> Result<()> {
        self.db
            .query("DELETE FROM associations WHERE target_id = $target_id")
            .bind(("target_id", target_id.to_string()))
            .await
            .map_err(|e| ConcrntError::Internal(e.to_string()))?;
        Ok(())
    }
}

/// I4: `uniqueHash = xxh3(owner ∥ target.uri ∥ variant?)`.
fn compute_unique_hash(owner: &str, target_uri: &str, variant: Option<&str>) -> String {
    let mut buf = Vec::with_capacity(owner.len() + target_uri.len() + variant.map_or(0, str::len) + 2);
    buf.extend_from_slice(owner.as_bytes());
    buf.push(0);
    buf.extend_from_slice(target_uri.as_bytes());
    if let Some(v) = variant {
        buf.push(0);
        buf.extend_from_slice(v.as_bytes());
    }
    hex::encode(xxh3_64(&buf).to_be_bytes())
}

/// Deterministic surrogate id for a RecordKey row, derived from its URI so
/// concurrent creators of the same directory node converge on one id.
fn uuid_like(uri: &str) -> String {
    hex::encode(xxh3_64(uri.as_bytes()).to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concrnt_core::document::{Document, Proof};
    use serde_json::json;

    fn signed(key: Option<&str>, author: &str, value: serde_json::Value, schema: &str) -> SignedDocument {
        let doc = Document {
            key: key.map(str::to_string),
            value,
            author: author.to_string(),
            owner: None,
            schema: schema.to_string(),
            created_at: Utc::now(),
            member_of: None,
            associate: None,
            variant: None,
            policies: None,
        };
        SignedDocument {
            document: serde_json::to_string(&doc).unwrap(),
            proof: Proof::signed("test-sig"),
        }
    }

    async fn handle() -> SurrealHandle {
        SurrealHandle::connect("mem://").await.unwrap()
    }

    // P3: idempotent commit
    #[tokio::test]
    async fn duplicate_commit_is_idempotent() {
        let h = handle().await;
        let owner = "con".to_string() + &"a".repeat(39);
        let doc = signed(Some("hello"), &owner, json!({"msg": "hi"}), "https://example.com/note");
        let first = h.create_record(&doc).await.unwrap();
        let second = h.create_record(&doc).await.unwrap();
        assert_eq!(first.document_id, second.document_id);
    }

    // P4: pointer rewrite
    #[tokio::test]
    async fn overwrite_rewrites_pointer_and_flags_old_commit() {
        let h = handle().await;
        let owner = "con".to_string() + &"a".repeat(39);
        let first = signed(Some("hello"), &owner, json!({"msg": "v1"}), "https://example.com/note");
        let outcome1 = h.create_record(&first).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = signed(Some("hello"), &owner, json!({"msg": "v2"}), "https://example.com/note");
        let outcome2 = h.create_record(&second).await.unwrap();
        assert_ne!(outcome1.document_id, outcome2.document_id);

        let uri = outcome2.uri.clone().unwrap();
        let resolved = h.resolve(&uri).await.unwrap();
        assert_eq!(resolved.record.document_id, outcome2.document_id);

        let old: Option<Record> = h
            .db
            .select(("records", outcome1.document_id.as_str()))
            .await
            .unwrap();
        assert!(old.is_none());

        let old_log: Option<CommitLog> = h
            .db
            .select(("commit_logs", outcome1.document_id.as_str()))
            .await
            .unwrap();
        assert!(old_log.unwrap().gc_candidate);
    }

    // P5: parent chain
    #[tokio::test]
    async fn parent_chain_is_materialised() {
        let h = handle().await;
        let owner = "con".to_string() + &"a".repeat(39);
        let doc = signed(Some("a/b/c"), &owner, json!({}), "https://example.com/note");
        h.create_record(&doc).await.unwrap();

        let leaf = compose_cc_uri(&owner, "a/b/c");
        let mid = compose_cc_uri(&owner, "a/b");
        let root_child = compose_cc_uri(&owner, "a");

        let leaf_rk = h.get_record_key_by_uri(&leaf).await.unwrap().unwrap();
        let mid_rk = h.get_record_key_by_uri(&mid).await.unwrap().unwrap();
        let root_rk = h.get_record_key_by_uri(&root_child).await.unwrap().unwrap();

        assert!(leaf_rk.record_id.is_some());
        assert!(mid_rk.record_id.is_none());
        assert!(root_rk.record_id.is_none());
        assert_eq!(leaf_rk.parent_id.as_deref(), Some(mid_rk.id.as_str()));
        assert_eq!(mid_rk.parent_id.as_deref(), Some(root_rk.id.as_str()));
    }

    // P6: association uniqueness
    #[tokio::test]
    async fn duplicate_association_rejected() {
        let h = handle().await;
        let owner = "con".to_string() + &"a".repeat(39);
        let target = signed(Some("target"), &owner, json!({}), "https://example.com/note");
        h.create_record(&target).await.unwrap();
        let target_uri = compose_cc_uri(&owner, "target");

        let mut doc1 = Document {
            key: None,
            value: json!({}),
            author: owner.clone(),
            owner: None,
            schema: "https://example.com/like".to_string(),
            created_at: Utc::now(),
            member_of: None,
            associate: Some(target_uri.clone()),
            variant: Some("v1".to_string()),
            policies: None,
        };
        let a1 = SignedDocument {
            document: serde_json::to_string(&doc1).unwrap(),
            proof: Proof::signed("sig1"),
        };
        h.create_association(&a1).await.unwrap();

        doc1.created_at = Utc::now();
        let a2 = SignedDocument {
            document: serde_json::to_string(&doc1).unwrap(),
            proof: Proof::signed("sig2"),
        };
        let err = h.create_association(&a2).await.unwrap_err();
        assert!(matches!(err, ConcrntError::DuplicateAssociation));
    }

    #[tokio::test]
    async fn association_target_missing_is_typed_error() {
        let h = handle().await;
        let owner = "con".to_string() + &"a".repeat(39);
        let doc = Document {
            key: None,
            value: json!({}),
            author: owner.clone(),
            owner: None,
            schema: "https://example.com/like".to_string(),
            created_at: Utc::now(),
            member_of: None,
            associate: Some(compose_cc_uri(&owner, "nonexistent")),
            variant: None,
            policies: None,
        };
        let signed = SignedDocument {
            document: serde_json::to_string(&doc).unwrap(),
            proof: Proof::signed("sig"),
        };
        let err = h.create_association(&signed).await.unwrap_err();
        assert!(matches!(err, ConcrntError::TargetMissing(_)));
    }
}
