//! In-memory `RecordStore`/`AssociationStore` fake (testing only).
//!
//! Mirrors `SurrealHandle`'s semantics closely enough for the chunkline,
//! usecase, and concrntd test suites to depend on this crate without
//! spinning up SurrealDB.

use async_trait::async_trait;
use chrono::Utc;
use concrnt_core::document::{Document, Proof, SignedDocument};
use concrnt_core::error::{ConcrntError, Result};
use concrnt_core::uri::{compose_cc_uri, parent_uri, parse_cc_uri, Cdid};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use xxhash_rust::xxh3::xxh3_64;

use crate::schema::{Association, CommitLog, CreateRecordOutcome, Entity, Record, RecordKey, Server};
use crate::storage_traits::{AssociationStore, QueryOrder, QueryParams, RecordStore, ResolvedRecord};

#[derive(Default)]
struct State {
    commit_logs: HashMap<String, CommitLog>,
    records: HashMap<String, Record>,
    record_keys: HashMap<String, RecordKey>,
    record_keys_by_uri: HashMap<String, String>,
    associations: HashMap<String, Association>,
    associations_by_hash: HashMap<String, String>,
    entities: HashMap<String, Entity>,
    servers: HashMap<String, Server>,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            state: Mutex::new(State::default()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn synthesize_id(uri: &str) -> String {
        hex::encode(xxh3_64(uri.as_bytes()).to_be_bytes())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_record(&self, signed: &SignedDocument) -> Result<CreateRecordOutcome> {
        let document: Document = signed.parse_document()?;
        let owner = document.effective_owner().to_string();
        let created_at_secs = document.created_at.timestamp().max(0) as u32;
        let document_id = Cdid::from_raw_document(signed.document.as_bytes(), created_at_secs).to_string();

        let mut state = self.state.lock().unwrap();
        state.commit_logs.entry(document_id.clone()).or_insert_with(|| CommitLog {
            id: document_id.clone(),
            raw_document: signed.document.clone(),
            proof_type: signed.proof.proof_type.clone(),
            proof_signature: signed.proof.signature.clone(),
            gc_candidate: false,
            created_at: Utc::now(),
        });
        state.records.entry(document_id.clone()).or_insert_with(|| Record {
            document_id: document_id.clone(),
            owner: owner.clone(),
            schema: document.schema.clone(),
            value: document.value.clone(),
            created_at: document.created_at,
        });

        let mut uri = None;
        let mut superseded = None;

        if let Some(key) = &document.key {
            let substituted_key = key.replace("{cdid}", &document_id);
            let composed = compose_cc_uri(&owner, &substituted_key);

            let mut chain = Vec::new();
            let mut cursor = composed.clone();
            while let Some(parent) = parent_uri(&cursor)
                .map_err(|e| ConcrntError::InvalidArgument(e.to_string()))?
            {
                chain.push(parent.clone());
                cursor = parent;
            }
            let mut parent_id = None;
            for parent_uri_str in chain.into_iter().rev() {
                let id = state
                    .record_keys_by_uri
                    .get(&parent_uri_str)
                    .cloned()
                    .unwrap_or_else(|| Self::synthesize_id(&parent_uri_str));
                state.record_keys_by_uri.insert(parent_uri_str.clone(), id.clone());
                state.record_keys.entry(id.clone()).or_insert_with(|| RecordKey {
                    id: id.clone(),
                    uri: parent_uri_str,
                    parent_id: parent_id.clone(),
                    record_id: None,
                });
                parent_id = Some(id);
            }

            let id = state
                .record_keys_by_uri
                .get(&composed)
                .cloned()
                .unwrap_or_else(|| Self::synthesize_id(&composed));
            state.record_keys_by_uri.insert(composed.clone(), id.clone());
            let old_record_id = state.record_keys.get(&id).and_then(|rk| rk.record_id.clone());
            state.record_keys.insert(
                id.clone(),
                RecordKey {
                    id,
                    uri: composed.clone(),
                    parent_id,
                    record_id: Some(document_id.clone()),
                },
            );

            if let Some(old_id) = old_record_id {
                if old_id != document_id {
                    if let Some(log) = state.commit_logs.get_mut(&old_id) {
                        log.gc_candidate = true;
                    }
                    state.records.remove(&old_id);
                    superseded = Some(old_id);
                }
            }
            uri = Some(composed);
        }
        drop(state);

        if let Some(members) = &document.member_of {
            for member_uri in members {
                if let Err(e) = self.synthesize_member(member_uri, &owner, &document_id).await {
                    tracing::warn!(member_uri, error = %e, "memberOf fan-out commit failed");
                }
            }
        }

        Ok(CreateRecordOutcome {
            document_id,
            uri,
            superseded_document_id: superseded,
        })
    }

    async fn delete(&self, target_uri: &str) -> Result<()> {
        let resolved = self.resolve(target_uri).await?;
        let mut state = self.state.lock().unwrap();
        state.records.remove(&resolved.record.document_id);
        state.commit_logs.remove(&resolved.record.document_id);
        if let Some(uri) = resolved.uri {
            if let Some(id) = state.record_keys_by_uri.get(&uri).cloned() {
                if let Some(rk) = state.record_keys.get_mut(&id) {
                    rk.record_id = None;
                }
                let stale_hashes: Vec<String> = state
                    .associations
                    .values()
                    .filter(|a| a.target_id == id)
                    .map(|a| a.unique_hash.clone())
                    .collect();
                state.associations.retain(|_, a| a.target_id != id);
                for hash in stale_hashes {
                    state.associations_by_hash.remove(&hash);
                }
            }
        }
        Ok(())
    }

    async fn resolve(&self, uri_or_cdid: &str) -> Result<ResolvedRecord> {
        let (_, key) =
            parse_cc_uri(uri_or_cdid).map_err(|e| ConcrntError::InvalidArgument(e.to_string()))?;
        let state = self.state.lock().unwrap();

        if !key.is_empty() {
            if let Some(record) = state.records.get(&key) {
                return Ok(ResolvedRecord {
                    record: record.clone(),
                    uri: None,
                });
            }
        }

        let rk_id = state
            .record_keys_by_uri
            .get(uri_or_cdid)
            .ok_or_else(|| ConcrntError::NotFound(uri_or_cdid.to_string()))?;
        let rk = state.record_keys.get(rk_id).expect("indexed record key missing");
        let record_id = rk
            .record_id
            .as_ref()
            .ok_or_else(|| ConcrntError::NotFound(uri_or_cdid.to_string()))?;
        let record = state
            .records
            .get(record_id)
            .ok_or_else(|| ConcrntError::NotFound(uri_or_cdid.to_string()))?;
        Ok(ResolvedRecord {
            record: record.clone(),
            uri: Some(rk.uri.clone()),
        })
    }

    async fn query(&self, prefix: &str, params: QueryParams) -> Result<Vec<ResolvedRecord>> {
        let limit = params.limit.clamp(1, 100);
        let state = self.state.lock().unwrap();
        let mut matches: Vec<ResolvedRecord> = state
            .record_keys
            .values()
            .filter(|rk| rk.uri.starts_with(prefix))
            .filter_map(|rk| {
                let record_id = rk.record_id.as_ref()?;
                let record = state.records.get(record_id)?;
                if let Some(schema) = &params.schema {
                    if &record.schema != schema {
                        return None;
                    }
                }
                if let Some(since) = params.since {
                    if record.created_at < since {
                        return None;
                    }
                }
                if let Some(until) = params.until {
                    if record.created_at > until {
                        return None;
                    }
                }
                Some(ResolvedRecord {
                    record: record.clone(),
                    uri: Some(rk.uri.clone()),
                })
            })
            .collect();

        matches.sort_by_key(|r| r.record.created_at);
        if params.order == QueryOrder::Desc {
            matches.reverse();
        }
        matches.truncate(limit);
        Ok(matches)
    }

    async fn list_gc_candidates(&self, limit: usize) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .commit_logs
            .values()
            .filter(|log| log.gc_candidate)
            .take(limit.clamp(1, 1000))
            .map(|log| log.id.clone())
            .collect())
    }

    async fn register_entity(&self, entity: Entity) -> Result<Entity> {
        let mut state = self.state.lock().unwrap();
        state.entities.insert(entity.ccid.clone(), entity.clone());
        Ok(entity)
    }

    async fn get_entity(&self, ccid: &str) -> Result<Option<Entity>> {
        Ok(self.state.lock().unwrap().entities.get(ccid).cloned())
    }

    async fn refresh_server(&self, server: Server) -> Result<Server> {
        let mut state = self.state.lock().unwrap();
        state.servers.insert(server.domain.clone(), server.clone());
        Ok(server)
    }

    async fn get_server(&self, domain: &str) -> Result<Option<Server>> {
        Ok(self.state.lock().unwrap().servers.get(domain).cloned())
    }
}

impl MemoryStore {
    fn synthesize_member<'a>(
        &'a self,
        member_uri: &'a str,
        owner: &'a str,
        document_id: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
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
        })
    }
}

#[async_trait]
impl AssociationStore for MemoryStore {
    async fn create_association(&self, signed: &SignedDocument) -> Result<Association> {
        let document: Document = signed.parse_document()?;
        let owner = document.effective_owner().to_string();
        let target_uri = document
            .associate
            .clone()
            .ok_or_else(|| ConcrntError::InvalidArgument("document.associate is required".to_string()))?;
        let created_at_secs = document.created_at.timestamp().max(0) as u32;
        let document_id = Cdid::from_raw_document(signed.document.as_bytes(), created_at_secs).to_string();

        let unique_hash = compute_unique_hash(&owner, &target_uri, document.variant.as_deref());

        let mut state = self.state.lock().unwrap();
        let target_id = state
            .record_keys_by_uri
            .get(&target_uri)
            .filter(|id| {
                state
                    .record_keys
                    .get(*id)
                    .map(|rk| rk.record_id.is_some())
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| ConcrntError::TargetMissing(target_uri.clone()))?;

        if state.associations_by_hash.contains_key(&unique_hash) {
            return Err(ConcrntError::DuplicateAssociation);
        }

        state.commit_logs.entry(document_id.clone()).or_insert_with(|| CommitLog {
            id: document_id.clone(),
            raw_document: signed.document.clone(),
            proof_type: signed.proof.proof_type.clone(),
            proof_signature: signed.proof.signature.clone(),
            gc_candidate: false,
            created_at: Utc::now(),
        });

        let association = Association {
            document_id: document_id.clone(),
            target_id,
            target_uri,
            owner,
            schema: document.schema.clone(),
            variant: document.variant.clone(),
            value: document.value.clone(),
            unique_hash: unique_hash.clone(),
            created_at: document.created_at,
        };
        state.associations_by_hash.insert(unique_hash, document_id.clone());
        state.associations.insert(document_id, association.clone());
        Ok(association)
    }

    async fn list(
        &self,
        target_uri: &str,
        schema: Option<&str>,
        variant: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<Association>> {
        let state = self.state.lock().unwrap();
        let target_id = state
            .record_keys_by_uri
            .get(target_uri)
            .ok_or_else(|| ConcrntError::NotFound(target_uri.to_string()))?;
        let mut rows: Vec<Association> = state
            .associations
            .values()
            .filter(|a| &a.target_id == target_id)
            .filter(|a| schema.map_or(true, |s| a.schema == s))
            .filter(|a| variant.map_or(true, |v| a.variant.as_deref() == Some(v)))
            .filter(|a| author.map_or(true, |auth| a.owner == auth))
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.created_at);
        Ok(rows)
    }

    async fn counts_by_schema(&self, target_uri: &str) -> Result<BTreeMap<String, u64>> {
        let all = self.list(target_uri, None, None, None).await?;
        let mut counts = BTreeMap::new();
        for a in all {
            *counts.entry(a.schema).or_insert(0u64) += 1;
        }
        Ok(counts)
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use concrnt_core::document::Proof;
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

    #[tokio::test]
    async fn create_then_resolve_round_trips() {
        let store = MemoryStore::new();
        let owner = "con".to_string() + &"a".repeat(39);
        let doc = signed(Some("hello"), &owner, json!({"msg": "hi"}), "https://example.com/note");
        let outcome = store.create_record(&doc).await.unwrap();
        let uri = outcome.uri.unwrap();
        let resolved = store.resolve(&uri).await.unwrap();
        assert_eq!(resolved.record.value, json!({"msg": "hi"}));
    }

    #[tokio::test]
    async fn query_respects_limit_and_prefix() {
        let store = MemoryStore::new();
        let owner = "con".to_string() + &"a".repeat(39);
        for i in 0..5 {
            let doc = signed(Some(&format!("item-{i}")), &owner, json!({"i": i}), "https://example.com/note");
            store.create_record(&doc).await.unwrap();
        }
        let prefix = compose_cc_uri(&owner, "");
        let results = store
            .query(&prefix, QueryParams { limit: 3, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
    }
}
