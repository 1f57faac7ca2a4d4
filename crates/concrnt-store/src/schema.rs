//! Row shapes persisted by the record and association stores (spec §3).
//!
//! These mirror the entity table one-to-one; nothing here owns business
//! logic beyond simple constructors. `CommitLog` keeps the raw ingress bytes
//! verbatim — never re-derive them from a parsed `Document`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Insert-only log of every signed document a node has ever accepted.
/// `id` equals the CDID string. `gc_candidate` is the only mutable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitLog {
    pub id: String,
    pub raw_document: String,
    pub proof_type: String,
    pub proof_signature: Option<String>,
    #[serde(default)]
    pub gc_candidate: bool,
    pub created_at: DateTime<Utc>,
}

/// `{commitLogId, owner}` rows materialising I5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitOwner {
    pub commit_log_id: String,
    pub owner: String,
}

/// A materialised record: the mutable-state half of a commit.
/// `document_id` equals the originating `CommitLog.id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub document_id: String,
    pub owner: String,
    pub schema: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
}

/// The mutable URI → record pointer. `uri` is the only immutable,
/// uniquely-indexed field; `record_id` is rewritten on overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: String,
    pub uri: String,
    pub parent_id: Option<String>,
    pub record_id: Option<String>,
}

/// A document that associates itself with another record (I4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub document_id: String,
    pub target_id: String,
    pub target_uri: String,
    pub owner: String,
    pub schema: String,
    pub variant: Option<String>,
    pub value: Value,
    pub unique_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A registered CCID and the domain that currently claims to host it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub ccid: String,
    pub domain: String,
    pub alias: Option<String>,
    pub affiliation_document: String,
    pub affiliation_signature: String,
}

/// A peer node's self-description, refreshed from its well-known descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub domain: String,
    pub csid: String,
    pub layer: String,
    pub version: String,
    pub well_known_blob: Value,
}

/// Outcome of a create-record operation (spec §4.1), returned to the
/// commit usecase so it knows what to publish on the signal bus.
#[derive(Debug, Clone)]
pub struct CreateRecordOutcome {
    pub document_id: String,
    pub uri: Option<String>,
    pub superseded_document_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_log_defaults_gc_candidate_false() {
        let json = serde_json::json!({
            "id": "deadbeef",
            "raw_document": "{}",
            "proof_type": "signature",
            "proof_signature": "sig",
            "created_at": Utc::now(),
        });
        let log: CommitLog = serde_json::from_value(json).unwrap();
        assert!(!log.gc_candidate);
    }
}
