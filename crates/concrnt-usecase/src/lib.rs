//! concrnt-usecase: the commit pipeline's dispatcher (component C7).
//!
//! `CommitUsecase::commit` is the one entry point every ingress path
//! (the `POST /commit` handler, a federation relay, a test harness)
//! funnels through. It performs no cryptographic verification itself —
//! that is the HTTP middleware's job, consulting an Auth collaborator
//! this crate never sees — and it is pure dispatch: parse the raw
//! document, read `schema`/`associate`, and route to exactly one of
//! create-record, create-association, or delete (spec §4.7, §9 "Dispatch
//! polymorphism": an explicit discriminator, not a trait-object
//! hierarchy).

pub mod error;

use std::sync::Arc;

use concrnt_core::document::{Document, Event, SignedDocument};
use concrnt_signal::SignalBus;
use concrnt_store::{Association, AssociationStore, CreateRecordOutcome, RecordStore};
use tracing::instrument;

pub use error::{CommitError, Result};

/// `schema` value that routes a commit to the delete path (spec §4.1
/// "Delete operation", §7 error taxonomy). Matches the original
/// implementation's `schemas.DeleteURL`.
pub const DELETE_SCHEMA_URL: &str = "https://schema.concrnt.net/delete.json";

/// What a dispatched commit did, returned to the HTTP adapter so it can
/// shape a `{"status":"ok"}` response without re-deriving it.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    Created {
        document_id: String,
        uri: Option<String>,
    },
    Associated {
        document_id: String,
        target_uri: String,
    },
    Deleted {
        target_uri: String,
    },
}

/// The commit pipeline's single entry point, holding the collaborators it
/// dispatches to (spec §2 data flow: C7 routes to C2/C3, then C4).
pub struct CommitUsecase {
    records: Arc<dyn RecordStore>,
    associations: Arc<dyn AssociationStore>,
    signals: SignalBus,
}

impl CommitUsecase {
    pub fn new(records: Arc<dyn RecordStore>, associations: Arc<dyn AssociationStore>, signals: SignalBus) -> Self {
        CommitUsecase {
            records,
            associations,
            signals,
        }
    }

    /// Dispatch a signed document per spec §4.7's three-way rule:
    /// `schema = delete URL → delete`, `associate present → associate`,
    /// otherwise `create`.
    #[instrument(skip(self, signed), fields(proof_type = %signed.proof.proof_type))]
    pub async fn commit(&self, signed: &SignedDocument) -> Result<CommitOutcome> {
        let document: Document = signed
            .parse_document()
            .map_err(|e| CommitError::InvalidDocument(e.to_string()))?;

        if document.schema == DELETE_SCHEMA_URL {
            self.delete(&document).await
        } else if document.associate.is_some() {
            self.associate(signed).await
        } else {
            self.create(signed).await
        }
    }

    async fn create(&self, signed: &SignedDocument) -> Result<CommitOutcome> {
        let CreateRecordOutcome { document_id, uri, .. } = self.records.create_record(signed).await?;

        if let Some(uri) = &uri {
            self.signals.publish(Event::Created {
                uri: uri.clone(),
                signed: signed.clone(),
            });
        }

        Ok(CommitOutcome::Created { document_id, uri })
    }

    async fn associate(&self, signed: &SignedDocument) -> Result<CommitOutcome> {
        let Association { document_id, target_uri, .. } = self.associations.create_association(signed).await?;

        self.signals.publish(Event::Associated {
            uri: target_uri.clone(),
            signed: signed.clone(),
        });

        Ok(CommitOutcome::Associated { document_id, target_uri })
    }

    /// Spec §4.1 "Delete operation": publishes no event.
    async fn delete(&self, document: &Document) -> Result<CommitOutcome> {
        let target_uri = document
            .value
            .as_str()
            .ok_or_else(|| CommitError::InvalidDocument("delete commit value must be a URI string".to_string()))?
            .to_string();
        self.records.delete(&target_uri).await?;
        Ok(CommitOutcome::Deleted { target_uri })
    }
}

/// concrnt-usecase version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use concrnt_core::document::Proof;
    use concrnt_core::uri::compose_cc_uri;
    use concrnt_store::MemoryStore;
    use serde_json::json;

    fn owner() -> String {
        "con".to_string() + &"a".repeat(39)
    }

    fn signed(doc: &Document) -> SignedDocument {
        SignedDocument {
            document: serde_json::to_string(doc).unwrap(),
            proof: Proof::signed("sig"),
        }
    }

    fn note(owner: &str, key: &str, value: serde_json::Value) -> Document {
        Document {
            key: Some(key.to_string()),
            value,
            author: owner.to_string(),
            owner: None,
            schema: "https://example.com/note".to_string(),
            created_at: chrono::Utc::now(),
            member_of: None,
            associate: None,
            variant: None,
            policies: None,
        }
    }

    fn usecase() -> (CommitUsecase, SignalBus) {
        let store = Arc::new(MemoryStore::new());
        let signals = SignalBus::new();
        let usecase = CommitUsecase::new(store.clone(), store, signals.clone());
        (usecase, signals)
    }

    #[tokio::test]
    async fn create_dispatch_publishes_created_event() {
        let (usecase, signals) = usecase();
        let owner = owner();
        let mut sub = signals.subscribe();
        sub.set_prefixes(vec![compose_cc_uri(&owner, "")]);

        let doc = note(&owner, "hello", json!({"msg": "hi"}));
        let outcome = usecase.commit(&signed(&doc)).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Created { uri: Some(_), .. }));

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(&*event, Event::Created { .. }));
    }

    #[tokio::test]
    async fn associate_dispatch_requires_existing_target() {
        let (usecase, _signals) = usecase();
        let owner = owner();

        let mut assoc_doc = note(&owner, "ignored", json!({}));
        assoc_doc.key = None;
        assoc_doc.associate = Some(compose_cc_uri(&owner, "missing"));
        let err = usecase.commit(&signed(&assoc_doc)).await.unwrap_err();
        assert!(matches!(err, CommitError::Domain(concrnt_core::error::ConcrntError::TargetMissing(_))));
    }

    #[tokio::test]
    async fn associate_dispatch_succeeds_against_existing_target_and_publishes() {
        let (usecase, signals) = usecase();
        let owner = owner();

        let record_doc = note(&owner, "target", json!({"msg": "hi"}));
        let created = usecase.commit(&signed(&record_doc)).await.unwrap();
        let target_uri = match created {
            CommitOutcome::Created { uri: Some(uri), .. } => uri,
            _ => panic!("expected created record with uri"),
        };

        let mut sub = signals.subscribe();
        sub.set_prefixes(vec![target_uri.clone()]);

        let mut assoc_doc = note(&owner, "assoc", json!({"reaction": "+1"}));
        assoc_doc.key = None;
        assoc_doc.associate = Some(target_uri.clone());
        let outcome = usecase.commit(&signed(&assoc_doc)).await.unwrap();
        assert!(matches!(outcome, CommitOutcome::Associated { .. }));

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.uri(), target_uri);
    }

    #[tokio::test]
    async fn delete_dispatch_removes_record_and_publishes_nothing() {
        let (usecase, signals) = usecase();
        let owner = owner();

        let record_doc = note(&owner, "to-delete", json!({"msg": "bye"}));
        let created = usecase.commit(&signed(&record_doc)).await.unwrap();
        let target_uri = match created {
            CommitOutcome::Created { uri: Some(uri), .. } => uri,
            _ => panic!("expected created record with uri"),
        };

        let mut sub = signals.subscribe();
        sub.set_prefixes(vec![target_uri.clone()]);

        let mut delete_doc = note(&owner, "delete-cmd", json!(target_uri));
        delete_doc.key = None;
        delete_doc.schema = DELETE_SCHEMA_URL.to_string();
        usecase.commit(&signed(&delete_doc)).await.unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await;
        assert!(result.is_err(), "delete must not publish an event");
    }

    #[tokio::test]
    async fn invalid_json_document_is_invalid_document_error() {
        let (usecase, _signals) = usecase();
        let bad = SignedDocument {
            document: "not json".to_string(),
            proof: Proof::signed("sig"),
        };
        let err = usecase.commit(&bad).await.unwrap_err();
        assert!(matches!(err, CommitError::InvalidDocument(_)));
    }
}
