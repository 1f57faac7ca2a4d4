//! Wire types shared by the commit pipeline, the store, and the signal bus.
//!
//! `CommitLog` stores the exact ingress bytes of a `SignedDocument`; nothing
//! in this module re-serialises a `Document` before hashing it — doing so
//! would change the content hash the CDID is derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A proof attached to a signed document: either a real cryptographic
/// signature or a `document-reference` marker used for commits synthesised
/// from a parent's `memberOf` fan-out (spec §4.1.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub signature: Option<String>,
}

impl Proof {
    pub fn signed(signature: impl Into<String>) -> Self {
        Proof {
            proof_type: "signature".to_string(),
            signature: Some(signature.into()),
        }
    }

    pub fn document_reference() -> Self {
        Proof {
            proof_type: "document-reference".to_string(),
            signature: None,
        }
    }
}

/// The envelope a client submits to `POST /commit`: raw document bytes plus
/// a proof. `raw_document` is kept verbatim — it is what gets hashed and
/// what gets stored in `CommitLog.rawDocument`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedDocument {
    /// The exact bytes of the document as submitted, UTF-8 JSON text.
    pub document: String,
    pub proof: Proof,
}

impl SignedDocument {
    /// Parse the inner `document` string as a `Document<Value>`.
    pub fn parse_document(&self) -> serde_json::Result<Document> {
        serde_json::from_str(&self.document)
    }
}

/// A parsed commit document. `value` is left as an untyped JSON value —
/// schemas are opaque URLs this core does not interpret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub key: Option<String>,
    pub value: Value,
    pub author: String,
    pub owner: Option<String>,
    pub schema: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "memberOf", default)]
    pub member_of: Option<Vec<String>>,
    pub associate: Option<String>,
    pub variant: Option<String>,
    #[serde(default)]
    pub policies: Option<Value>,
}

impl Document {
    /// The effective owner per spec §4.1.1: `owner ?? author`.
    pub fn effective_owner(&self) -> &str {
        self.owner.as_deref().unwrap_or(&self.author)
    }

    /// `CommitOwner` rows to materialise per invariant I5:
    /// `{author} ∪ ({owner} if present and non-empty)`.
    pub fn commit_owners(&self) -> Vec<String> {
        let mut owners = vec![self.author.clone()];
        if let Some(owner) = &self.owner {
            if !owner.is_empty() && owner != &self.author {
                owners.push(owner.clone());
            }
        }
        owners
    }
}

/// Realtime/peer event shape (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Created {
        uri: String,
        signed: SignedDocument,
    },
    Associated {
        uri: String,
        signed: SignedDocument,
    },
}

impl Event {
    /// The URI an event is published under: the channel name on the
    /// signal bus, and the prefix realtime subscribers match against.
    pub fn uri(&self) -> &str {
        match self {
            Event::Created { uri, .. } => uri,
            Event::Associated { uri, .. } => uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(author: &str, owner: Option<&str>) -> Document {
        Document {
            key: Some("hello".into()),
            value: json!({"msg": "hi"}),
            author: author.to_string(),
            owner: owner.map(str::to_string),
            schema: "https://example.com/schemas/note".into(),
            created_at: Utc::now(),
            member_of: None,
            associate: None,
            variant: None,
            policies: None,
        }
    }

    #[test]
    fn effective_owner_falls_back_to_author() {
        let d = doc("author-a", None);
        assert_eq!(d.effective_owner(), "author-a");
        let d2 = doc("author-a", Some("owner-b"));
        assert_eq!(d2.effective_owner(), "owner-b");
    }

    // I5: CommitOwner rows enumerate {author} ∪ ({owner} if present/non-empty)
    #[test]
    fn commit_owners_dedupes_and_skips_empty_owner() {
        assert_eq!(doc("a", None).commit_owners(), vec!["a".to_string()]);
        assert_eq!(
            doc("a", Some("b")).commit_owners(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(doc("a", Some("")).commit_owners(), vec!["a".to_string()]);
        assert_eq!(doc("a", Some("a")).commit_owners(), vec!["a".to_string()]);
    }

    #[test]
    fn event_uri_matches_variant_field() {
        let signed = SignedDocument {
            document: "{}".into(),
            proof: Proof::signed("sig"),
        };
        let e = Event::Created {
            uri: "cc://a/b".into(),
            signed,
        };
        assert_eq!(e.uri(), "cc://a/b");
    }
}
