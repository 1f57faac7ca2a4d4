//! Shared application state: one instance per process, cloned cheaply
//! (every field is an `Arc` or a plain value) into every request handler
//! via axum's `State` extractor.

use std::collections::HashMap;
use std::sync::Arc;

use concrnt_chunkline::ChunklineEngine;
use concrnt_core::config::{NodeConfig, RegistrationMode};
use concrnt_federation::{FederationClient, Resolver};
use concrnt_signal::SignalBus;
use concrnt_store::{AssociationStore, RecordStore};
use concrnt_usecase::CommitUsecase;
use sha2::{Digest, Sha256};

/// Derive a node's CSID from its private key material (spec §6 "CLI": "the
/// node's CSID is derived from the private key at startup"). The exact KDF
/// is unspecified by the source drafts; this hashes the key material and
/// renders it in the same 42-char, prefix-plus-hex shape every other
/// identifier in this system uses, which is what `is_csid` actually checks.
pub fn derive_csid(private_key: &str) -> String {
    let digest = Sha256::digest(private_key.as_bytes());
    let hex = hex::encode(digest);
    format!("ccs{}", &hex[..39])
}

pub struct AppState {
    pub config: NodeConfig,
    pub csid: String,
    pub base_url: String,
    pub records: Arc<dyn RecordStore>,
    pub associations: Arc<dyn AssociationStore>,
    pub signals: SignalBus,
    pub resolver: Arc<Resolver>,
    pub federation_client: Arc<FederationClient>,
    pub chunkline: Arc<ChunklineEngine<dyn RecordStore>>,
    pub usecase: Arc<CommitUsecase>,
}

impl AppState {
    pub fn new(
        config: NodeConfig,
        records: Arc<dyn RecordStore>,
        associations: Arc<dyn AssociationStore>,
    ) -> Self {
        let csid = derive_csid(&config.private_key);
        let base_url = format!("https://{}", config.fqdn);
        let signals = SignalBus::new();
        let federation_client = Arc::new(FederationClient::new());
        let resolver = Arc::new(Resolver::new(base_url.clone()));

        let local_csid = csid.clone();
        let local_fqdn = config.fqdn.clone();
        let chunkline = Arc::new(ChunklineEngine::new(
            records.clone(),
            resolver.clone(),
            federation_client.clone(),
            move |owner: &str| owner == local_csid || owner == local_fqdn,
        ));

        let usecase = Arc::new(CommitUsecase::new(records.clone(), associations.clone(), signals.clone()));

        AppState {
            config,
            csid,
            base_url,
            records,
            associations,
            signals,
            resolver,
            federation_client,
            chunkline,
            usecase,
        }
    }

    /// The well-known descriptor this node advertises (spec §6 `GET
    /// /.well-known/concrnt`).
    pub fn well_known(&self) -> serde_json::Value {
        let mut endpoints = HashMap::new();
        endpoints.insert("commit".to_string(), "/commit".to_string());
        endpoints.insert("resource".to_string(), "/resource/{uri}".to_string());
        endpoints.insert("query".to_string(), "/query".to_string());
        endpoints.insert("chunkline_itr".to_string(), "/chunkline/{ccid}/{key}/{chunk}/itr".to_string());
        endpoints.insert("chunkline_body".to_string(), "/chunkline/{ccid}/{key}/{chunk}/body".to_string());
        endpoints.insert("register".to_string(), "/api/v1/register".to_string());
        endpoints.insert("timeline_recent".to_string(), "/api/v1/timeline/recent".to_string());
        endpoints.insert("associations".to_string(), "/associations".to_string());
        endpoints.insert("association_counts".to_string(), "/association-counts".to_string());
        endpoints.insert("realtime".to_string(), "/realtime".to_string());

        serde_json::json!({
            "version": "2.0",
            "domain": self.config.fqdn,
            "csid": self.csid,
            "layer": self.config.layer,
            "endpoints": endpoints,
        })
    }

    pub fn registration_mode(&self) -> RegistrationMode {
        self.config.registration_mode
    }

    /// Whether an owner identifier is this node's own CSID or FQDN (spec
    /// §6 `/resource/:uri`: a CSID owner addresses the node itself). CCID
    /// ownership is resolved through the `Entity` table instead, since it
    /// can move between nodes.
    pub fn is_local_owner(&self, owner: &str) -> bool {
        owner == self.csid || owner == self.config.fqdn
    }
}
