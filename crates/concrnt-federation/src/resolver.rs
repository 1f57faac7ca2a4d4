//! Identifier resolution and endpoint templating (spec §4.3).
//!
//! `resolve` maps a CCID/CSID/DNS-name/empty identifier to the base URL of
//! the node authoritative for it, backed by two TTL caches. A CCID or CSID
//! can only be resolved with a `hint` — a candidate domain to ask, since
//! there is no global directory; once resolved, the mapping is cached.

use std::collections::HashMap;
use std::time::Duration;

use concrnt_core::uri::{classify_owner, encode_uri_placeholder, OwnerKind};
use serde::{Deserialize, Serialize};

use crate::client::FederationClient;
use crate::error::FederationError;
use crate::ttl_cache::TtlCache;

/// Default TTL for both caches (spec §4.3: 10 min).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// The `/.well-known/concrnt` descriptor (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellKnown {
    pub version: String,
    pub domain: String,
    pub csid: String,
    pub layer: String,
    pub endpoints: HashMap<String, String>,
}

/// An entity's self-description, as returned by `/resource/:uri` for a
/// CCID URI with an empty key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub ccid: String,
    pub domain: String,
    pub alias: Option<String>,
}

pub struct Resolver {
    client: FederationClient,
    default_base_url: String,
    entity_cache: TtlCache<String, EntityDescriptor>,
    well_known_cache: TtlCache<String, WellKnown>,
    csid_domain_cache: TtlCache<String, String>,
}

impl Resolver {
    pub fn new(default_base_url: impl Into<String>) -> Self {
        Self::with_ttl(default_base_url, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(default_base_url: impl Into<String>, ttl: Duration) -> Self {
        Resolver {
            client: FederationClient::new(),
            default_base_url: default_base_url.into(),
            entity_cache: TtlCache::new(ttl),
            well_known_cache: TtlCache::new(ttl),
            csid_domain_cache: TtlCache::new(ttl),
        }
    }

    /// Resolve an identifier to its authoritative base URL (spec §4.3).
    pub async fn resolve(&self, identifier: &str, hint: Option<&str>) -> Result<String, FederationError> {
        if identifier.is_empty() {
            return Ok(self.default_base_url.clone());
        }
        match classify_owner(identifier) {
            OwnerKind::Ccid | OwnerKind::Ckid => self.resolve_ccid(identifier, hint).await,
            OwnerKind::Csid => self.resolve_csid(identifier, hint).await,
            OwnerKind::Dns => self.resolve_dns(identifier).await,
        }
    }

    async fn resolve_dns(&self, domain: &str) -> Result<String, FederationError> {
        self.fetch_well_known(domain).await?;
        Ok(format!("https://{domain}"))
    }

    async fn resolve_ccid(&self, ccid: &str, hint: Option<&str>) -> Result<String, FederationError> {
        if let Some(entity) = self.entity_cache.get(&ccid.to_string()) {
            return Ok(format!("https://{}", entity.domain));
        }
        let hint = hint.ok_or_else(|| FederationError::NotFound(ccid.to_string()))?;
        let uri = concrnt_core::uri::compose_cc_uri(ccid, "");
        let url = format!("https://{hint}/resource/{}", encode_uri_placeholder(&uri));
        let entity: EntityDescriptor = self.client.get_json(&url).await?;
        let domain = entity.domain.clone();
        self.entity_cache.insert(ccid.to_string(), entity);
        Ok(format!("https://{domain}"))
    }

    async fn resolve_csid(&self, csid: &str, hint: Option<&str>) -> Result<String, FederationError> {
        if let Some(domain) = self.csid_domain_cache.get(&csid.to_string()) {
            return Ok(format!("https://{domain}"));
        }
        let hint = hint.ok_or_else(|| FederationError::NotFound(csid.to_string()))?;
        let wk = self.fetch_well_known(hint).await?;
        if wk.csid != csid {
            return Err(FederationError::NotFound(csid.to_string()));
        }
        self.csid_domain_cache.insert(csid.to_string(), wk.domain.clone());
        Ok(format!("https://{}", wk.domain))
    }

    async fn fetch_well_known(&self, domain: &str) -> Result<WellKnown, FederationError> {
        if let Some(wk) = self.well_known_cache.get(&domain.to_string()) {
            return Ok(wk);
        }
        let url = format!("https://{domain}/.well-known/concrnt");
        let wk: WellKnown = self.client.get_json(&url).await?;
        self.well_known_cache.insert(domain.to_string(), wk.clone());
        Ok(wk)
    }
}

/// Substitute `{ccid}`, `{key}`, `{uri}` into an endpoint template (spec
/// §4.3 "Endpoint templating"). `{uri}` is percent-encoded; the others are
/// substituted literally.
pub fn expand_endpoint(template: &str, ccid: Option<&str>, key: Option<&str>, uri: Option<&str>) -> String {
    let mut out = template.to_string();
    if let Some(c) = ccid {
        out = out.replace("{ccid}", c);
    }
    if let Some(k) = key {
        out = out.replace("{key}", k);
    }
    if let Some(u) = uri {
        out = out.replace("{uri}", &encode_uri_placeholder(u));
    }
    out
}
