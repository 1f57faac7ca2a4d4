//! concrnt-core: shared domain types for the concrnt node workspace.
//!
//! This crate has no I/O of its own. It defines:
//!
//! - `uri`: identifier classification and `cc://` URI codec (component C1).
//! - `document`: the wire shapes (`Document`, `SignedDocument`, `Event`)
//!   every other crate exchanges.
//! - `error`: the domain error taxonomy HTTP adapters match on.
//! - `config`: node configuration loaded from YAML.
//! - `telemetry`: tracing subscriber initialisation shared by binaries.

pub mod config;
pub mod document;
pub mod error;
pub mod telemetry;
pub mod uri;

pub use config::{ConfigError, NodeConfig, RegistrationMode};
pub use document::{Document, Event, Proof, SignedDocument};
pub use error::{ConcrntError, Result};
pub use telemetry::init_tracing;
pub use uri::{
    classify_owner, compose_cc_uri, encode_uri_placeholder, is_ccid, is_ckid, is_csid,
    parent_uri, parse_cc_uri, Cdid, OwnerKind, UriError,
};

/// concrnt-core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
