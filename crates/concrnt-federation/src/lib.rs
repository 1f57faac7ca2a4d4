//! concrnt-federation: identifier resolution and the outbound federation
//! client (component C5).
//!
//! A node only has direct authority over records whose owner resolves to
//! it; everything else means asking a peer. This crate is the half of the
//! workspace that knows how to ask: `resolver` maps an identifier to the
//! authoritative node's base URL behind two TTL caches, `client` is the
//! one shared HTTP client every outbound request goes through, and
//! `ttl_cache` is the small mutex-guarded cache both the resolver and the
//! chunkline engine's manifest cache build on.

pub mod client;
pub mod error;
pub mod resolver;
pub mod ttl_cache;

pub use client::FederationClient;
pub use error::FederationError;
pub use resolver::{expand_endpoint, EntityDescriptor, Resolver, WellKnown, DEFAULT_CACHE_TTL};
pub use ttl_cache::TtlCache;

/// concrnt-federation version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
