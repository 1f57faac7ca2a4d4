//! concrnt-store: the record store (C2) and association store (C3).
//!
//! Persists CommitLogs, Records, RecordKeys, and Associations over
//! SurrealDB, and exposes the same surface as an in-memory fake for tests
//! in crates that only need a `RecordStore`/`AssociationStore` to exist.
//!
//! - `schema`: row shapes (§3 entities).
//! - `migrations`: `DEFINE TABLE`/`DEFINE INDEX` setup.
//! - `storage_traits`: `RecordStore`/`AssociationStore` trait definitions.
//! - `handle`: the SurrealDB-backed implementation.
//! - `fakes`: an in-memory implementation for tests.
//!
//! Errors surface as `concrnt_core::ConcrntError` directly; this crate adds
//! no error type of its own.

mod fakes;
mod handle;
mod migrations;
mod schema;
mod storage_traits;

pub use fakes::MemoryStore;
pub use handle::SurrealHandle;
pub use schema::{Association, CommitLog, CommitOwner, CreateRecordOutcome, Entity, Record, RecordKey, Server};
pub use storage_traits::{AssociationStore, QueryOrder, QueryParams, RecordStore, ResolvedRecord};
