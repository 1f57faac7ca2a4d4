//! SurrealDB schema setup for the record and association stores (spec §6,
//! "Persisted state layout").

use surrealdb::engine::any::Any;
use surrealdb::Surreal;

/// Define every table this workspace persists into. Idempotent: `DEFINE
/// TABLE`/`DEFINE FIELD`/`DEFINE INDEX` are all no-ops on a schema that
/// already matches.
pub async fn init_schema(db: &Surreal<Any>) -> surrealdb::Result<()> {
    init_commit_logs_table(db).await?;
    init_commit_owners_table(db).await?;
    init_records_table(db).await?;
    init_record_keys_table(db).await?;
    init_associations_table(db).await?;
    init_entities_table(db).await?;
    init_servers_table(db).await?;
    Ok(())
}

/// Insert-only. `gc_candidate` is indexed so a bounded sweep query
/// (`list_gc_candidates`) can page through flagged rows without a table scan.
async fn init_commit_logs_table(db: &Surreal<Any>) -> surrealdb::Result<()> {
    db.query(
        r#"
        DEFINE TABLE commit_logs SCHEMAFULL;
        DEFINE FIELD id ON commit_logs TYPE string;
        DEFINE FIELD raw_document ON commit_logs TYPE string;
        DEFINE FIELD proof_type ON commit_logs TYPE string;
        DEFINE FIELD proof_signature ON commit_logs TYPE option<string>;
        DEFINE FIELD gc_candidate ON commit_logs TYPE bool DEFAULT false;
        DEFINE FIELD created_at ON commit_logs TYPE datetime;
        DEFINE INDEX idx_commit_logs_id ON commit_logs FIELDS id UNIQUE;
        DEFINE INDEX idx_commit_logs_gc ON commit_logs FIELDS gc_candidate;
        "#,
    )
    .await?;
    Ok(())
}

/// I5: one row per (commitLogId, owner) pair.
async fn init_commit_owners_table(db: &Surreal<Any>) -> surrealdb::Result<()> {
    db.query(
        r#"
        DEFINE TABLE commit_owners SCHEMAFULL;
        DEFINE FIELD commit_log_id ON commit_owners TYPE string;
        DEFINE FIELD owner ON commit_owners TYPE string;
        DEFINE INDEX idx_commit_owners_pair ON commit_owners FIELDS commit_log_id, owner UNIQUE;
        DEFINE INDEX idx_commit_owners_owner ON commit_owners FIELDS owner;
        "#,
    )
    .await?;
    Ok(())
}

/// I1: every row's `document_id` must equal a `commit_logs.id`. Enforced in
/// application code rather than a database-level foreign key, matching the
/// row-lock-driven transaction in 4.1 rather than relying on cascades the
/// embedded engine used in tests does not support.
async fn init_records_table(db: &Surreal<Any>) -> surrealdb::Result<()> {
    db.query(
        r#"
        DEFINE TABLE records SCHEMAFULL;
        DEFINE FIELD document_id ON records TYPE string;
        DEFINE FIELD owner ON records TYPE string;
        DEFINE FIELD schema ON records TYPE string;
        DEFINE FIELD value ON records FLEXIBLE TYPE object;
        DEFINE FIELD created_at ON records TYPE datetime;
        DEFINE INDEX idx_records_document_id ON records FIELDS document_id UNIQUE;
        DEFINE INDEX idx_records_owner_schema ON records FIELDS owner, schema;
        "#,
    )
    .await?;
    Ok(())
}

/// Unique index on `uri` backs the row-lock used to serialise concurrent
/// writes to the same pointer (§5 ordering guarantees).
async fn init_record_keys_table(db: &Surreal<Any>) -> surrealdb::Result<()> {
    db.query(
        r#"
        DEFINE TABLE record_keys SCHEMAFULL;
        DEFINE FIELD id ON record_keys TYPE string;
        DEFINE FIELD uri ON record_keys TYPE string;
        DEFINE FIELD parent_id ON record_keys TYPE option<string>;
        DEFINE FIELD record_id ON record_keys TYPE option<string>;
        DEFINE INDEX idx_record_keys_uri ON record_keys FIELDS uri UNIQUE;
        DEFINE INDEX idx_record_keys_parent ON record_keys FIELDS parent_id;
        "#,
    )
    .await?;
    Ok(())
}

/// I4: uniqueness on `unique_hash` is the sole constraint C3 adds over a
/// plain record.
async fn init_associations_table(db: &Surreal<Any>) -> surrealdb::Result<()> {
    db.query(
        r#"
        DEFINE TABLE associations SCHEMAFULL;
        DEFINE FIELD document_id ON associations TYPE string;
        DEFINE FIELD target_id ON associations TYPE string;
        DEFINE FIELD target_uri ON associations TYPE string;
        DEFINE FIELD owner ON associations TYPE string;
        DEFINE FIELD schema ON associations TYPE string;
        DEFINE FIELD variant ON associations TYPE option<string>;
        DEFINE FIELD value ON associations FLEXIBLE TYPE object;
        DEFINE FIELD unique_hash ON associations TYPE string;
        DEFINE FIELD created_at ON associations TYPE datetime;
        DEFINE INDEX idx_associations_document_id ON associations FIELDS document_id UNIQUE;
        DEFINE INDEX idx_associations_unique_hash ON associations FIELDS unique_hash UNIQUE;
        DEFINE INDEX idx_associations_target ON associations FIELDS target_id, schema, variant;
        "#,
    )
    .await?;
    Ok(())
}

async fn init_entities_table(db: &Surreal<Any>) -> surrealdb::Result<()> {
    db.query(
        r#"
        DEFINE TABLE entities SCHEMAFULL;
        DEFINE FIELD ccid ON entities TYPE string;
        DEFINE FIELD domain ON entities TYPE string;
        DEFINE FIELD alias ON entities TYPE option<string>;
        DEFINE FIELD affiliation_document ON entities TYPE string;
        DEFINE FIELD affiliation_signature ON entities TYPE string;
        DEFINE INDEX idx_entities_ccid ON entities FIELDS ccid UNIQUE;
        "#,
    )
    .await?;
    Ok(())
}

async fn init_servers_table(db: &Surreal<Any>) -> surrealdb::Result<()> {
    db.query(
        r#"
        DEFINE TABLE servers SCHEMAFULL;
        DEFINE FIELD domain ON servers TYPE string;
        DEFINE FIELD csid ON servers TYPE string;
        DEFINE FIELD layer ON servers TYPE string;
        DEFINE FIELD version ON servers TYPE string;
        DEFINE FIELD well_known_blob ON servers FLEXIBLE TYPE object;
        DEFINE INDEX idx_servers_domain ON servers FIELDS domain UNIQUE;
        "#,
    )
    .await?;
    Ok(())
}
