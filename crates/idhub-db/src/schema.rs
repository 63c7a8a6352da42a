//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints. Calendar dates (birth date, account expiry)
//! are ISO `YYYY-MM-DD` strings; instants are datetimes.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizational units
-- =======================================================================
DEFINE TABLE org_unit SCHEMAFULL;
DEFINE FIELD placecode ON TABLE org_unit TYPE string;
DEFINE FIELD name ON TABLE org_unit TYPE string;
DEFINE FIELD parent_id ON TABLE org_unit TYPE option<string>;
DEFINE FIELD created_at ON TABLE org_unit TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE org_unit TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_org_unit_placecode ON TABLE org_unit \
    COLUMNS placecode UNIQUE;

-- =======================================================================
-- Persons
-- =======================================================================
DEFINE TABLE person SCHEMAFULL;
DEFINE FIELD first_name ON TABLE person TYPE string;
DEFINE FIELD last_name ON TABLE person TYPE string;
DEFINE FIELD birth_date ON TABLE person TYPE option<string>;
DEFINE FIELD gender ON TABLE person TYPE string \
    ASSERT $value IN ['Female', 'Male', 'Unknown'];
DEFINE FIELD created_at ON TABLE person TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE person TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- External ids (per person, per source system)
-- =======================================================================
DEFINE TABLE external_id SCHEMAFULL;
DEFINE FIELD person_id ON TABLE external_id TYPE string;
DEFINE FIELD source ON TABLE external_id TYPE string \
    ASSERT $value IN ['HR', 'FS', 'MANUAL'];
DEFINE FIELD id_type ON TABLE external_id TYPE string \
    ASSERT $value IN ['EMPLOYEE_NO', 'NATIONAL_ID', 'PASSPORT_NO', \
    'SOURCE_PID'];
DEFINE FIELD value ON TABLE external_id TYPE string;
DEFINE FIELD created_at ON TABLE external_id TYPE datetime \
    DEFAULT time::now();
-- one value per (person, source, type)
DEFINE INDEX idx_extid_person_source_type ON TABLE external_id \
    COLUMNS person_id, source, id_type UNIQUE;
-- a (type, value) never belongs to two persons within a source
DEFINE INDEX idx_extid_source_type_value ON TABLE external_id \
    COLUMNS source, id_type, value UNIQUE;

-- =======================================================================
-- Affiliations (per person, per source system)
-- =======================================================================
DEFINE TABLE affiliation SCHEMAFULL;
DEFINE FIELD person_id ON TABLE affiliation TYPE string;
DEFINE FIELD source ON TABLE affiliation TYPE string \
    ASSERT $value IN ['HR', 'FS', 'MANUAL'];
DEFINE FIELD ou_id ON TABLE affiliation TYPE string;
DEFINE FIELD kind ON TABLE affiliation TYPE string \
    ASSERT $value IN ['EMPLOYEE', 'ASSOCIATE', 'STUDENT'];
DEFINE FIELD status ON TABLE affiliation TYPE string \
    ASSERT $value IN ['academic', 'tech_adm', 'emeritus', \
    'guest_researcher', 'external_partner', 'active_student'];
DEFINE FIELD precedence ON TABLE affiliation TYPE option<int>;
DEFINE FIELD created_at ON TABLE affiliation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_aff_unique ON TABLE affiliation \
    COLUMNS person_id, source, ou_id, kind, status UNIQUE;

-- =======================================================================
-- Contact info (per person, per source system)
-- =======================================================================
DEFINE TABLE contact_info SCHEMAFULL;
DEFINE FIELD person_id ON TABLE contact_info TYPE string;
DEFINE FIELD source ON TABLE contact_info TYPE string \
    ASSERT $value IN ['HR', 'FS', 'MANUAL'];
DEFINE FIELD contact_type ON TABLE contact_info TYPE string \
    ASSERT $value IN ['WORK_PHONE', 'PRIVATE_MOBILE', 'WORK_EMAIL'];
DEFINE FIELD preference ON TABLE contact_info TYPE int;
DEFINE FIELD value ON TABLE contact_info TYPE string;
DEFINE INDEX idx_contact_unique ON TABLE contact_info \
    COLUMNS person_id, source, contact_type, preference UNIQUE;

-- =======================================================================
-- Quarantines
-- =======================================================================
DEFINE TABLE quarantine SCHEMAFULL;
DEFINE FIELD person_id ON TABLE quarantine TYPE string;
DEFINE FIELD quarantine_type ON TABLE quarantine TYPE string \
    ASSERT $value IN ['auto_inactive', 'manual'];
DEFINE FIELD reason ON TABLE quarantine TYPE string;
DEFINE FIELD start_at ON TABLE quarantine TYPE datetime;
DEFINE FIELD end_at ON TABLE quarantine TYPE option<datetime>;
-- one quarantine per type per person
DEFINE INDEX idx_quarantine_unique ON TABLE quarantine \
    COLUMNS person_id, quarantine_type UNIQUE;

-- =======================================================================
-- Accounts
-- =======================================================================
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD owner_id ON TABLE account TYPE string;
DEFINE FIELD name ON TABLE account TYPE string;
DEFINE FIELD status ON TABLE account TYPE string \
    ASSERT $value IN ['Active', 'Expired', 'Quarantined'];
DEFINE FIELD password_hash ON TABLE account TYPE string;
DEFINE FIELD expire_date ON TABLE account TYPE option<string>;
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_name ON TABLE account COLUMNS name UNIQUE;
DEFINE INDEX idx_account_owner ON TABLE account COLUMNS owner_id;

-- =======================================================================
-- Groups and membership edges
-- =======================================================================
DEFINE TABLE group SCHEMAFULL;
DEFINE FIELD name ON TABLE group TYPE string;
DEFINE FIELD description ON TABLE group TYPE string;
DEFINE FIELD created_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_name ON TABLE group COLUMNS name UNIQUE;

-- Person -> Group membership
DEFINE TABLE member_of TYPE RELATION SCHEMAFULL;

-- =======================================================================
-- Audit log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD actor ON TABLE audit_log TYPE string;
DEFINE FIELD operation ON TABLE audit_log TYPE string;
DEFINE FIELD subject_id ON TABLE audit_log TYPE string;
DEFINE FIELD detail ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_subject ON TABLE audit_log \
    COLUMNS subject_id, timestamp;

-- =======================================================================
-- Task queue (not-before retry scheduling)
-- =======================================================================
DEFINE TABLE task_queue SCHEMAFULL;
DEFINE FIELD queue ON TABLE task_queue TYPE string;
DEFINE FIELD key ON TABLE task_queue TYPE string;
DEFINE FIELD iat ON TABLE task_queue TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD nbf ON TABLE task_queue TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD attempts ON TABLE task_queue TYPE int DEFAULT 0;
DEFINE FIELD reason ON TABLE task_queue TYPE option<string>;
DEFINE FIELD payload ON TABLE task_queue \
    TYPE option<object> FLEXIBLE;
DEFINE INDEX idx_task_queue_key ON TABLE task_queue \
    COLUMNS queue, key UNIQUE;
DEFINE INDEX idx_task_queue_nbf ON TABLE task_queue \
    COLUMNS queue, nbf;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
        }
    }

    Ok(())
}
