//! Database schema versioning for flightsearch.
//!
//! The airport table is a seeded snapshot, so there is no incremental
//! migration path: when the stored version differs from [`CURRENT_VERSION`],
//! every managed table is dropped and recreated. Favorites do not survive a
//! version change.

use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::schema::{CREATE_METADATA_TABLE, MANAGED_TABLES, SCHEMA_STATEMENTS};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// What [`initialize_schema`] had to do to bring the database up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// The schema was already at the current version.
    Current,
    /// A fresh database was created.
    Created,
    /// An incompatible schema was destroyed and recreated.
    Recreated {
        /// The version found on disk.
        from_version: i32,
    },
}

impl SchemaOutcome {
    /// Whether the tables are new and the lookup data must be (re)seeded.
    #[must_use]
    pub fn needs_seed(self) -> bool {
        !matches!(self, Self::Current)
    }
}

/// Initialize the database schema.
///
/// Only the metadata table is touched before the stored version is read, so
/// an incompatible older layout never meets the current DDL. If a different
/// schema version is found, or data tables exist without any version, all
/// managed tables are dropped and recreated.
///
/// # Errors
///
/// Returns an error if schema creation fails or the stored version is unreadable.
pub fn initialize_schema(conn: &Connection) -> Result<SchemaOutcome> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = get_schema_version(conn)?;
    let outcome = match version {
        v if v == CURRENT_VERSION => SchemaOutcome::Current,
        0 if !has_data_tables(conn)? => SchemaOutcome::Created,
        v => {
            warn!(
                "Schema version {} does not match {}, recreating database",
                v, CURRENT_VERSION
            );
            drop_tables(conn)?;
            SchemaOutcome::Recreated { from_version: v }
        }
    };

    create_tables(conn)?;
    if outcome != SchemaOutcome::Current {
        set_schema_version(conn, CURRENT_VERSION)?;
        info!("Initialized schema at version {}", CURRENT_VERSION);
    }
    Ok(outcome)
}

fn create_tables(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}

/// Whether any managed table other than `metadata` already exists.
fn has_data_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('airport', 'favorite')",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn drop_tables(conn: &Connection) -> Result<()> {
    for table in MANAGED_TABLES {
        conn.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
    }
    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}
