//! `SQLite` schema definitions for flightsearch.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the read-only airport lookup table.
pub const CREATE_AIRPORT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS airport (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    iata_code TEXT NOT NULL,
    name TEXT NOT NULL,
    passengers INTEGER NOT NULL
)
";

/// SQL statement to create an index on passengers for ranked queries.
pub const CREATE_PASSENGERS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_airport_passengers ON airport(passengers DESC)
";

/// SQL statement to create the favorites table.
///
/// The pair of codes is unique so that inserts can ignore duplicates.
pub const CREATE_FAVORITE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS favorite (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    departure_code TEXT NOT NULL,
    destination_code TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (departure_code, destination_code)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_AIRPORT_TABLE,
    CREATE_PASSENGERS_INDEX,
    CREATE_FAVORITE_TABLE,
    CREATE_METADATA_TABLE,
];

/// Tables dropped when the stored schema version does not match.
pub const MANAGED_TABLES: &[&str] = &["airport", "favorite", "metadata"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_airport_table_contains_required_columns() {
        assert!(CREATE_AIRPORT_TABLE.contains("id INTEGER PRIMARY KEY"));
        assert!(CREATE_AIRPORT_TABLE.contains("iata_code TEXT NOT NULL"));
        assert!(CREATE_AIRPORT_TABLE.contains("name TEXT NOT NULL"));
        assert!(CREATE_AIRPORT_TABLE.contains("passengers INTEGER NOT NULL"));
    }

    #[test]
    fn test_favorite_table_enforces_pair_uniqueness() {
        assert!(CREATE_FAVORITE_TABLE.contains("UNIQUE (departure_code, destination_code)"));
    }

    #[test]
    fn test_managed_tables_cover_schema() {
        for table in MANAGED_TABLES {
            assert!(SCHEMA_STATEMENTS
                .iter()
                .any(|stmt| stmt.contains(&format!("CREATE TABLE IF NOT EXISTS {table} "))));
        }
    }
}
