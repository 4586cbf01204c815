//! Storage layer for flightsearch.
//!
//! This module provides `SQLite`-based storage for the read-only airport
//! lookup table and the mutable favorites table.

pub mod migrations;
pub mod schema;
pub mod seed;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::airport::{AirportMatch, AirportRecord, FavoriteRoute};
use crate::error::{Error, Result};

/// Storage engine for airports and favorite routes.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Substring search over airport codes and names, ranked by passengers
/// - Destination listing that excludes the selected origin
/// - Favorite routes with pair uniqueness
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// A fresh (or recreated) database is seeded from the bundled airports.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_seeded(path, seed::bundled_airports)
    }

    /// Open or create a storage database, seeding it from `dataset` if needed.
    ///
    /// `dataset` is only invoked when the airport table has to be populated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, schema initialization
    /// fails, or the dataset cannot be loaded.
    pub fn open_seeded<F>(path: impl AsRef<Path>, dataset: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Vec<AirportRecord>>,
    {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let storage = Self { path, conn };
        storage.prepare(dataset)?;

        info!("Database opened successfully at {}", storage.path.display());
        Ok(storage)
    }

    /// Create an in-memory storage instance seeded with the bundled airports.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(&seed::bundled_airports()?)
    }

    /// Create an in-memory storage instance seeded with `airports`.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory_with(airports: &[AirportRecord]) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        let storage = Self {
            path: PathBuf::from(":memory:"),
            conn,
        };
        storage.prepare(|| Ok(airports.to_vec()))?;
        Ok(storage)
    }

    fn prepare<F>(&self, dataset: F) -> Result<()>
    where
        F: FnOnce() -> Result<Vec<AirportRecord>>,
    {
        let outcome = migrations::initialize_schema(&self.conn)?;
        if outcome.needs_seed() || self.airport_count()? == 0 {
            let seeded = self.seed_airports(&dataset()?)?;
            info!("Seeded lookup table with {} airports", seeded);
        }
        Ok(())
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the contents of the airport table with `airports`.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn seed_airports(&self, airports: &[AirportRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM airport", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO airport (iata_code, name, passengers) VALUES (?1, ?2, ?3)",
            )?;
            for airport in airports {
                stmt.execute(params![airport.iata_code, airport.name, airport.passengers])?;
            }
        }
        tx.commit()?;
        Ok(airports.len())
    }

    /// Search airports whose code or name contains `query`.
    ///
    /// Matching is a case-insensitive substring match (ASCII only, as with
    /// `SQLite`'s `LIKE`). Results are ordered by descending passenger volume.
    /// An empty query matches every airport.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_airports(&self, query: &str) -> Result<Vec<AirportMatch>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn.prepare(
            r"
            SELECT iata_code, name FROM airport
            WHERE iata_code LIKE ?1 ESCAPE '\' OR name LIKE ?1 ESCAPE '\'
            ORDER BY passengers DESC, iata_code ASC
            ",
        )?;

        let airports = stmt
            .query_map([pattern], Self::row_to_match)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(airports)
    }

    /// List every airport except the one identified by `exclude_code` and
    /// `exclude_name`, ordered by descending passenger volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn destinations(&self, exclude_code: &str, exclude_name: &str) -> Result<Vec<AirportMatch>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT iata_code, name FROM airport
            WHERE NOT (iata_code = ?1 COLLATE NOCASE AND name = ?2 COLLATE NOCASE)
            ORDER BY passengers DESC, iata_code ASC
            ",
        )?;

        let airports = stmt
            .query_map(params![exclude_code, exclude_name], Self::row_to_match)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(airports)
    }

    /// Get an airport by its IATA code (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn airport(&self, iata_code: &str) -> Result<Option<AirportRecord>> {
        let result = self
            .conn
            .query_row(
                r"
                SELECT id, iata_code, name, passengers FROM airport
                WHERE iata_code = ?1 COLLATE NOCASE
                ORDER BY passengers DESC LIMIT 1
                ",
                [iata_code],
                |row| {
                    Ok(AirportRecord {
                        id: row.get(0)?,
                        iata_code: row.get(1)?,
                        name: row.get(2)?,
                        passengers: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Count airports in the lookup table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn airport_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM airport", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a favorite route.
    ///
    /// Returns `true` if a row was added, `false` if the route was already saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_favorite(&self, route: &FavoriteRoute) -> Result<bool> {
        let affected = self.conn.execute(
            r"
            INSERT OR IGNORE INTO favorite (departure_code, destination_code, created_at)
            VALUES (?1, ?2, ?3)
            ",
            params![
                route.departure_code,
                route.destination_code,
                Utc::now().to_rfc3339()
            ],
        )?;

        if affected == 0 {
            debug!("Favorite {} already saved", route);
        }
        Ok(affected > 0)
    }

    /// Delete a favorite route.
    ///
    /// Returns `true` if a route was deleted, `false` if it was not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_favorite(&self, route: &FavoriteRoute) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM favorite WHERE departure_code = ?1 AND destination_code = ?2",
            params![route.departure_code, route.destination_code],
        )?;
        Ok(affected > 0)
    }

    /// Delete every favorite route.
    ///
    /// Returns the number of routes deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_all_favorites(&self) -> Result<usize> {
        let affected = self.conn.execute("DELETE FROM favorite", [])?;
        if affected > 0 {
            info!("Cleared {} favorite routes", affected);
        }
        Ok(affected)
    }

    /// Get all favorite routes in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn favorites(&self) -> Result<Vec<FavoriteRoute>> {
        let mut stmt = self.conn.prepare(
            "SELECT departure_code, destination_code FROM favorite ORDER BY id ASC",
        )?;

        let routes = stmt
            .query_map([], |row| {
                Ok(FavoriteRoute {
                    departure_code: row.get(0)?,
                    destination_code: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(routes)
    }

    /// Count saved favorite routes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn favorite_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM favorite", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT created_at FROM favorite ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let newest_favorite = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            airport_count: self.airport_count()?,
            favorite_count: self.favorite_count()?,
            newest_favorite,
            db_size_bytes,
        })
    }

    fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<AirportMatch> {
        Ok(AirportMatch {
            iata_code: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

/// Build a `LIKE` pattern matching `query` anywhere, with wildcards escaped.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of airports in the lookup table.
    pub airport_count: i64,
    /// Number of saved favorite routes.
    pub favorite_count: i64,
    /// When the most recent favorite was saved.
    pub newest_favorite: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
