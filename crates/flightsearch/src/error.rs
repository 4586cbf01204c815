//! Error types for flightsearch.
//!
//! This module defines all error types used throughout the flightsearch crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightsearch operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The airport dataset used to seed the lookup table is unusable.
    #[error("invalid airport dataset: {message}")]
    Seed {
        /// Description of what went wrong.
        message: String,
    },

    /// No airport exists with the given IATA code.
    #[error("unknown airport code: {code}")]
    AirportNotFound {
        /// The code that was looked up.
        code: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Preferences Errors ===
    /// The preferences file could not be read or parsed.
    #[error("failed to read preferences at {path}: {message}")]
    PreferencesRead {
        /// Path to the preferences file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// The preferences file could not be written.
    #[error("failed to write preferences at {path}: {source}")]
    PreferencesWrite {
        /// Path to the preferences file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightsearch operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a seed dataset error.
    #[must_use]
    pub fn seed(message: impl Into<String>) -> Self {
        Self::Seed {
            message: message.into(),
        }
    }

    /// Create an airport-not-found error.
    #[must_use]
    pub fn airport_not_found(code: impl Into<String>) -> Self {
        Self::AirportNotFound { code: code.into() }
    }

    /// Check if this error means a looked-up airport does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AirportNotFound { .. })
    }

    /// Check if this error came from the settings store.
    ///
    /// Settings failures are recoverable: callers substitute the default value.
    #[must_use]
    pub fn is_preferences_error(&self) -> bool {
        matches!(
            self,
            Self::PreferencesRead { .. } | Self::PreferencesWrite { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::airport_not_found("XYZ");
        assert_eq!(err.to_string(), "unknown airport code: XYZ");

        let err = Error::seed("empty dataset");
        assert_eq!(err.to_string(), "invalid airport dataset: empty dataset");
    }

    #[test]
    fn test_error_is_not_found() {
        assert!(Error::airport_not_found("OPO").is_not_found());
        assert!(!Error::internal("test").is_not_found());
    }

    #[test]
    fn test_error_is_preferences_error() {
        let err = Error::PreferencesRead {
            path: PathBuf::from("/tmp/preferences.json"),
            message: "expected value".to_string(),
        };
        assert!(err.is_preferences_error());
        assert!(!Error::internal("x").is_preferences_error());
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_preferences_write_error_display() {
        let err = Error::PreferencesWrite {
            path: PathBuf::from("/readonly/preferences.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/readonly/preferences.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "debounce_ms must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("debounce_ms"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
