//! Unified error type for the data layer

use thiserror::Error;

/// Error returned by repository operations
///
/// Wraps the backend-specific error while keeping the backend name for logging.
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    /// A stored value could not be decoded into its domain type
    #[error("Corrupt {column} value: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unique constraint or state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend cannot serve requests right now
    #[error("Backend {backend} is not available: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },
}

impl DataError {
    pub fn migration_failed(backend: &'static str, version: i32, name: &str, error: &str) -> Self {
        Self::MigrationFailed {
            backend,
            version,
            name: name.to_string(),
            error: error.to_string(),
        }
    }

    pub fn backend_unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::BackendUnavailable { .. } => true,
            Self::Sqlite(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::MigrationFailed { backend, .. } => backend,
            Self::BackendUnavailable { backend, .. } => backend,
            Self::Corrupt { .. } | Self::Io(_) | Self::Conflict(_) => "unknown",
        }
    }
}

impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        use crate::data::sqlite::SqliteError;
        match e {
            SqliteError::Database(e) => Self::Sqlite(e),
            SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                backend: "sqlite",
                version,
                name,
                error,
            },
            SqliteError::Io(e) => Self::Io(e),
            SqliteError::Conflict(msg) => Self::Conflict(msg),
            SqliteError::Corrupt { column, value } => Self::Corrupt { column, value },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_error_display() {
        let err = DataError::migration_failed("sqlite", 2, "add_payment_columns", "syntax error");
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_payment_columns) failed on sqlite: syntax error"
        );
    }

    #[test]
    fn test_backend_method() {
        assert_eq!(
            DataError::migration_failed("sqlite", 1, "test", "error").backend(),
            "sqlite"
        );
        assert_eq!(DataError::Conflict("dup".into()).backend(), "unknown");
    }

    #[test]
    fn test_is_transient() {
        assert!(DataError::backend_unavailable("sqlite", "closed").is_transient());
        assert!(DataError::Sqlite(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!DataError::Sqlite(sqlx::Error::RowNotFound).is_transient());
        assert!(!DataError::Conflict("dup".into()).is_transient());
    }
}
