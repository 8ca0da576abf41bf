//! SQLite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A TEXT column held a value outside its closed set, or bad JSON
    #[error("Corrupt {column} value: {value}")]
    Corrupt { column: &'static str, value: String },
}

impl SqliteError {
    pub fn corrupt(column: &'static str, value: impl Into<String>) -> Self {
        Self::Corrupt {
            column,
            value: value.into(),
        }
    }
}
