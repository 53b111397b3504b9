//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration failure
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// A stored value does not decode into its domain type
    #[error("corrupt {column} value: {message}")]
    Decode {
        /// Column holding the bad value
        column: &'static str,
        /// What went wrong
        message: String,
    },
}

impl DbError {
    /// Build a decode error for `column`
    pub fn decode(column: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            column,
            message: err.to_string(),
        }
    }
}

/// Result type for repository calls
pub type DbResult<T> = Result<T, DbError>;
