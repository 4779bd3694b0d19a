//! Store error handling
//!
//! A missing block is not an error at this layer; lookups return `Ok(None)`.
//! Everything here is a backend failure.

use std::path::PathBuf;

use thiserror::Error;

use super::dialect::Dialect;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create the directory holding the embedded database
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not connect to the backend
    #[error("Failed to open {dialect} store '{target}': {source}")]
    Connect {
        dialect: Dialect,
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Block table could not be created
    #[error("Failed to create block table in {dialect} store: {source}")]
    Schema {
        dialect: Dialect,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedded (SQLite) statement failed
    #[error("Embedded database error: {0}")]
    Embedded(#[from] rusqlite::Error),

    /// Distributed (Postgres protocol) statement failed
    #[error("Distributed database error: {0}")]
    Distributed(#[from] sqlx::Error),

    /// A previous statement panicked while holding the embedded connection
    #[error("Embedded connection is unusable: lock poisoned")]
    Poisoned,

    /// Blocking statement task was cancelled or panicked
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Stored size column holds a negative value
    #[error("Block '{root}' has invalid stored size {size}")]
    InvalidSize { root: String, size: i64 },
}

impl StoreError {
    pub(crate) fn connect<E>(dialect: Dialect, target: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Connect {
            dialect,
            target,
            source: Box::new(source),
        }
    }

    pub(crate) fn schema<E>(dialect: Dialect, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Schema {
            dialect,
            source: Box::new(source),
        }
    }

    /// Whether the store could not be opened at all, as opposed to a
    /// statement failing on an open store
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            StoreError::CreateDirectory { .. }
                | StoreError::Connect { .. }
                | StoreError::Schema { .. }
        )
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_connect_error_display() {
        let err = StoreError::connect(
            Dialect::Distributed,
            "postgres://***@db:5433/yugabyte".to_string(),
            io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        );

        let msg = err.to_string();
        assert!(msg.contains("distributed"));
        assert!(msg.contains("db:5433"));
        assert!(msg.contains("connection refused"));
        assert!(err.is_startup_failure());
    }

    #[test]
    fn test_operation_errors_are_not_startup_failures() {
        assert!(!StoreError::Poisoned.is_startup_failure());
        let err = StoreError::InvalidSize {
            root: "bafy1".to_string(),
            size: -1,
        };
        assert!(!err.is_startup_failure());
        assert!(err.to_string().contains("bafy1"));
    }
}
