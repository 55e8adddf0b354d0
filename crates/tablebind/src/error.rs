//! Error types for the binding library.

use thiserror::Error;

/// Main error type for schema binding operations.
#[derive(Error, Debug)]
pub enum BindError {
    /// Configuration error (invalid spec, malformed URL, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Same adapter id registered twice
    #[error("Adapter '{0}' is already registered")]
    DuplicateAdapter(String),

    /// Prospective model names already bound in the target namespace
    #[error("Model name collision in target namespace: {}", .names.join(", "))]
    NameCollision {
        /// The colliding model names, sorted.
        names: Vec<String>,
    },

    /// Single-key lookup invoked on a composite-key table
    #[error("Table {table} has a compound primary key - single-key lookup is not available")]
    CompoundPrimaryKeyLookup { table: String },

    /// Single-key lookup invoked on a table without a primary key
    #[error("Table {0} has no primary key")]
    NoPrimaryKey(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Native driver error, propagated unchanged
    #[cfg(feature = "postgres")]
    #[error("Driver error: {0}")]
    Driver(#[from] tokio_postgres::Error),

    /// IO error (config file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl BindError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        BindError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a NameCollision error from an unsorted name list.
    pub fn name_collision(mut names: Vec<String>) -> Self {
        names.sort();
        names.dedup();
        BindError::NameCollision { names }
    }
}

/// Result type alias for binding operations.
pub type Result<T> = std::result::Result<T, BindError>;
