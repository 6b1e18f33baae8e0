//! Collaborator traits for the external catalog and the target warehouse

use icesync_core::{LocalTableRecord, Row, TableRecord};

/// Errors raised by catalog and warehouse clients
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Malformed catalog record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Lists the tables advertised by the external catalog
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Get the client name (e.g., "Snowflake")
    fn name(&self) -> &'static str;

    /// Return the complete current inventory
    ///
    /// Paginated sources must be flattened before returning. An error must
    /// never be reported as an empty listing.
    async fn list_tables(&self) -> Result<Vec<TableRecord>, ClientError>;
}

/// Lists the tables that currently exist in the target database
#[async_trait::async_trait]
pub trait LocalInventory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return every table outside the excluded system schemas
    async fn list_tables(&self) -> Result<Vec<LocalTableRecord>, ClientError>;
}

/// Runs SQL statements against the target database
#[async_trait::async_trait]
pub trait SqlExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Execute one statement and return its result rows
    async fn run(&self, sql: &str) -> Result<Vec<Row>, ClientError>;

    /// Test the connection to the warehouse
    ///
    /// This is useful for validating credentials before a run mutates
    /// anything.
    async fn test_connection(&self) -> Result<(), ClientError>;
}
