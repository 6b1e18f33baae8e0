//! Mock warehouse for testing
//!
//! [`MockWarehouse`] keeps an external catalog listing, a local inventory and
//! the log of executed statements in memory. It implements all three
//! collaborator traits, so a whole reconciliation run can be exercised
//! without credentials. It's useful for:
//! - Unit testing reconciliation and orphan handling
//! - Asserting which statements were submitted, and in what order
//! - Simulating unreachable catalogs and failing statements
//!
//! ## Usage
//!
//! ```rust,ignore
//! use icesync_catalog::{MockWarehouse, SqlExecutor};
//!
//! let warehouse = MockWarehouse::new();
//! warehouse.add_catalog_table("sales", "orders").await;
//! warehouse.add_local_table("LEGACY", "ARCHIVE").await;
//!
//! warehouse.run("DROP TABLE LEGACY.ARCHIVE").await?;
//! assert_eq!(warehouse.executed().await, vec!["DROP TABLE LEGACY.ARCHIVE"]);
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! let warehouse = MockWarehouse::new()
//!     .with_catalog_failure(ClientError::NetworkError("catalog down".into()));
//! warehouse.fail_statement_containing("ICEBERG TABLE SALES.ORDERS",
//!     ClientError::PermissionDenied("no".into())).await;
//! ```

use crate::adapter::{CatalogClient, ClientError, LocalInventory, SqlExecutor};
use icesync_core::{LocalTableRecord, Row, TableRecord};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct MockState {
    catalog: Vec<TableRecord>,
    local: Vec<LocalTableRecord>,
    executed: Vec<String>,
    statement_failures: Vec<(String, ClientError)>,
}

/// In-memory warehouse and catalog
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the other afterwards.
pub struct MockWarehouse {
    state: Arc<RwLock<MockState>>,

    /// Error returned by `CatalogClient::list_tables`
    catalog_failure: Option<ClientError>,

    /// Error returned by `LocalInventory::list_tables`
    inventory_failure: Option<ClientError>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    /// Name to return from name() methods
    warehouse_name: &'static str,
}

impl MockWarehouse {
    /// Create an empty mock warehouse
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            catalog_failure: None,
            inventory_failure: None,
            fail_connection: false,
            latency_ms: 0,
            warehouse_name: "Mock",
        }
    }

    /// Advertise a table in the external catalog
    pub async fn add_catalog_table(&self, namespace: &str, name: &str) {
        self.state.write().await.catalog.push(TableRecord::new(namespace, name));
    }

    /// Add a table to the local inventory
    pub async fn add_local_table(&self, schema: &str, name: &str) {
        self.state.write().await.local.push(LocalTableRecord::new(schema, name));
    }

    /// Make every statement containing `fragment` fail with `error`
    pub async fn fail_statement_containing(&self, fragment: &str, error: ClientError) {
        self.state
            .write()
            .await
            .statement_failures
            .push((fragment.to_string(), error));
    }

    /// Fail catalog listing with the given error
    pub fn with_catalog_failure(mut self, error: ClientError) -> Self {
        self.catalog_failure = Some(error);
        self
    }

    /// Fail local inventory listing with the given error
    pub fn with_inventory_failure(mut self, error: ClientError) -> Self {
        self.inventory_failure = Some(error);
        self
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure simulated latency for all operations
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom warehouse name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.warehouse_name = name;
        self
    }

    /// Statements successfully executed so far, in submission order
    pub async fn executed(&self) -> Vec<String> {
        self.state.read().await.executed.clone()
    }

    /// Number of statements successfully executed
    pub async fn execution_count(&self) -> usize {
        self.state.read().await.executed.len()
    }

    /// Current local inventory
    pub async fn local_tables(&self) -> Vec<LocalTableRecord> {
        self.state.read().await.local.clone()
    }

    /// Forget executed statements
    pub async fn clear_executed(&self) {
        self.state.write().await.executed.clear();
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockWarehouse {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            catalog_failure: self.catalog_failure.clone(),
            inventory_failure: self.inventory_failure.clone(),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            warehouse_name: self.warehouse_name,
        }
    }
}

/// Parse `DROP TABLE <schema>.<name>` into its two identifier parts
fn dropped_table(sql: &str) -> Option<(String, String)> {
    let rest = sql.trim().strip_prefix("DROP TABLE ")?;
    let (schema, name) = rest.trim().trim_end_matches(';').split_once('.')?;
    Some((schema.to_string(), name.to_string()))
}

fn status_row(message: String) -> Row {
    let mut row = Row::new();
    row.insert("status".to_string(), serde_json::Value::String(message));
    row
}

#[async_trait::async_trait]
impl CatalogClient for MockWarehouse {
    fn name(&self) -> &'static str {
        self.warehouse_name
    }

    async fn list_tables(&self) -> Result<Vec<TableRecord>, ClientError> {
        self.simulate_latency().await;

        if let Some(error) = &self.catalog_failure {
            return Err(error.clone());
        }
        Ok(self.state.read().await.catalog.clone())
    }
}

#[async_trait::async_trait]
impl LocalInventory for MockWarehouse {
    fn name(&self) -> &'static str {
        self.warehouse_name
    }

    async fn list_tables(&self) -> Result<Vec<LocalTableRecord>, ClientError> {
        self.simulate_latency().await;

        if let Some(error) = &self.inventory_failure {
            return Err(error.clone());
        }
        Ok(self.state.read().await.local.clone())
    }
}

#[async_trait::async_trait]
impl SqlExecutor for MockWarehouse {
    fn name(&self) -> &'static str {
        self.warehouse_name
    }

    async fn run(&self, sql: &str) -> Result<Vec<Row>, ClientError> {
        self.simulate_latency().await;

        let mut state = self.state.write().await;

        if let Some((_, error)) = state
            .statement_failures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
        {
            return Err(error.clone());
        }

        state.executed.push(sql.to_string());

        // Dropping removes the table from the inventory like the real thing
        if let Some((schema, name)) = dropped_table(sql) {
            state.local.retain(|t| {
                !(t.schema.eq_ignore_ascii_case(&schema) && t.name.eq_ignore_ascii_case(&name))
            });
            return Ok(vec![status_row(format!("{} successfully dropped.", name.to_uppercase()))]);
        }

        Ok(vec![status_row("Statement executed successfully.".to_string())])
    }

    async fn test_connection(&self) -> Result<(), ClientError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(ClientError::NetworkError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Builder for creating MockWarehouse with predefined tables
///
/// # Example
///
/// ```rust,ignore
/// let warehouse = MockWarehouseBuilder::new()
///     .with_catalog_table("sales", "orders")
///     .with_local_table("SALES", "ORDERS")
///     .with_local_table("LEGACY", "ARCHIVE")
///     .build();
/// ```
pub struct MockWarehouseBuilder {
    state: MockState,
    catalog_failure: Option<ClientError>,
    inventory_failure: Option<ClientError>,
    fail_connection: bool,
    latency_ms: u64,
    warehouse_name: &'static str,
}

impl MockWarehouseBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            state: MockState::default(),
            catalog_failure: None,
            inventory_failure: None,
            fail_connection: false,
            latency_ms: 0,
            warehouse_name: "Mock",
        }
    }

    /// Advertise a table in the external catalog
    pub fn with_catalog_table(mut self, namespace: &str, name: &str) -> Self {
        self.state.catalog.push(TableRecord::new(namespace, name));
        self
    }

    /// Add a table to the local inventory
    pub fn with_local_table(mut self, schema: &str, name: &str) -> Self {
        self.state.local.push(LocalTableRecord::new(schema, name));
        self
    }

    /// Fail every statement containing `fragment`
    pub fn with_statement_failure(mut self, fragment: &str, error: ClientError) -> Self {
        self.state.statement_failures.push((fragment.to_string(), error));
        self
    }

    /// Fail catalog listing
    pub fn with_catalog_failure(mut self, error: ClientError) -> Self {
        self.catalog_failure = Some(error);
        self
    }

    /// Fail local inventory listing
    pub fn with_inventory_failure(mut self, error: ClientError) -> Self {
        self.inventory_failure = Some(error);
        self
    }

    /// Configure connection failure
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set warehouse name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.warehouse_name = name;
        self
    }

    /// Build the MockWarehouse
    pub fn build(self) -> MockWarehouse {
        MockWarehouse {
            state: Arc::new(RwLock::new(self.state)),
            catalog_failure: self.catalog_failure,
            inventory_failure: self.inventory_failure,
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            warehouse_name: self.warehouse_name,
        }
    }
}

impl Default for MockWarehouseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
