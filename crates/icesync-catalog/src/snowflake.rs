//! Snowflake adapter for catalog-linked Iceberg tables
//!
//! One [`SnowflakeWarehouse`] plays all three collaborator roles:
//! - [`CatalogClient`] via `SYSTEM$LIST_ICEBERG_TABLES_FROM_CATALOG`
//! - [`LocalInventory`] via `INFORMATION_SCHEMA.TABLES` of the current database
//! - [`SqlExecutor`] for the DDL produced by the engine
//!
//! It requires:
//! - USAGE on the catalog integration and the external volume
//! - CREATE SCHEMA on the database, CREATE ICEBERG TABLE on its schemas
//! - OWNERSHIP of orphan tables when dropping is enabled
//!
//! ## Usage
//!
//! ```rust,ignore
//! let warehouse = SnowflakeWarehouse::builder()
//!     .with_password("xy12345.us-east-1", "loader", "password")
//!     .with_warehouse("COMPUTE_WH")
//!     .with_database("LAKE")
//!     .with_catalog_integration("fivetran_catalog")
//!     .build()?;
//! ```
//!
//! Reference: https://docs.snowflake.com/en/sql-reference/functions/system_list_iceberg_tables_from_catalog

use crate::adapter::{CatalogClient, ClientError, LocalInventory, SqlExecutor};
use icesync_core::{LocalTableRecord, Row, SyncConfig, TableRecord, DEFAULT_EXCLUDED_SCHEMAS};
use serde::Deserialize;

#[cfg(feature = "snowflake")]
use snowflake_api::SnowflakeApi;

#[cfg(feature = "snowflake")]
use arrow_array::cast::AsArray;

#[cfg(feature = "snowflake")]
use arrow_array::types::{
    Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};

#[cfg(feature = "snowflake")]
use arrow_array::Array;

/// Column alias carrying the catalog listing JSON
const TABLE_LIST_COLUMN: &str = "TABLE_LIST";

/// Snowflake authentication credentials
#[derive(Clone)]
pub enum SnowflakeCredentials {
    /// Password-based authentication
    Password(String),
    /// Key-pair authentication (PEM format private key)
    PrivateKey(String),
}

/// Builder for SnowflakeWarehouse
pub struct SnowflakeWarehouseBuilder {
    account: String,
    username: String,
    credentials: SnowflakeCredentials,
    warehouse: Option<String>,
    role: Option<String>,
    database: Option<String>,
    catalog_integration: String,
    excluded_schemas: Vec<String>,
}

impl SnowflakeWarehouseBuilder {
    /// Create new builder with password authentication
    pub fn with_password(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_credentials(account, username, SnowflakeCredentials::Password(password.into()))
    }

    /// Create new builder with key-pair authentication
    pub fn with_key_pair(
        account: impl Into<String>,
        username: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        Self::with_credentials(account, username, SnowflakeCredentials::PrivateKey(private_key_pem.into()))
    }

    fn with_credentials(
        account: impl Into<String>,
        username: impl Into<String>,
        credentials: SnowflakeCredentials,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            credentials,
            warehouse: None,
            role: None,
            database: None,
            catalog_integration: String::new(),
            excluded_schemas: DEFAULT_EXCLUDED_SCHEMAS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set the warehouse to use
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Set the role to use
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the target database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the catalog integration to list tables from
    pub fn with_catalog_integration(mut self, integration: impl Into<String>) -> Self {
        self.catalog_integration = integration.into();
        self
    }

    /// Replace the schemas excluded from the local inventory
    pub fn with_excluded_schemas(mut self, schemas: Vec<String>) -> Self {
        self.excluded_schemas = schemas;
        self
    }

    /// Take catalog integration and schema exclusions from a sync config
    pub fn with_sync_config(self, config: &SyncConfig) -> Self {
        self.with_catalog_integration(config.catalog_integration.clone())
            .with_excluded_schemas(config.excluded_schemas.clone())
    }

    /// Build the warehouse client
    #[cfg(feature = "snowflake")]
    pub fn build(self) -> Result<SnowflakeWarehouse, ClientError> {
        if self.catalog_integration.is_empty() {
            return Err(ClientError::ConfigError(
                "Snowflake warehouse requires a catalog integration".to_string(),
            ));
        }

        let api = match &self.credentials {
            SnowflakeCredentials::Password(password) => {
                SnowflakeApi::with_password_auth(
                    &self.account,
                    self.warehouse.as_deref(),
                    self.database.as_deref(),
                    None, // schema
                    &self.username,
                    self.role.as_deref(),
                    password,
                )
                .map_err(|e| ClientError::AuthenticationError(format!(
                    "Failed to authenticate with Snowflake: {}",
                    e
                )))?
            }
            SnowflakeCredentials::PrivateKey(private_key_pem) => {
                SnowflakeApi::with_certificate_auth(
                    &self.account,
                    self.warehouse.as_deref(),
                    self.database.as_deref(),
                    None, // schema
                    &self.username,
                    self.role.as_deref(),
                    private_key_pem,
                )
                .map_err(|e| ClientError::AuthenticationError(format!(
                    "Failed to authenticate with key-pair: {}",
                    e
                )))?
            }
        };

        Ok(SnowflakeWarehouse {
            api,
            account: self.account,
            catalog_integration: self.catalog_integration,
            excluded_schemas: self.excluded_schemas,
        })
    }

    /// Build without snowflake feature
    #[cfg(not(feature = "snowflake"))]
    pub fn build(self) -> Result<SnowflakeWarehouse, ClientError> {
        Err(ClientError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }
}

/// Snowflake warehouse client
pub struct SnowflakeWarehouse {
    #[cfg(feature = "snowflake")]
    api: SnowflakeApi,

    account: String,
    catalog_integration: String,
    excluded_schemas: Vec<String>,
}

impl SnowflakeWarehouse {
    /// Builder pattern entry point
    pub fn builder() -> SnowflakeWarehouseBuilderInit {
        SnowflakeWarehouseBuilderInit
    }

    /// Account identifier this client is connected to
    pub fn account(&self) -> &str {
        &self.account
    }

    #[cfg(feature = "snowflake")]
    async fn exec_rows(&self, sql: &str) -> Result<Vec<Row>, ClientError> {
        use snowflake_api::QueryResult;

        tracing::debug!(account = %self.account, "executing statement");

        let result = self.api.exec(sql)
            .await
            .map_err(|e| classify_error(e.to_string()))?;

        match result {
            QueryResult::Arrow(batches) => {
                let mut rows = Vec::new();
                for batch in batches {
                    let schema = batch.schema();
                    for row_idx in 0..batch.num_rows() {
                        let mut row = Row::new();
                        for (col_idx, field) in schema.fields().iter().enumerate() {
                            row.insert(
                                field.name().clone(),
                                arrow_value(batch.column(col_idx), row_idx),
                            );
                        }
                        rows.push(row);
                    }
                }
                Ok(rows)
            }
            QueryResult::Json(json) => json_rows(&json),
            QueryResult::Empty => Ok(Vec::new()),
        }
    }
}

/// Empty struct for builder pattern initialization
pub struct SnowflakeWarehouseBuilderInit;

impl SnowflakeWarehouseBuilderInit {
    pub fn with_password(
        self,
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SnowflakeWarehouseBuilder {
        SnowflakeWarehouseBuilder::with_password(account, username, password)
    }

    pub fn with_key_pair(
        self,
        account: impl Into<String>,
        username: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> SnowflakeWarehouseBuilder {
        SnowflakeWarehouseBuilder::with_key_pair(account, username, private_key_pem)
    }
}

/// Query returning the catalog integration's table listing as JSON
pub fn catalog_listing_query(catalog_integration: &str) -> String {
    format!(
        "SELECT SYSTEM$LIST_ICEBERG_TABLES_FROM_CATALOG('{}', '', 0) AS {}",
        catalog_integration.replace('\'', "''"),
        TABLE_LIST_COLUMN
    )
}

/// Query listing the current database's tables outside excluded schemas
pub fn inventory_query(excluded_schemas: &[String]) -> String {
    let mut query = String::from(
        "SELECT TABLE_SCHEMA, TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_CATALOG = CURRENT_DATABASE()",
    );

    if !excluded_schemas.is_empty() {
        let list = excluded_schemas
            .iter()
            .map(|s| format!("'{}'", s.to_uppercase().replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        query.push_str(&format!(" AND UPPER(TABLE_SCHEMA) NOT IN ({})", list));
    }

    query.push_str(" ORDER BY TABLE_SCHEMA, TABLE_NAME");
    query
}

#[derive(Deserialize)]
struct CatalogEntry {
    namespace: Option<String>,
    name: Option<String>,
}

/// Parse one `TABLE_LIST` cell into table records
///
/// Entries missing `namespace` or `name` are rejected rather than skipped:
/// a silently dropped entry would make its local table look orphaned.
/// `offset` is added to reported indexes when a listing spans several rows.
pub fn parse_catalog_listing(json: &str, offset: usize) -> Result<Vec<TableRecord>, ClientError> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(json)
        .map_err(|e| ClientError::InvalidResponse(format!("Catalog listing is not a JSON table list: {}", e)))?;

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let index = offset + i;
            let namespace = non_empty(entry.namespace).ok_or_else(|| ClientError::MalformedRecord {
                index,
                reason: "missing namespace".to_string(),
            })?;
            let name = non_empty(entry.name).ok_or_else(|| ClientError::MalformedRecord {
                index,
                reason: format!("missing name in namespace '{}'", namespace),
            })?;
            Ok(TableRecord::new(namespace, name))
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Look up a column by name, ignoring case
fn column<'a>(row: &'a Row, name: &str) -> Option<&'a serde_json::Value> {
    row.iter()
        .find(|(column, _)| column.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Flatten the rows returned by [`catalog_listing_query`]
pub fn catalog_records_from_rows(rows: &[Row]) -> Result<Vec<TableRecord>, ClientError> {
    let mut records = Vec::new();
    for row in rows {
        let cell = column(row, TABLE_LIST_COLUMN)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ClientError::InvalidResponse(format!("Missing {} column", TABLE_LIST_COLUMN)))?;
        let parsed = parse_catalog_listing(cell, records.len())?;
        records.extend(parsed);
    }
    Ok(records)
}

/// Convert the rows returned by [`inventory_query`]
pub fn local_records_from_rows(rows: &[Row]) -> Result<Vec<LocalTableRecord>, ClientError> {
    rows.iter()
        .map(|row| {
            let schema = column(row, "TABLE_SCHEMA")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ClientError::InvalidResponse("Missing TABLE_SCHEMA column".to_string()))?;
            let name = column(row, "TABLE_NAME")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ClientError::InvalidResponse("Missing TABLE_NAME column".to_string()))?;
            Ok(LocalTableRecord::new(schema, name))
        })
        .collect()
}

/// Map a Snowflake error message onto a client error kind
pub fn classify_error(message: String) -> ClientError {
    if message.contains("Insufficient privileges") || message.contains("Permission") {
        ClientError::PermissionDenied(message)
    } else if message.contains("Incorrect username or password") || message.contains("JWT token is invalid") {
        ClientError::AuthenticationError(message)
    } else if message.contains("timed out") || message.contains("connection") {
        ClientError::NetworkError(message)
    } else {
        ClientError::QueryError(message)
    }
}

#[cfg(feature = "snowflake")]
fn arrow_value(column: &arrow_array::ArrayRef, row_idx: usize) -> serde_json::Value {
    use serde_json::Value;

    if column.is_null(row_idx) {
        return Value::Null;
    }
    if let Some(arr) = column.as_string_opt::<i32>() {
        return Value::String(arr.value(row_idx).to_string());
    }
    if let Some(arr) = column.as_string_opt::<i64>() {
        return Value::String(arr.value(row_idx).to_string());
    }
    if let Some(arr) = column.as_primitive_opt::<Int64Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<Int32Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<Int16Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<Int8Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<UInt64Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<UInt32Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<UInt16Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<UInt8Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<Float64Type>() {
        return Value::from(arr.value(row_idx));
    }
    if let Some(arr) = column.as_primitive_opt::<Float32Type>() {
        return Value::from(f64::from(arr.value(row_idx)));
    }
    // NUMBER(p, s): integral values become JSON numbers, scaled ones keep their exact text
    if let Some(arr) = column.as_primitive_opt::<Decimal128Type>() {
        let text = arr.value_as_string(row_idx);
        return match text.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(text),
        };
    }
    if let Some(arr) = column.as_boolean_opt() {
        return Value::Bool(arr.value(row_idx));
    }
    Value::String(format!("<{}>", column.data_type()))
}

#[cfg(feature = "snowflake")]
fn json_rows(json: &snowflake_api::JsonResult) -> Result<Vec<Row>, ClientError> {
    let names: Vec<&str> = json.schema.iter().map(|f| f.name.as_str()).collect();
    let rows = json.value.as_array()
        .ok_or_else(|| ClientError::InvalidResponse("JSON result is not an array".to_string()))?;

    rows.iter()
        .map(|row| {
            let cells = row.as_array()
                .ok_or_else(|| ClientError::InvalidResponse("JSON result row is not an array".to_string()))?;
            Ok(names
                .iter()
                .zip(cells)
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect())
        })
        .collect()
}

#[async_trait::async_trait]
impl CatalogClient for SnowflakeWarehouse {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn list_tables(&self) -> Result<Vec<TableRecord>, ClientError> {
        let rows = self.exec_rows(&catalog_listing_query(&self.catalog_integration)).await?;
        let records = catalog_records_from_rows(&rows)?;
        tracing::debug!(
            integration = %self.catalog_integration,
            tables = records.len(),
            "listed external catalog"
        );
        Ok(records)
    }

    #[cfg(not(feature = "snowflake"))]
    async fn list_tables(&self) -> Result<Vec<TableRecord>, ClientError> {
        Err(ClientError::ConfigError(format!(
            "Snowflake support not compiled, cannot list '{}'. Rebuild with: cargo build --features snowflake",
            self.catalog_integration
        )))
    }
}

#[async_trait::async_trait]
impl LocalInventory for SnowflakeWarehouse {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn list_tables(&self) -> Result<Vec<LocalTableRecord>, ClientError> {
        let rows = self.exec_rows(&inventory_query(&self.excluded_schemas)).await?;
        local_records_from_rows(&rows)
    }

    #[cfg(not(feature = "snowflake"))]
    async fn list_tables(&self) -> Result<Vec<LocalTableRecord>, ClientError> {
        Err(ClientError::ConfigError(format!(
            "Snowflake support not compiled, cannot run: {}",
            inventory_query(&self.excluded_schemas)
        )))
    }
}

#[async_trait::async_trait]
impl SqlExecutor for SnowflakeWarehouse {
    fn name(&self) -> &'static str {
        "Snowflake"
    }

    #[cfg(feature = "snowflake")]
    async fn run(&self, sql: &str) -> Result<Vec<Row>, ClientError> {
        self.exec_rows(sql).await
    }

    #[cfg(not(feature = "snowflake"))]
    async fn run(&self, _sql: &str) -> Result<Vec<Row>, ClientError> {
        Err(ClientError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }

    #[cfg(feature = "snowflake")]
    async fn test_connection(&self) -> Result<(), ClientError> {
        self.api.exec("SELECT 1")
            .await
            .map_err(|e| ClientError::QueryError(format!("Connection test failed: {}", e)))?;
        Ok(())
    }

    #[cfg(not(feature = "snowflake"))]
    async fn test_connection(&self) -> Result<(), ClientError> {
        Err(ClientError::ConfigError(
            "Snowflake support not compiled. Rebuild with: cargo build --features snowflake".to_string()
        ))
    }
}
