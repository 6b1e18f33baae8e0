//! Catalog and warehouse clients for Iceberg table reconciliation
//!
//! This crate defines the three collaborators a reconciliation run talks to
//! ([`CatalogClient`], [`LocalInventory`], [`SqlExecutor`]) and provides a
//! Snowflake implementation plus an in-memory mock.
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `snowflake` - Snowflake support
//!
//! ## Example
//!
//! ```rust,ignore
//! use icesync_catalog::{CatalogClient, SnowflakeWarehouse};
//!
//! let warehouse = SnowflakeWarehouse::builder()
//!     .with_password("xy12345", "loader", "secret")
//!     .with_catalog_integration("fivetran_catalog")
//!     .build()?;
//! let tables = CatalogClient::list_tables(&warehouse).await?;
//! ```

pub mod adapter;
pub mod mock;
pub mod snowflake;

pub use adapter::{CatalogClient, ClientError, LocalInventory, SqlExecutor};
pub use mock::{MockWarehouse, MockWarehouseBuilder};
pub use snowflake::{SnowflakeWarehouse, SnowflakeWarehouseBuilder};
