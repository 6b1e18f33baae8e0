//! Test fixtures for reconciliation integration tests
//!
//! Warehouses modelled after a typical Fivetran-managed lake: a handful of
//! catalog namespaces, a database that has drifted a little.

#![allow(dead_code)]

use icesync_catalog::{MockWarehouse, MockWarehouseBuilder};
use icesync_core::SyncConfig;

pub const CATALOG_INTEGRATION: &str = "fivetran_catalog_beheld_flier";
pub const EXTERNAL_VOLUME: &str = "fivetran_volume_beheld_flier";

/// Config in report-only mode
pub fn config() -> SyncConfig {
    SyncConfig::new(CATALOG_INTEGRATION, EXTERNAL_VOLUME)
}

/// Config that drops orphans
pub fn dropping_config() -> SyncConfig {
    config().with_drop_orphans(true)
}

/// Catalog advertises `sales.orders`; the database also holds a stale archive
pub fn drifted_warehouse() -> MockWarehouse {
    MockWarehouseBuilder::new()
        .with_catalog_table("sales", "orders")
        .with_local_table("SALES", "ORDERS")
        .with_local_table("LEGACY", "ARCHIVE")
        .build()
}

/// Several namespaces, nothing materialized yet
pub fn fresh_warehouse() -> MockWarehouse {
    MockWarehouseBuilder::new()
        .with_catalog_table("sales", "orders")
        .with_catalog_table("sales", "customers")
        .with_catalog_table("marketing", "campaigns")
        .build()
}
