//! Test fixtures for catalog client integration tests
//!
//! Listings shaped like what `SYSTEM$LIST_ICEBERG_TABLES_FROM_CATALOG` and
//! `INFORMATION_SCHEMA.TABLES` return.

#![allow(dead_code)]

use icesync_core::Row;
use serde_json::json;

/// A catalog listing cell as returned in the `TABLE_LIST` column
pub fn table_list_json() -> String {
    json!([
        {"namespace": "sales", "name": "orders"},
        {"namespace": "sales", "name": "customers"},
        {"namespace": "marketing", "name": "campaigns"}
    ])
    .to_string()
}

/// Result rows of the catalog listing query
pub fn table_list_rows() -> Vec<Row> {
    vec![row(json!({ "TABLE_LIST": table_list_json() }))]
}

/// Result rows of the inventory query
pub fn inventory_rows() -> Vec<Row> {
    vec![
        row(json!({"TABLE_SCHEMA": "SALES", "TABLE_NAME": "ORDERS"})),
        row(json!({"TABLE_SCHEMA": "SALES", "TABLE_NAME": "CUSTOMERS"})),
        row(json!({"TABLE_SCHEMA": "LEGACY", "TABLE_NAME": "ARCHIVE"})),
    ]
}

pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}
