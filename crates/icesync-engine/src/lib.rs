//! icesync engine - reconciliation logic
//!
//! This crate implements the reconciliation of an external Iceberg catalog
//! with the tables of a target warehouse database:
//! - Reconciliation plan (ensure set, orphan set)
//! - DDL statement rendering
//! - Sequential execution and audit trail aggregation
//! - Orphan policy (report or drop)

pub mod ddl;
pub mod error;
pub mod executor;
pub mod orphan;
pub mod pipeline;
pub mod reconcile;

pub use ddl::StatementBuilder;
pub use error::SyncError;
pub use executor::{aggregate, Executor, RunClock};
pub use orphan::{OrphanOutcome, OrphanPolicy};
pub use pipeline::{Reconciler, SyncOutcome};
pub use reconcile::{reconcile, ReconciliationPlan};
