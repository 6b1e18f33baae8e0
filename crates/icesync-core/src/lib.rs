//! icesync core
//!
//! Domain model shared by every icesync crate: table identifiers and their
//! normalized keys, configuration, statement records and the versioned
//! report format. Never rename diagnostic codes - they are part of the
//! report format.

pub mod config;
pub mod diagnostic;
pub mod identifier;
pub mod report;
pub mod statement;

pub use config::{ConfigError, SyncConfig, WarehouseConfig, DEFAULT_EXCLUDED_SCHEMAS};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use identifier::{normalize, FullyQualifiedKey, LocalTableRecord, TableRecord};
pub use report::{OrphanEntry, ReportSummary, ReportVersion, SyncReport};
pub use statement::{Row, StatementRecord};
