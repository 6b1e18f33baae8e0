//! Sync report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};
use crate::statement::StatementRecord;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Distinct tables listed by the external catalog
    pub catalog_tables: usize,

    /// Tables re-asserted with CREATE OR REPLACE
    pub tables_ensured: usize,

    /// Ensured tables that already existed locally
    pub tables_matched: usize,

    /// Statements executed on the ensure path
    pub statements_executed: usize,

    /// Local tables absent from the external catalog
    pub orphans_detected: usize,

    /// Orphans actually dropped
    pub orphans_dropped: usize,
}

/// What happened to one orphan table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanEntry {
    /// Fully qualified key of the orphan
    pub table: String,

    /// The DROP statement (suggested or executed)
    pub sql: String,

    /// Whether the statement was executed
    pub dropped: bool,
}

/// Sync report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Executed ensure-path statements in chronological order
    pub statements: Vec<StatementRecord>,

    /// Orphan tables and their handling
    pub orphans: Vec<OrphanEntry>,

    /// Findings raised during the run
    pub diagnostics: Vec<Diagnostic>,
}

impl SyncReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            statements: Vec::new(),
            orphans: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Record an orphan and keep the summary counters in step
    pub fn add_orphan(&mut self, entry: OrphanEntry) {
        self.summary.orphans_detected += 1;
        if entry.dropped {
            self.summary.orphans_dropped += 1;
        }
        self.orphans.push(entry);
    }

    /// Orphans that were reported but not dropped
    pub fn pending_drops(&self) -> impl Iterator<Item = &OrphanEntry> {
        self.orphans.iter().filter(|o| !o.dropped)
    }

    /// Number of diagnostics at the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}
