//! Diagnostic codes and operator-facing findings
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the report format.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// A local table is absent from the external catalog and was left in place
    OrphanTableDetected,

    /// A local table is absent from the external catalog and was dropped
    OrphanTableDropped,

    /// The external catalog listed the same table more than once
    DuplicateCatalogEntry,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrphanTableDetected => "ORPHAN_TABLE_DETECTED",
            Self::OrphanTableDropped => "ORPHAN_TABLE_DROPPED",
            Self::DuplicateCatalogEntry => "DUPLICATE_CATALOG_ENTRY",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// A finding produced by a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Fully qualified key of the table concerned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Statement the operator can run to act on the finding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            table: None,
            suggestion: None,
        }
    }

    /// Set the table the diagnostic refers to
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Attach a statement the operator can copy and run
    pub fn with_suggestion(mut self, sql: impl Into<String>) -> Self {
        self.suggestion = Some(sql.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn diagnostic_code_stability() {
        assert_eq!(DiagnosticCode::OrphanTableDetected.as_str(), "ORPHAN_TABLE_DETECTED");
        assert_eq!(DiagnosticCode::OrphanTableDropped.as_str(), "ORPHAN_TABLE_DROPPED");
        assert_eq!(DiagnosticCode::DuplicateCatalogEntry.as_str(), "DUPLICATE_CATALOG_ENTRY");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::OrphanTableDetected,
            Severity::Warn,
            "Orphan table detected: LEGACY.ARCHIVE",
        )
        .with_table("LEGACY.ARCHIVE")
        .with_suggestion("DROP TABLE LEGACY.ARCHIVE");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("ORPHAN_TABLE_DETECTED"));
        assert!(json.contains("\"warn\""));
        assert!(json.contains("DROP TABLE LEGACY.ARCHIVE"));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let diag = Diagnostic::new(DiagnosticCode::DuplicateCatalogEntry, Severity::Warn, "dup");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(!json.contains("suggestion"));
        assert!(!json.contains("table"));
    }

    #[test]
    fn severity_levels() {
        assert!(Severity::Info < Severity::Warn);
        assert_eq!(serde_json::to_string(&Severity::Info).unwrap(), "\"info\"");
        assert_eq!(
            serde_json::from_str::<Severity>("\"warn\"").unwrap(),
            Severity::Warn
        );
        assert!(serde_json::from_str::<Severity>("\"error\"").is_err());
    }
}
