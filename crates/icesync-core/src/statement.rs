//! Executed statement records (the run's audit trail)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One result row as returned by the warehouse, keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A statement submitted to the warehouse together with its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    /// Submission index within the run (0-based)
    pub sequence: u64,

    /// Capture time, strictly increasing within one run
    pub statement_timestamp: DateTime<Utc>,

    /// The SQL text exactly as submitted
    pub sql: String,

    /// Raw result rows
    pub rows: Vec<Row>,
}

impl StatementRecord {
    pub fn new(
        sequence: u64,
        statement_timestamp: DateTime<Utc>,
        sql: impl Into<String>,
        rows: Vec<Row>,
    ) -> Self {
        Self {
            sequence,
            statement_timestamp,
            sql: sql.into(),
            rows,
        }
    }

    /// First value of the `status` column, if the warehouse returned one
    ///
    /// Snowflake answers DDL with a single `status` row such as
    /// "Schema SALES successfully created.".
    pub fn status(&self) -> Option<&str> {
        self.rows.iter().find_map(|row| {
            row.iter()
                .find(|(column, _)| column.eq_ignore_ascii_case("status"))
                .and_then(|(_, value)| value.as_str())
        })
    }
}
