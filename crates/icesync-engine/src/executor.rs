//! Statement execution and audit trail aggregation

use crate::error::SyncError;
use chrono::{DateTime, Duration, Utc};
use icesync_catalog::SqlExecutor;
use icesync_core::StatementRecord;

type ClockSource = Box<dyn FnMut() -> DateTime<Utc> + Send>;

/// Per-run clock that never hands out the same instant twice
///
/// Wall-clock reads can repeat (or go backwards) between two fast
/// statements; the run clock bumps such reads by one microsecond past the
/// previous stamp so timestamps are strictly increasing within a run.
pub struct RunClock {
    source: ClockSource,
    last: Option<DateTime<Utc>>,
}

impl RunClock {
    /// Clock backed by `Utc::now`
    pub fn system() -> Self {
        Self::with_source(Utc::now)
    }

    /// Clock backed by a custom time source
    pub fn with_source(source: impl FnMut() -> DateTime<Utc> + Send + 'static) -> Self {
        Self {
            source: Box::new(source),
            last: None,
        }
    }

    pub fn now(&mut self) -> DateTime<Utc> {
        let read = (self.source)();
        let stamp = match self.last {
            Some(last) if read <= last => last + Duration::microseconds(1),
            _ => read,
        };
        self.last = Some(stamp);
        stamp
    }
}

impl Default for RunClock {
    fn default() -> Self {
        Self::system()
    }
}

/// Submits statements one at a time and stamps each result
pub struct Executor<'a> {
    sql: &'a dyn SqlExecutor,
    clock: RunClock,
    next_sequence: u64,
}

impl<'a> Executor<'a> {
    pub fn new(sql: &'a dyn SqlExecutor) -> Self {
        Self::with_clock(sql, RunClock::system())
    }

    pub fn with_clock(sql: &'a dyn SqlExecutor, clock: RunClock) -> Self {
        Self {
            sql,
            clock,
            next_sequence: 0,
        }
    }

    /// Execute one statement against the warehouse
    ///
    /// The timestamp is captured when the statement is submitted. On failure
    /// the error carries the SQL text.
    pub async fn execute(&mut self, sql: &str) -> Result<StatementRecord, SyncError> {
        let sequence = self.next_sequence;
        let timestamp = self.clock.now();
        self.next_sequence += 1;

        tracing::debug!(sequence, executor = self.sql.name(), sql, "submitting statement");

        let rows = self.sql.run(sql).await.map_err(|source| {
            tracing::error!(sequence, applied = sequence, sql, error = %source, "statement failed");
            SyncError::StatementExecutionFailed {
                sql: sql.to_string(),
                applied: sequence,
                source,
            }
        })?;

        tracing::info!(sequence, sql, "applied statement");

        Ok(StatementRecord::new(sequence, timestamp, sql, rows))
    }

    /// Execute statements in order, stopping at the first failure
    pub async fn execute_all<I, S>(&mut self, statements: I) -> Result<Vec<StatementRecord>, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records = Vec::new();
        for sql in statements {
            records.push(self.execute(sql.as_ref()).await?);
        }
        Ok(records)
    }

    /// Number of statements submitted so far, failed ones included
    pub fn submitted(&self) -> u64 {
        self.next_sequence
    }
}

/// Order statement records into one chronological audit trail
///
/// Sorted ascending by timestamp; the submission sequence breaks ties.
pub fn aggregate(mut records: Vec<StatementRecord>) -> Vec<StatementRecord> {
    records.sort_by(|a, b| {
        a.statement_timestamp
            .cmp(&b.statement_timestamp)
            .then(a.sequence.cmp(&b.sequence))
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use icesync_catalog::{ClientError, MockWarehouse};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn run_clock_is_strictly_increasing() {
        let mut clock = RunClock::with_source(|| Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let first = clock.now();
        let second = clock.now();
        let third = clock.now();
        assert!(first < second);
        assert!(second < third);
        assert_eq!(second - first, Duration::microseconds(1));
    }

    #[test]
    fn run_clock_passes_through_advancing_time() {
        let mut ticks = vec![at(1), at(2), at(0)].into_iter();
        let mut clock = RunClock::with_source(move || ticks.next().unwrap_or_else(|| at(10)));
        assert_eq!(clock.now(), at(1));
        assert_eq!(clock.now(), at(2));
        // Going backwards is clamped
        assert_eq!(clock.now(), at(2) + Duration::microseconds(1));
        assert_eq!(clock.now(), at(10));
    }

    #[test]
    fn aggregate_sorts_by_timestamp() {
        let records = vec![
            StatementRecord::new(2, at(30), "c", vec![]),
            StatementRecord::new(0, at(10), "a", vec![]),
            StatementRecord::new(1, at(20), "b", vec![]),
        ];
        let sql: Vec<_> = aggregate(records).into_iter().map(|r| r.sql).collect();
        assert_eq!(sql, vec!["a", "b", "c"]);
    }

    #[test]
    fn aggregate_breaks_ties_by_sequence() {
        let records = vec![
            StatementRecord::new(1, at(5), "second", vec![]),
            StatementRecord::new(0, at(5), "first", vec![]),
        ];
        let sql: Vec<_> = aggregate(records).into_iter().map(|r| r.sql).collect();
        assert_eq!(sql, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn execute_stamps_sql_and_sequence() {
        let warehouse = MockWarehouse::new();
        let mut executor = Executor::new(&warehouse);

        let first = executor.execute("CREATE SCHEMA IF NOT EXISTS sales").await.unwrap();
        let second = executor.execute("SELECT 1").await.unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(first.sql, "CREATE SCHEMA IF NOT EXISTS sales");
        assert_eq!(first.status(), Some("Statement executed successfully."));
        assert_eq!(second.sequence, 1);
        assert!(first.statement_timestamp < second.statement_timestamp);
        assert_eq!(executor.submitted(), 2);
    }

    #[tokio::test]
    async fn execute_all_stops_at_first_failure() {
        let warehouse = MockWarehouse::new();
        warehouse
            .fail_statement_containing("broken", ClientError::QueryError("syntax error".to_string()))
            .await;
        let mut executor = Executor::new(&warehouse);

        let result = executor.execute_all(["SELECT 1", "SELECT broken", "SELECT 2"]).await;

        match result {
            Err(SyncError::StatementExecutionFailed { sql, applied, .. }) => {
                assert_eq!(sql, "SELECT broken");
                assert_eq!(applied, 1);
            }
            other => panic!("Expected StatementExecutionFailed, got {:?}", other),
        }
        assert_eq!(warehouse.executed().await, vec!["SELECT 1"]);
        assert_eq!(executor.submitted(), 2);
    }
}
