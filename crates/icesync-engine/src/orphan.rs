//! Orphan table handling
//!
//! Destructive action is binary and caller-configured: either every orphan
//! is dropped, or every orphan is reported with the exact statement that
//! would drop it.

use crate::ddl::StatementBuilder;
use crate::error::SyncError;
use crate::executor::Executor;
use icesync_core::{FullyQualifiedKey, StatementRecord, SyncConfig};
use serde::{Deserialize, Serialize};

/// What happened to one orphan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrphanOutcome {
    /// Left in place; `sql` is the statement an operator can run by hand
    Suggested { key: FullyQualifiedKey, sql: String },

    /// Dropped by this run
    Dropped { key: FullyQualifiedKey, record: StatementRecord },
}

impl OrphanOutcome {
    pub fn key(&self) -> &FullyQualifiedKey {
        match self {
            Self::Suggested { key, .. } | Self::Dropped { key, .. } => key,
        }
    }

    /// The DROP statement, suggested or executed
    pub fn sql(&self) -> &str {
        match self {
            Self::Suggested { sql, .. } => sql,
            Self::Dropped { record, .. } => &record.sql,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }
}

/// Decides whether orphans are dropped or only reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrphanPolicy {
    drop_enabled: bool,
}

impl OrphanPolicy {
    pub fn new(drop_enabled: bool) -> Self {
        Self { drop_enabled }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.drop_orphans)
    }

    pub fn drop_enabled(&self) -> bool {
        self.drop_enabled
    }

    /// Apply the policy to every orphan, in order
    ///
    /// In report-only mode the executor is never called. With dropping
    /// enabled the first failing DROP aborts the remaining orphans.
    pub async fn handle(
        &self,
        orphans: &[FullyQualifiedKey],
        executor: &mut Executor<'_>,
    ) -> Result<Vec<OrphanOutcome>, SyncError> {
        let mut outcomes = Vec::with_capacity(orphans.len());

        for key in orphans {
            let sql = StatementBuilder::build_drop_statement(key);

            if self.drop_enabled {
                let record = executor.execute(&sql).await?;
                tracing::info!(table = %key, "Dropped orphan table: {}", sql);
                outcomes.push(OrphanOutcome::Dropped {
                    key: key.clone(),
                    record,
                });
            } else {
                tracing::warn!(
                    table = %key,
                    "Orphan table detected. Run the following to drop it: {}",
                    sql
                );
                outcomes.push(OrphanOutcome::Suggested {
                    key: key.clone(),
                    sql,
                });
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icesync_catalog::{ClientError, MockWarehouse};

    fn orphans() -> Vec<FullyQualifiedKey> {
        vec![FullyQualifiedKey::from_raw("ANALYTICS.OLD_TABLE")]
    }

    #[tokio::test]
    async fn report_only_makes_no_executor_calls() {
        let warehouse = MockWarehouse::new();
        let mut executor = Executor::new(&warehouse);

        let outcomes = OrphanPolicy::new(false)
            .handle(&orphans(), &mut executor)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].sql(), "DROP TABLE ANALYTICS.OLD_TABLE");
        assert!(!outcomes[0].is_dropped());
        assert_eq!(warehouse.execution_count().await, 0);
        assert_eq!(executor.submitted(), 0);
    }

    #[tokio::test]
    async fn drop_enabled_executes_exactly_once() {
        let warehouse = MockWarehouse::new();
        let mut executor = Executor::new(&warehouse);

        let outcomes = OrphanPolicy::new(true)
            .handle(&orphans(), &mut executor)
            .await
            .unwrap();

        assert_eq!(warehouse.executed().await, vec!["DROP TABLE ANALYTICS.OLD_TABLE"]);
        assert!(outcomes[0].is_dropped());
        assert_eq!(outcomes[0].key().as_str(), "ANALYTICS.OLD_TABLE");
    }

    #[tokio::test]
    async fn failing_drop_aborts() {
        let warehouse = MockWarehouse::new();
        warehouse
            .fail_statement_containing("A.ONE", ClientError::PermissionDenied("not owner".to_string()))
            .await;
        let mut executor = Executor::new(&warehouse);
        let keys = vec![
            FullyQualifiedKey::from_raw("A.ONE"),
            FullyQualifiedKey::from_raw("A.TWO"),
        ];

        let result = OrphanPolicy::new(true).handle(&keys, &mut executor).await;

        assert!(matches!(result, Err(SyncError::StatementExecutionFailed { .. })));
        assert_eq!(warehouse.execution_count().await, 0);
    }

    #[test]
    fn policy_defaults_to_report_only() {
        assert!(!OrphanPolicy::default().drop_enabled());
        assert!(!OrphanPolicy::from_config(&SyncConfig::default()).drop_enabled());
        assert!(OrphanPolicy::from_config(&SyncConfig::default().with_drop_orphans(true)).drop_enabled());
    }

    #[test]
    fn outcome_serializes_with_action_tag() {
        let outcome = OrphanOutcome::Suggested {
            key: FullyQualifiedKey::from_raw("LEGACY.ARCHIVE"),
            sql: "DROP TABLE LEGACY.ARCHIVE".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"action\":\"suggested\""));
        assert!(json.contains("LEGACY.ARCHIVE"));
    }
}
