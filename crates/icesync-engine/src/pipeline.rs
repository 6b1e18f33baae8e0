//! End-to-end reconciliation run
//!
//! list catalog -> list local inventory -> reconcile -> build statements ->
//! execute -> aggregate -> orphan policy
//!
//! Each stage lives in its own module and can be exercised on its own; this
//! module only sequences them and decides what is fatal.

use crate::ddl::StatementBuilder;
use crate::error::SyncError;
use crate::executor::{aggregate, Executor, RunClock};
use crate::orphan::{OrphanOutcome, OrphanPolicy};
use crate::reconcile::{reconcile, ReconciliationPlan};
use icesync_catalog::{CatalogClient, LocalInventory, SqlExecutor};
use icesync_core::{
    Diagnostic, DiagnosticCode, LocalTableRecord, OrphanEntry, ReportSummary, Severity,
    StatementRecord, SyncConfig, SyncReport,
};
use serde::{Deserialize, Serialize};

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// The plan that was executed
    pub plan: ReconciliationPlan,

    /// Ensure-path statements in chronological order
    pub audit_trail: Vec<StatementRecord>,

    /// Orphan handling, in orphan-set order
    pub orphans: Vec<OrphanOutcome>,
}

impl SyncOutcome {
    /// Convert into the versioned report format
    pub fn into_report(self) -> SyncReport {
        let mut report = SyncReport::new();

        report.summary = ReportSummary {
            catalog_tables: self.plan.ensure_set.len(),
            tables_ensured: self.plan.ensure_set.len(),
            tables_matched: self.plan.matched.len(),
            statements_executed: self.audit_trail.len(),
            ..ReportSummary::default()
        };

        for key in &self.plan.duplicates {
            report.add_diagnostic(
                Diagnostic::new(
                    DiagnosticCode::DuplicateCatalogEntry,
                    Severity::Warn,
                    format!("External catalog lists {} more than once", key),
                )
                .with_table(key.as_str()),
            );
        }

        for outcome in &self.orphans {
            let key = outcome.key().as_str();
            let diagnostic = if outcome.is_dropped() {
                Diagnostic::new(
                    DiagnosticCode::OrphanTableDropped,
                    Severity::Info,
                    format!("Dropped orphan table: {}", key),
                )
                .with_table(key)
            } else {
                Diagnostic::new(
                    DiagnosticCode::OrphanTableDetected,
                    Severity::Warn,
                    format!("Orphan table detected: {}", key),
                )
                .with_table(key)
                .with_suggestion(outcome.sql())
            };
            report.add_diagnostic(diagnostic);
            report.add_orphan(OrphanEntry {
                table: key.to_string(),
                sql: outcome.sql().to_string(),
                dropped: outcome.is_dropped(),
            });
        }

        report.statements = self.audit_trail;
        report
    }
}

/// Drives one reconciliation run against a catalog and a warehouse
pub struct Reconciler<'a> {
    catalog: &'a dyn CatalogClient,
    inventory: &'a dyn LocalInventory,
    executor: &'a dyn SqlExecutor,
    config: &'a SyncConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        catalog: &'a dyn CatalogClient,
        inventory: &'a dyn LocalInventory,
        executor: &'a dyn SqlExecutor,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            catalog,
            inventory,
            executor,
            config,
        }
    }

    /// List both sides and compute the plan without executing anything
    pub async fn plan(&self) -> Result<ReconciliationPlan, SyncError> {
        let external = self
            .catalog
            .list_tables()
            .await
            .map_err(SyncError::from_catalog)?;
        tracing::info!(catalog = self.catalog.name(), tables = external.len(), "Listed external catalog");

        let local: Vec<LocalTableRecord> = self
            .inventory
            .list_tables()
            .await
            .map_err(SyncError::LocalInventoryUnavailable)?
            .into_iter()
            .filter(|t| !self.config.is_schema_excluded(&t.schema))
            .collect();
        tracing::info!(inventory = self.inventory.name(), tables = local.len(), "Listed local inventory");

        let plan = reconcile(&external, &local)?;

        for key in &plan.duplicates {
            tracing::warn!(table = %key, "External catalog lists table more than once; ensuring it once");
        }
        tracing::info!(
            ensure = plan.ensure_set.len(),
            matched = plan.matched.len(),
            orphans = plan.orphan_set.len(),
            "Computed reconciliation plan"
        );

        Ok(plan)
    }

    /// Run the full reconciliation
    pub async fn run(&self) -> Result<SyncOutcome, SyncError> {
        self.run_with_clock(RunClock::system()).await
    }

    /// Run with an explicit clock for the audit trail
    pub async fn run_with_clock(&self, clock: RunClock) -> Result<SyncOutcome, SyncError> {
        let plan = self.plan().await?;

        let builder = StatementBuilder::from_config(self.config);
        let mut executor = Executor::with_clock(self.executor, clock);

        let mut records = Vec::with_capacity(plan.ensure_set.len() * 2);
        for table in &plan.ensure_set {
            tracing::debug!(table = %table, "Ensuring table");
            records.extend(executor.execute_all(builder.statements_for(table)).await?);
        }
        let audit_trail = aggregate(records);
        tracing::info!(statements = audit_trail.len(), "Ensured catalog tables");

        let orphans = OrphanPolicy::from_config(self.config)
            .handle(&plan.orphan_set, &mut executor)
            .await?;

        Ok(SyncOutcome {
            plan,
            audit_trail,
            orphans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icesync_catalog::{ClientError, MockWarehouseBuilder};

    fn config() -> SyncConfig {
        SyncConfig::new("fivetran_catalog", "fivetran_volume")
    }

    #[tokio::test]
    async fn plan_executes_nothing() {
        let warehouse = MockWarehouseBuilder::new()
            .with_catalog_table("sales", "orders")
            .with_local_table("LEGACY", "ARCHIVE")
            .build();
        let config = config();

        let plan = Reconciler::new(&warehouse, &warehouse, &warehouse, &config)
            .plan()
            .await
            .unwrap();

        assert_eq!(plan.ensure_set.len(), 1);
        assert_eq!(plan.orphan_set.len(), 1);
        assert_eq!(warehouse.execution_count().await, 0);
    }

    #[tokio::test]
    async fn excluded_schemas_never_become_orphans() {
        let warehouse = MockWarehouseBuilder::new()
            .with_local_table("INFORMATION_SCHEMA", "TABLES")
            .with_local_table("public", "scratch")
            .with_local_table("LEGACY", "ARCHIVE")
            .build();
        let config = config();

        let plan = Reconciler::new(&warehouse, &warehouse, &warehouse, &config)
            .plan()
            .await
            .unwrap();

        let orphans: Vec<_> = plan.orphan_set.iter().map(|k| k.as_str()).collect();
        assert_eq!(orphans, vec!["LEGACY.ARCHIVE"]);
    }

    #[tokio::test]
    async fn inventory_failure_is_fatal() {
        let warehouse = MockWarehouseBuilder::new()
            .with_catalog_table("sales", "orders")
            .with_inventory_failure(ClientError::PermissionDenied("no usage".to_string()))
            .build();
        let config = config();

        let result = Reconciler::new(&warehouse, &warehouse, &warehouse, &config).run().await;

        assert!(matches!(result, Err(SyncError::LocalInventoryUnavailable(_))));
        assert_eq!(warehouse.execution_count().await, 0);
    }

    #[tokio::test]
    async fn report_counts_and_diagnostics() {
        let warehouse = MockWarehouseBuilder::new()
            .with_catalog_table("sales", "orders")
            .with_catalog_table("sales", "ORDERS")
            .with_catalog_table("hr", "staff")
            .with_local_table("SALES", "ORDERS")
            .with_local_table("LEGACY", "ARCHIVE")
            .build();
        let config = config();

        let report = Reconciler::new(&warehouse, &warehouse, &warehouse, &config)
            .run()
            .await
            .unwrap()
            .into_report();

        assert_eq!(report.summary.catalog_tables, 2);
        assert_eq!(report.summary.tables_ensured, 2);
        assert_eq!(report.summary.tables_matched, 1);
        assert_eq!(report.summary.statements_executed, 4);
        assert_eq!(report.summary.orphans_detected, 1);
        assert_eq!(report.summary.orphans_dropped, 0);
        assert_eq!(report.count(Severity::Warn), 2);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::DuplicateCatalogEntry));

        let pending: Vec<_> = report.pending_drops().map(|o| o.sql.as_str()).collect();
        assert_eq!(pending, vec!["DROP TABLE LEGACY.ARCHIVE"]);
    }
}
