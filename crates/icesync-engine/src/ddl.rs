//! DDL rendering for catalog-linked Iceberg tables
//!
//! Identifiers are interpolated as-is. Namespaces and table names come from
//! the external catalog, which is trusted; they are not user input and are
//! neither quoted nor escaped here.

use icesync_core::{FullyQualifiedKey, SyncConfig, TableRecord};

/// Renders the statements that bind catalog tables into the warehouse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBuilder {
    catalog_integration: String,
    external_volume: String,
}

impl StatementBuilder {
    pub fn new(catalog_integration: impl Into<String>, external_volume: impl Into<String>) -> Self {
        Self {
            catalog_integration: catalog_integration.into(),
            external_volume: external_volume.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.catalog_integration.clone(), config.external_volume.clone())
    }

    /// `CREATE SCHEMA IF NOT EXISTS` for the record's namespace
    pub fn build_schema_statement(&self, table: &TableRecord) -> String {
        format!(
            "CREATE SCHEMA IF NOT EXISTS {namespace}\n\
             EXTERNAL_VOLUME = '{volume}'\n\
             CATALOG = '{catalog}'",
            namespace = table.namespace,
            volume = self.external_volume,
            catalog = self.catalog_integration,
        )
    }

    /// `CREATE OR REPLACE ICEBERG TABLE` linked to the catalog table, auto-refreshing
    pub fn build_table_statement(&self, table: &TableRecord) -> String {
        format!(
            "CREATE OR REPLACE ICEBERG TABLE {namespace}.{name}\n\
             EXTERNAL_VOLUME = '{volume}'\n\
             CATALOG = '{catalog}'\n\
             CATALOG_NAMESPACE = '{namespace}'\n\
             CATALOG_TABLE_NAME = '{name}'\n\
             AUTO_REFRESH = TRUE",
            namespace = table.namespace,
            name = table.name,
            volume = self.external_volume,
            catalog = self.catalog_integration,
        )
    }

    /// Both statements for one table; the schema statement always comes first
    pub fn statements_for(&self, table: &TableRecord) -> [String; 2] {
        [self.build_schema_statement(table), self.build_table_statement(table)]
    }

    /// All ensure statements for a sequence of tables, in order
    pub fn ensure_statements<'a, I>(&self, tables: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a TableRecord>,
    {
        tables
            .into_iter()
            .flat_map(|table| self.statements_for(table))
            .collect()
    }

    /// `DROP TABLE` for an orphan key
    pub fn build_drop_statement(key: &FullyQualifiedKey) -> String {
        format!("DROP TABLE {}", key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builder() -> StatementBuilder {
        StatementBuilder::new("fivetran_catalog", "fivetran_volume")
    }

    #[test]
    fn schema_statement() {
        let sql = builder().build_schema_statement(&TableRecord::new("sales", "orders"));
        assert_eq!(
            sql,
            "CREATE SCHEMA IF NOT EXISTS sales\n\
             EXTERNAL_VOLUME = 'fivetran_volume'\n\
             CATALOG = 'fivetran_catalog'"
        );
    }

    #[test]
    fn table_statement() {
        let sql = builder().build_table_statement(&TableRecord::new("sales", "orders"));
        assert_eq!(
            sql,
            "CREATE OR REPLACE ICEBERG TABLE sales.orders\n\
             EXTERNAL_VOLUME = 'fivetran_volume'\n\
             CATALOG = 'fivetran_catalog'\n\
             CATALOG_NAMESPACE = 'sales'\n\
             CATALOG_TABLE_NAME = 'orders'\n\
             AUTO_REFRESH = TRUE"
        );
    }

    #[test]
    fn schema_statement_precedes_table_statement() {
        let [first, second] = builder().statements_for(&TableRecord::new("hr", "staff"));
        assert!(first.starts_with("CREATE SCHEMA IF NOT EXISTS hr"));
        assert!(second.starts_with("CREATE OR REPLACE ICEBERG TABLE hr.staff"));
    }

    #[test]
    fn ensure_statements_interleave_per_table() {
        let tables = vec![TableRecord::new("a", "x"), TableRecord::new("b", "y")];
        let statements = builder().ensure_statements(&tables);

        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE SCHEMA IF NOT EXISTS a"));
        assert!(statements[1].starts_with("CREATE OR REPLACE ICEBERG TABLE a.x"));
        assert!(statements[2].starts_with("CREATE SCHEMA IF NOT EXISTS b"));
        assert!(statements[3].starts_with("CREATE OR REPLACE ICEBERG TABLE b.y"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let table = TableRecord::new("sales", "orders");
        assert_eq!(builder().statements_for(&table), builder().statements_for(&table));
    }

    #[test]
    fn builder_from_config() {
        let config = SyncConfig::new("cat", "vol");
        let sql = StatementBuilder::from_config(&config)
            .build_table_statement(&TableRecord::new("n", "t"));
        assert!(sql.contains("EXTERNAL_VOLUME = 'vol'"));
        assert!(sql.contains("CATALOG = 'cat'"));
    }

    #[test]
    fn drop_statement() {
        let key = FullyQualifiedKey::from_raw("ANALYTICS.OLD_TABLE");
        assert_eq!(StatementBuilder::build_drop_statement(&key), "DROP TABLE ANALYTICS.OLD_TABLE");
    }
}
