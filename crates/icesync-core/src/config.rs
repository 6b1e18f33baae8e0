//! Configuration schema (icesync.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schemas that never take part in orphan detection unless overridden
pub const DEFAULT_EXCLUDED_SCHEMAS: &[&str] = &["INFORMATION_SCHEMA", "PUBLIC"];

fn default_excluded_schemas() -> Vec<String> {
    DEFAULT_EXCLUDED_SCHEMAS.iter().map(|s| s.to_string()).collect()
}

/// Warehouse connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Warehouse type (only "snowflake" is supported)
    #[serde(rename = "type")]
    pub warehouse_type: String,

    /// Connection settings (account, username, password, warehouse, role, database)
    #[serde(flatten)]
    pub settings: HashMap<String, String>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            warehouse_type: "snowflake".to_string(),
            settings: HashMap::new(),
        }
    }
}

impl WarehouseConfig {
    /// Look up a connection setting
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

/// Main configuration structure
///
/// One `SyncConfig` describes one reconciliation target: the catalog
/// integration to read from and the external volume new tables are bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Name of the catalog integration object in the warehouse
    #[serde(default)]
    pub catalog_integration: String,

    /// Name of the external volume backing the Iceberg tables
    #[serde(default)]
    pub external_volume: String,

    /// Execute DROP TABLE for orphans instead of only suggesting it
    #[serde(default)]
    pub drop_orphans: bool,

    /// Schemas ignored when listing the local inventory
    #[serde(default = "default_excluded_schemas")]
    pub excluded_schemas: Vec<String>,

    /// Warehouse connection configuration
    #[serde(default)]
    pub warehouse: Option<WarehouseConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            catalog_integration: String::new(),
            external_volume: String::new(),
            drop_orphans: false,
            excluded_schemas: default_excluded_schemas(),
            warehouse: None,
        }
    }
}

impl SyncConfig {
    /// Create a config for the given catalog integration and external volume
    pub fn new(catalog_integration: impl Into<String>, external_volume: impl Into<String>) -> Self {
        Self {
            catalog_integration: catalog_integration.into(),
            external_volume: external_volume.into(),
            ..Self::default()
        }
    }

    /// Enable or disable dropping orphan tables
    pub fn with_drop_orphans(mut self, drop_orphans: bool) -> Self {
        self.drop_orphans = drop_orphans;
        self
    }

    /// Replace the excluded schema list
    pub fn with_excluded_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_schemas = schemas.into_iter().map(Into::into).collect();
        self
    }

    /// Check whether a warehouse schema is excluded (case-insensitive)
    pub fn is_schema_excluded(&self, schema: &str) -> bool {
        self.excluded_schemas
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(schema))
    }

    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Ensure the settings needed to render DDL are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_integration.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "catalog_integration must be set".to_string(),
            ));
        }
        if self.external_volume.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "external_volume must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config() {
        let config = SyncConfig::default();
        assert!(!config.drop_orphans);
        assert_eq!(config.excluded_schemas, vec!["INFORMATION_SCHEMA", "PUBLIC"]);
        assert!(config.warehouse.is_none());
    }

    #[test]
    fn parse_full_config() {
        let config = SyncConfig::from_toml(
            r#"
            catalog_integration = "fivetran_catalog"
            external_volume = "fivetran_volume"
            drop_orphans = true
            excluded_schemas = ["INFORMATION_SCHEMA", "PUBLIC", "STAGING"]

            [warehouse]
            type = "snowflake"
            account = "xy12345.us-east-1"
            username = "loader"
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog_integration, "fivetran_catalog");
        assert_eq!(config.external_volume, "fivetran_volume");
        assert!(config.drop_orphans);
        assert!(config.is_schema_excluded("staging"));

        let warehouse = config.warehouse.unwrap();
        assert_eq!(warehouse.warehouse_type, "snowflake");
        assert_eq!(warehouse.setting("account"), Some("xy12345.us-east-1"));
        assert_eq!(warehouse.setting("password"), None);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = SyncConfig::from_toml("catalog_integration = \"cat\"").unwrap();
        assert!(!config.drop_orphans);
        assert!(config.is_schema_excluded("information_schema"));
        assert!(config.is_schema_excluded("PUBLIC"));
        assert!(!config.is_schema_excluded("SALES"));
    }

    #[test]
    fn validate_requires_integration_and_volume() {
        assert!(matches!(
            SyncConfig::default().validate(),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SyncConfig::new("cat", " ").validate(),
            Err(ConfigError::Invalid(msg)) if msg.contains("external_volume")
        ));
        assert!(SyncConfig::new("cat", "vol").validate().is_ok());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        assert!(matches!(
            SyncConfig::from_toml("drop_orphans = \"maybe\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn builder_helpers() {
        let config = SyncConfig::new("cat", "vol")
            .with_drop_orphans(true)
            .with_excluded_schemas(["AUDIT"]);
        assert!(config.drop_orphans);
        assert!(config.is_schema_excluded("audit"));
        assert!(!config.is_schema_excluded("PUBLIC"));
    }

    #[test]
    fn warehouse_section_round_trips_through_toml() {
        let config = SyncConfig {
            warehouse: Some(WarehouseConfig {
                warehouse_type: "snowflake".to_string(),
                settings: [("account".to_string(), "xy12345".to_string())].into_iter().collect(),
            }),
            ..SyncConfig::new("cat", "vol").with_drop_orphans(true)
        };

        let text = toml::to_string(&config).unwrap();
        assert_eq!(SyncConfig::from_toml(&text).unwrap(), config);
    }
}
