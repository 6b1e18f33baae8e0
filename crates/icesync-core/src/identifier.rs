//! Table identifiers and cross-source key normalization
//!
//! The external catalog and the warehouse's INFORMATION_SCHEMA disagree on
//! letter case (catalogs usually report lower-case namespaces, Snowflake
//! always reports upper-case unquoted identifiers). Every comparison between
//! the two goes through [`FullyQualifiedKey`], never through the raw records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize a `(namespace, name)` pair into its comparable key
pub fn normalize(namespace: &str, name: &str) -> FullyQualifiedKey {
    FullyQualifiedKey(format!(
        "{}.{}",
        namespace.to_uppercase(),
        name.to_uppercase()
    ))
}

/// Case-folded `NAMESPACE.NAME` key used to match tables across sources
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FullyQualifiedKey(String);

impl FullyQualifiedKey {
    /// Re-normalize an already joined key
    ///
    /// Normalizing a key that is already normalized is a no-op.
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullyQualifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FullyQualifiedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A table advertised by the external catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRecord {
    /// Catalog-assigned namespace (becomes the warehouse schema)
    pub namespace: String,

    /// Table name inside the namespace
    pub name: String,
}

impl TableRecord {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn key(&self) -> FullyQualifiedKey {
        normalize(&self.namespace, &self.name)
    }
}

impl fmt::Display for TableRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// A table found in the target database's metadata store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalTableRecord {
    /// Warehouse schema name
    pub schema: String,

    /// Table name
    pub name: String,
}

impl LocalTableRecord {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    pub fn key(&self) -> FullyQualifiedKey {
        normalize(&self.schema, &self.name)
    }
}

impl fmt::Display for LocalTableRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
