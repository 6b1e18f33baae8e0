//! Reconciliation of the external catalog against the local inventory
//!
//! Compares the two listings by [`FullyQualifiedKey`] and produces the
//! ensure set (every catalog table, re-asserted each run) and the orphan set
//! (local tables the catalog no longer advertises).

use crate::error::SyncError;
use icesync_core::{FullyQualifiedKey, LocalTableRecord, TableRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Output of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Catalog tables to create or replace, in catalog order, one per key
    pub ensure_set: Vec<TableRecord>,

    /// Keys of ensure entries that already exist locally
    pub matched: Vec<FullyQualifiedKey>,

    /// Local keys absent from the catalog, sorted
    pub orphan_set: Vec<FullyQualifiedKey>,

    /// Catalog keys that were listed more than once
    pub duplicates: Vec<FullyQualifiedKey>,
}

impl ReconciliationPlan {
    /// Check if any local table is missing from the catalog
    pub fn has_orphans(&self) -> bool {
        !self.orphan_set.is_empty()
    }

    /// Ensure entries with no local counterpart yet
    pub fn missing_locally(&self) -> impl Iterator<Item = &TableRecord> {
        let matched: HashSet<&FullyQualifiedKey> = self.matched.iter().collect();
        self.ensure_set
            .iter()
            .filter(move |t| !matched.contains(&t.key()))
    }
}

/// Compute the reconciliation plan for two listings
///
/// Fails with [`SyncError::MalformedRecord`] if a catalog record has a blank
/// namespace or name, since its key could not match anything.
pub fn reconcile(
    external: &[TableRecord],
    local: &[LocalTableRecord],
) -> Result<ReconciliationPlan, SyncError> {
    for (index, table) in external.iter().enumerate() {
        if table.namespace.trim().is_empty() {
            return Err(SyncError::MalformedRecord {
                index,
                reason: format!("missing namespace for table '{}'", table.name),
            });
        }
        if table.name.trim().is_empty() {
            return Err(SyncError::MalformedRecord {
                index,
                reason: format!("missing name in namespace '{}'", table.namespace),
            });
        }
    }

    let local_keys: HashSet<FullyQualifiedKey> = local.iter().map(LocalTableRecord::key).collect();

    let mut external_keys = HashSet::new();
    let mut ensure_set = Vec::new();
    let mut matched = Vec::new();
    let mut duplicates = BTreeSet::new();

    for table in external {
        let key = table.key();
        if !external_keys.insert(key.clone()) {
            duplicates.insert(key);
            continue;
        }
        if local_keys.contains(&key) {
            matched.push(key);
        }
        ensure_set.push(table.clone());
    }

    let orphan_set: BTreeSet<FullyQualifiedKey> = local_keys
        .into_iter()
        .filter(|key| !external_keys.contains(key))
        .collect();

    Ok(ReconciliationPlan {
        ensure_set,
        matched,
        orphan_set: orphan_set.into_iter().collect(),
        duplicates: duplicates.into_iter().collect(),
    })
}
