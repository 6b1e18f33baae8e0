//! Errors that abort a reconciliation run

use icesync_catalog::ClientError;

/// A fatal reconciliation error
///
/// Every variant aborts the run. Statements executed before the failure stay
/// applied; they are not transactional as a group.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The external catalog could not be listed
    #[error("External catalog unavailable: {0}")]
    CatalogUnavailable(#[source] ClientError),

    /// The target database inventory could not be listed
    #[error("Local inventory unavailable: {0}")]
    LocalInventoryUnavailable(#[source] ClientError),

    /// A CREATE or DROP statement failed
    #[error("Statement failed after {applied} applied statements: {source}\n{sql}")]
    StatementExecutionFailed {
        sql: String,
        /// Statements of this run that succeeded before the failure
        applied: u64,
        #[source]
        source: ClientError,
    },

    /// A catalog record is missing its namespace or name
    #[error("Malformed catalog record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

impl SyncError {
    /// The statement that failed, if any
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::StatementExecutionFailed { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Wrap a catalog listing error; a malformed record keeps its own kind
    pub fn from_catalog(error: ClientError) -> Self {
        match error {
            ClientError::MalformedRecord { index, reason } => Self::MalformedRecord { index, reason },
            other => Self::CatalogUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_failure_names_the_sql() {
        let err = SyncError::StatementExecutionFailed {
            sql: "DROP TABLE LEGACY.ARCHIVE".to_string(),
            applied: 4,
            source: ClientError::PermissionDenied("not owner".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("after 4 applied statements"));
        assert!(message.contains("DROP TABLE LEGACY.ARCHIVE"));
        assert!(message.contains("not owner"));
        assert_eq!(err.statement(), Some("DROP TABLE LEGACY.ARCHIVE"));
    }

    #[test]
    fn malformed_client_record_maps_to_malformed_record() {
        let err = SyncError::from_catalog(ClientError::MalformedRecord {
            index: 2,
            reason: "missing name".to_string(),
        });
        assert!(matches!(err, SyncError::MalformedRecord { index: 2, .. }));

        let err = SyncError::from_catalog(ClientError::NetworkError("down".to_string()));
        assert!(matches!(err, SyncError::CatalogUnavailable(_)));
        assert_eq!(err.statement(), None);
    }
}
