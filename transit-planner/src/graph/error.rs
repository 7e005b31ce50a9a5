//! Transport graph errors.

/// Errors from building or restoring a [`super::TransportGraph`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A required table is empty
    #[error("dataset has no {table}")]
    MissingData { table: &'static str },

    /// Snapshot written by an incompatible version
    #[error("snapshot version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    /// Snapshot records do not match the stored content hash
    #[error("snapshot content hash does not match its records")]
    CorruptSnapshot,

    /// Snapshot could not be encoded or decoded
    #[error("snapshot encoding: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Snapshot file could not be read or written
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Returns true if the snapshot should be discarded and the graph
    /// rebuilt from the feed.
    pub fn is_stale_snapshot(&self) -> bool {
        matches!(
            self,
            GraphError::VersionMismatch { .. } | GraphError::CorruptSnapshot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GraphError::MissingData { table: "stops" };
        assert_eq!(err.to_string(), "dataset has no stops");

        let err = GraphError::VersionMismatch {
            found: 7,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "snapshot version 7 is not supported (expected 1)"
        );
        assert!(err.is_stale_snapshot());
        assert!(GraphError::CorruptSnapshot.is_stale_snapshot());
        assert!(!GraphError::MissingData { table: "stops" }.is_stale_snapshot());
    }
}
