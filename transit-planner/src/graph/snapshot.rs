//! Versioned graph snapshots.
//!
//! A snapshot stores the raw records plus a content hash and the build
//! timestamp, so a host can skip feed parsing across restarts. Indexes are
//! rebuilt on restore.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use twox_hash::XxHash64;

use super::{GraphError, TransportGraph};
use crate::domain::Dataset;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    version: u32,
    hash: &'a str,
    build_date: DateTime<Utc>,
    data: &'a Dataset,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    version: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    hash: String,
    build_date: DateTime<Utc>,
    data: Dataset,
}

/// xxHash64 of the JSON-encoded records, as 16 hex digits.
pub(super) fn content_hash(dataset: &Dataset) -> Result<String, GraphError> {
    let bytes = serde_json::to_vec(dataset)?;
    Ok(format!("{:016x}", XxHash64::oneshot(0, &bytes)))
}

impl TransportGraph {
    /// Encode the graph's records as a snapshot.
    pub fn serialize(&self) -> Result<Vec<u8>, GraphError> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            hash: self.hash(),
            build_date: self.built_at(),
            data: self.dataset(),
        };
        Ok(serde_json::to_vec(&snapshot)?)
    }

    /// Restore a graph from a snapshot, rebuilding all indexes.
    ///
    /// Footpaths are not part of the snapshot; call
    /// [`TransportGraph::prepare_footpaths`] afterwards.
    ///
    /// # Errors
    ///
    /// - [`GraphError::VersionMismatch`] for an unknown format version
    /// - [`GraphError::CorruptSnapshot`] if the records don't hash to the
    ///   stored value
    pub fn deserialize(bytes: &[u8]) -> Result<Self, GraphError> {
        let header: SnapshotHeader = serde_json::from_slice(bytes)?;
        if header.version != SNAPSHOT_VERSION {
            return Err(GraphError::VersionMismatch {
                found: header.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        if content_hash(&snapshot.data)? != snapshot.hash {
            return Err(GraphError::CorruptSnapshot);
        }

        Self::from_parts(snapshot.data, snapshot.hash, snapshot.build_date)
    }

    /// Write a snapshot to `path`.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), GraphError> {
        let bytes = self.serialize()?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "wrote graph snapshot");
        Ok(())
    }

    /// Read a snapshot from `path`.
    pub fn load_snapshot(path: &Path) -> Result<Self, GraphError> {
        let bytes = std::fs::read(path)?;
        let graph = Self::deserialize(&bytes)?;
        info!(path = %path.display(), hash = graph.hash(), "restored graph snapshot");
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;

    #[test]
    fn snapshot_restores_graph() {
        let graph = TransportGraph::load(fixtures::dataset()).unwrap();
        let bytes = graph.serialize().unwrap();
        let restored = TransportGraph::deserialize(&bytes).unwrap();

        assert_eq!(restored.hash(), graph.hash());
        assert_eq!(restored.built_at(), graph.built_at());
        assert_eq!(restored.dataset(), graph.dataset());
        assert_eq!(restored.stats(), graph.stats());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let graph = TransportGraph::load(fixtures::dataset()).unwrap();
        let mut value: serde_json::Value =
            serde_json::from_slice(&graph.serialize().unwrap()).unwrap();
        value["version"] = serde_json::json!(2);
        let bytes = serde_json::to_vec(&value).unwrap();

        let err = TransportGraph::deserialize(&bytes).unwrap_err();
        assert!(matches!(
            err,
            GraphError::VersionMismatch {
                found: 2,
                expected: 1
            }
        ));
    }

    #[test]
    fn tampered_records_are_corrupt() {
        let graph = TransportGraph::load(fixtures::dataset()).unwrap();
        let mut value: serde_json::Value =
            serde_json::from_slice(&graph.serialize().unwrap()).unwrap();
        value["data"]["stops"][0]["name"] = serde_json::json!("Renamed");
        let bytes = serde_json::to_vec(&value).unwrap();

        let err = TransportGraph::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, GraphError::CorruptSnapshot));
    }

    #[test]
    fn garbage_is_an_encoding_error() {
        let err = TransportGraph::deserialize(b"not json").unwrap_err();
        assert!(matches!(err, GraphError::Snapshot(_)));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let graph = TransportGraph::load(fixtures::dataset()).unwrap();
        graph.save_snapshot(&path).unwrap();
        let restored = TransportGraph::load_snapshot(&path).unwrap();
        assert_eq!(restored.hash(), graph.hash());
    }

    #[test]
    fn hash_is_stable() {
        let a = content_hash(&fixtures::dataset()).unwrap();
        let b = content_hash(&fixtures::dataset()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }
}
