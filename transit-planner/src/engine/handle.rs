//! Lazily built, shared engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::domain::Dataset;
use crate::feed;
use crate::graph::TransportGraph;

use super::{EngineConfig, EngineError, PathfindingEngine};

/// Where the engine's records come from.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    /// A directory of feed CSV files.
    FeedDir(PathBuf),
    /// Records already in memory.
    Dataset(Arc<Dataset>),
}

impl DatasetSource {
    fn load(&self) -> Result<Dataset, EngineError> {
        match self {
            DatasetSource::FeedDir(dir) => Ok(feed::load_dir(dir)?),
            DatasetSource::Dataset(dataset) => Ok(Dataset::clone(dataset)),
        }
    }
}

/// Builds the engine once and hands out shared references to it.
///
/// Concurrent callers of [`EngineHandle::get`] before the build finishes all
/// wait on the same build. A failed build leaves the handle empty, so the
/// next call tries again.
#[derive(Debug)]
pub struct EngineHandle {
    source: DatasetSource,
    snapshot: Option<PathBuf>,
    config: EngineConfig,
    engine: OnceCell<Arc<PathfindingEngine>>,
}

impl EngineHandle {
    pub fn new(source: DatasetSource, config: EngineConfig) -> Self {
        Self {
            source,
            snapshot: None,
            config,
            engine: OnceCell::new(),
        }
    }

    /// Restore from, and save to, a graph snapshot at `path`.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine, building it on first use.
    pub async fn get(&self) -> Result<Arc<PathfindingEngine>, EngineError> {
        self.engine
            .get_or_try_init(|| async {
                let source = self.source.clone();
                let snapshot = self.snapshot.clone();
                let config = self.config.clone();
                let engine = tokio::task::spawn_blocking(move || {
                    build_engine(&source, snapshot.as_deref(), config)
                })
                .await
                .map_err(|e| EngineError::Build(e.to_string()))??;
                Ok::<_, EngineError>(Arc::new(engine))
            })
            .await
            .cloned()
    }

    /// The engine, if it has been built.
    pub fn try_get(&self) -> Option<Arc<PathfindingEngine>> {
        self.engine.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.engine.initialized()
    }
}

fn restore(path: &Path) -> Option<TransportGraph> {
    if !path.exists() {
        return None;
    }
    match TransportGraph::load_snapshot(path) {
        Ok(graph) => Some(graph),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                stale = e.is_stale_snapshot(),
                "graph snapshot unusable, rebuilding"
            );
            None
        }
    }
}

fn build_engine(
    source: &DatasetSource,
    snapshot: Option<&Path>,
    config: EngineConfig,
) -> Result<PathfindingEngine, EngineError> {
    let graph = match snapshot.and_then(restore) {
        Some(graph) => graph,
        None => {
            let graph = TransportGraph::load(source.load()?)?;
            info!(hash = graph.hash(), "built graph from records");
            if let Some(path) = snapshot {
                if let Err(e) = graph.save_snapshot(path) {
                    warn!(path = %path.display(), error = %e, "could not write graph snapshot");
                }
            }
            graph
        }
    };

    Ok(PathfindingEngine::new(graph, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphError, fixtures};

    fn handle() -> EngineHandle {
        EngineHandle::new(
            DatasetSource::Dataset(Arc::new(fixtures::dataset())),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn builds_once() {
        let handle = handle();
        assert!(!handle.is_ready());
        assert!(handle.try_get().is_none());

        let (a, b) = tokio::join!(handle.get(), handle.get());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(handle.is_ready());
        assert_eq!(a.stats().stops, 5);
    }

    #[tokio::test]
    async fn writes_then_restores_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let first = handle().with_snapshot(&path).get().await.unwrap();
        assert!(path.exists());

        // an empty in-memory source proves the second build used the file
        let second = EngineHandle::new(
            DatasetSource::Dataset(Arc::new(Dataset::default())),
            EngineConfig::default(),
        )
        .with_snapshot(&path)
        .get()
        .await
        .unwrap();
        assert_eq!(second.stats().hash, first.stats().hash);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, b"{\"version\": 99}").unwrap();

        let engine = handle().with_snapshot(&path).get().await.unwrap();
        assert_eq!(engine.stats().stops, 5);

        let restored = TransportGraph::load_snapshot(&path).unwrap();
        assert_eq!(restored.hash(), engine.stats().hash);
    }

    #[tokio::test]
    async fn failed_build_leaves_handle_empty() {
        let handle = EngineHandle::new(
            DatasetSource::Dataset(Arc::new(Dataset::default())),
            EngineConfig::default(),
        );
        let err = handle.get().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Graph(GraphError::MissingData { table: "stops" })
        ));
        assert!(!handle.is_ready());
    }

    #[tokio::test]
    async fn missing_feed_dir_is_a_feed_error() {
        let dir = tempfile::tempdir().unwrap();
        let handle = EngineHandle::new(
            DatasetSource::FeedDir(dir.path().join("nope")),
            EngineConfig::default(),
        );
        assert!(matches!(handle.get().await, Err(EngineError::Feed(_))));
    }
}
