use crate::feed::FeedError;
use crate::graph::GraphError;

/// Error building the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// The blocking build task panicked or was cancelled.
    #[error("engine build task failed: {0}")]
    Build(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::from(GraphError::MissingData { table: "stops" });
        assert!(err.to_string().starts_with("graph error: "));

        let err = EngineError::Build("task cancelled".into());
        assert_eq!(err.to_string(), "engine build task failed: task cancelled");
    }
}
