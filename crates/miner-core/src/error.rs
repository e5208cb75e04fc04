use crate::node::NodeError;

#[derive(Debug, thiserror::Error)]
pub enum MinerError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to spawn worker thread {worker}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("worker thread {worker} panicked")]
    WorkerPanicked { worker: usize },
    #[error(transparent)]
    Node(#[from] NodeError),
}
