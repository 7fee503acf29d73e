use horizon_map::StorageError;

use std::sync::Arc;
use thiserror::Error;

/// Why a generation request did not complete. Cloned to every caller that joins the request.
#[derive(Clone, Debug, Error)]
pub enum GenerationError {
    #[error("generation was cancelled")]
    Cancelled,
    #[error("failed to read persisted chunk: {0}")]
    Storage(Arc<StorageError>),
    #[error("terrain synthesis failed: {0}")]
    Synthesis(String),
    #[error("generation worker panicked: {0}")]
    Panicked(String),
}

impl From<StorageError> for GenerationError {
    fn from(e: StorageError) -> Self {
        Self::Storage(Arc::new(e))
    }
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
