use crate::VertexId;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TraversalError>;

#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("invalid traversal: {0}")]
    InvalidTraversal(String),

    #[error("key {0} is declared more than once")]
    DuplicateKey(String),

    #[error("step {step} expected {expected} but found {found}")]
    TypeMismatch {
        step: String,
        expected: &'static str,
        found: String,
    },

    #[error("vertex {0} has no traverser tracker")]
    MissingTracker(VertexId),

    #[error("memory key {0} is not declared")]
    UnknownMemoryKey(String),

    #[error("memory key {key} cannot reduce {found} with {reducer}")]
    MemoryTypeMismatch {
        key: String,
        reducer: String,
        found: String,
    },

    #[error("memory key {0} overflowed")]
    Overflow(String),

    #[error("computation did not converge within {supersteps} supersteps")]
    NonConvergence { supersteps: u64 },

    #[error("computation cancelled before superstep {superstep}")]
    Cancelled { superstep: u64 },

    #[error("worker {worker} panicked during superstep {superstep}")]
    WorkerPanicked { worker: usize, superstep: u64 },

    #[error("failed to read edges from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
