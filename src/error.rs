//! Error types for the benchmark engine.

use thiserror::Error;

/// Errors that can occur while loading inputs or running a benchmark.
///
/// The benchmark is an offline, deterministic tool: every variant is fatal
/// to the run it occurs in and nothing is retried.
#[derive(Debug, Error)]
pub enum BenchError {
    /// I/O error (file operations, disk I/O)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A label line that could not be parsed as the expected integers.
    #[error("malformed label line {line} in {path}: {reason}")]
    MalformedLabel {
        path: String,
        line: usize,
        reason: String,
    },

    /// A binary file ended before a full record could be read.
    #[error("file {path} truncated: expected {expected} values in record, got {got}")]
    TruncatedFile {
        path: String,
        expected: usize,
        got: usize,
    },

    /// A vector record declared a dimension that disagrees with the first record.
    #[error("vector dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Search was issued before the index was trained/populated.
    #[error("index has not been built or loaded")]
    IndexNotBuilt,

    /// Label store and base vector count disagree.
    #[error("label store has {labels} entries but base set holds {vectors} vectors")]
    LabelCountMismatch { labels: usize, vectors: usize },

    /// Invalid parameter value (zero batch, zero probe depth, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Persisted index file is not in the expected format.
    #[error("index format error: {0}")]
    IndexFormat(String),

    /// Worker pool construction failed.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl From<rayon::ThreadPoolBuildError> for BenchError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(e.to_string())
    }
}

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;
