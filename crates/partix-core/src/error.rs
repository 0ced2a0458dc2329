use thiserror::Error;

/// Canonical result for core and the crates layered on it.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad construction arguments (zero partitions, unknown sign flag, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// A repartition producer failed or vanished before publishing its row.
    #[error("Exchange aborted: {0}")]
    ExchangeAborted(String),

    #[error("Dispose failed for partition {partition}: {reason}")]
    Dispose { partition: usize, reason: String },

    #[error("Worker for partition {partition} panicked")]
    WorkerPanicked { partition: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// Cancellation is an expected outcome, not an abnormal failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
