use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for the harness.
///
/// Nothing here is fatal to a run: a `Connection` failure skips one
/// subsystem's sub-tests, an `Operation` failure becomes a failed
/// [`Sample`](crate::sample::Sample), and everything else is surfaced in
/// the final report rather than propagated out of the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// A subsystem could not be reached at all.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A single query or scrape failed; the batch continues.
    #[error("operation failed: {0}")]
    Operation(String),

    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
