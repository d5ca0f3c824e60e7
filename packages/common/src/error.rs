use thiserror::Error;

/// Common error type for fixture and config handling
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by the remote store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store refused the request (stale baseline, validation failure)
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
