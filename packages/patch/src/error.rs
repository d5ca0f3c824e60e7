//! Error types for patch computation and application

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("Invalid pointer: {0}")]
    InvalidPointer(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Invalid array index at {0}")]
    InvalidIndex(String),

    #[error("Cannot address into a scalar at {0}")]
    InvalidTarget(String),

    #[error("Test failed at {0}")]
    TestFailed(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for PatchError {
    fn from(e: serde_json::Error) -> Self {
        PatchError::Serialize(e.to_string())
    }
}
