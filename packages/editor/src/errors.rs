//! Error types for the editor

use dashsync_common::GatewayError;
use dashsync_patch::PatchError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    /// Caller broke a precondition; raised before any network call
    #[error("Invalid mutation arguments: {0}")]
    InvalidMutationArgs(#[from] crate::mutations::MutationError),

    /// The store refused the patch; the working copy was not advanced
    #[error("Patch rejected for {target}: {reason}")]
    PatchRejected { target: String, reason: String },

    #[error("Gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),
}

impl EditorError {
    /// Classify a failed submission against `target`
    pub fn from_submission(target: &str, error: GatewayError) -> Self {
        match error {
            GatewayError::Rejected(reason) | GatewayError::NotFound(reason) => {
                EditorError::PatchRejected {
                    target: target.to_string(),
                    reason,
                }
            }
            other => EditorError::Gateway(other),
        }
    }
}

impl From<GatewayError> for EditorError {
    fn from(e: GatewayError) -> Self {
        EditorError::Gateway(e)
    }
}
