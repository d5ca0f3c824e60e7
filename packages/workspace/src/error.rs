use dashsync_common::GatewayError;
use dashsync_editor::EditorError;
use std::fmt;
use thiserror::Error;

/// The root aggregate could not be loaded; nothing is rendered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to fetch aggregate {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: GatewayError,
    },

    #[error("Requested aggregate {requested}, store returned {returned}")]
    IdentifierMismatch { requested: String, returned: String },
}

/// A secondary fetch that failed while assembling the aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum PartialFailure {
    Item {
        index: usize,
        id: String,
        reason: String,
    },
    Service {
        id: String,
        reason: String,
    },
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialFailure::Item { index, id, reason } => {
                write!(f, "chart {} at index {}: {}", id, index, reason)
            }
            PartialFailure::Service { id, reason } => write!(f, "service {}: {}", id, reason),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Load degraded: {} secondary fetches failed", failures.len())]
    PartialLoad { failures: Vec<PartialFailure> },

    #[error("Load of {aggregate_id} was superseded by a newer load")]
    Superseded { aggregate_id: String },

    #[error("No aggregate is open")]
    NoSession,

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type SyncResult<T> = Result<T, SyncError>;
