//! # Dashsync Workspace
//!
//! Loads a dashboard into an [`EditSession`](dashsync_editor::EditSession)
//! and keeps exactly one session current. Opening another dashboard retires
//! the previous session; its late responses are ignored.

pub mod error;
pub mod loader;
pub mod state;

pub use error::{LoadError, PartialFailure, SyncError, SyncResult};
pub use loader::{AggregateLoader, LoadedAggregate, DASHBOARD_SERVICE_KIND};
pub use state::{LoadTicket, SessionManager, TrailTicket, VocabularyTicket};
