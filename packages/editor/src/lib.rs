//! # Dashsync Editor
//!
//! Client-side editing engine for one dashboard and its embedded charts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ workspace: AggregateLoader → EditSession    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession + reconciliation        │
//! │  - Baseline / working copy                  │
//! │  - Optimistic mutations, rollback on error  │
//! │  - Follow toggle state machine              │
//! │  - Single-chart drafts                      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ patch: baseline → proposal JSON patch       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ common: SyncGateway (remote store)          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Baseline is the diff source**: patches are never taken between two
//!    optimistic states
//! 2. **Server authority**: an accepted patch's returned record replaces the
//!    local copy wholesale
//! 3. **Scoped rollback**: a failed mutation only restores the fields it touched
//! 4. **Stale responses are dropped**: every request carries the session
//!    epoch and a ticket
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dashsync_editor::{EditSession, Reconciler};
//!
//! let reconciler = Reconciler::new(&gateway);
//! reconciler.edit_description(&mut session, "Quarterly numbers").await?;
//!
//! // Or drive the request yourself
//! if let Some(submission) = session.edit_description("Quarterly numbers")? {
//!     let result = reconciler.send(&submission).await;
//!     session.resolve_patch(&submission, result)?;
//! }
//! ```

mod errors;
mod follow;
mod items;
mod mutations;
mod reconcile;
mod session;
mod view;

pub use errors::EditorError;
pub use follow::{FollowPhase, FollowRequest, FollowerSet};
pub use items::{ItemDraft, ItemSlot, ItemSubmission};
pub use mutations::{FieldGroup, Mutation, MutationError};
pub use reconcile::{Plan, ReconciliationPolicy, Reconciler};
pub use session::{EditSession, Epoch, PatchSubmission, PendingMutation, Resolution, Ticket};
pub use view::{Crumb, DashboardView, ItemRow, NavigationTrail};
