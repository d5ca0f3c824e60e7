//! # Dashsync Patch
//!
//! Structural patches between two snapshots of a record.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ before / after (serde_json::Value)          │
//! └─────────────────────────────────────────────┘
//!                     ↓ diff
//! ┌─────────────────────────────────────────────┐
//! │ Vec<Operation> (add/remove/replace/...)     │
//! │  - positional arrays (index-addressed)      │
//! │  - deterministic ordering                   │
//! └─────────────────────────────────────────────┘
//!                     ↓ serde
//! ┌─────────────────────────────────────────────┐
//! │ [{"op": "...", "path": "/a/0", ...}]        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The differ never talks to the network. Every mutation in the editor uses
//! it to produce its wire payload.
//!
//! ## Usage
//!
//! ```rust
//! use dashsync_patch::{diff, Operation};
//! use serde_json::json;
//!
//! let ops = diff(&json!({"description": "a"}), &json!({"description": "b"}));
//! assert_eq!(ops, vec![Operation::replace("/description".parse().unwrap(), json!("b"))]);
//! ```

mod apply;
mod diff;
mod error;
mod operation;
mod pointer;

pub use apply::{apply, apply_op};
pub use diff::{diff, diff_records};
pub use error::PatchError;
pub use operation::Operation;
pub use pointer::JsonPointer;
