//! # Patch Operations
//!
//! The wire unit of a partial update. A patch is an ordered `Vec<Operation>`
//! serialized as an array of `{op, path, value?, from?}` records.

use crate::JsonPointer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structural operation addressed by a JSON pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: JsonPointer, value: Value },

    Remove { path: JsonPointer },

    Replace { path: JsonPointer, value: Value },

    Move { from: JsonPointer, path: JsonPointer },

    Copy { from: JsonPointer, path: JsonPointer },

    /// Precondition: the value at `path` must equal `value`
    Test { path: JsonPointer, value: Value },
}

impl Operation {
    pub fn add(path: JsonPointer, value: Value) -> Self {
        Operation::Add { path, value }
    }

    pub fn remove(path: JsonPointer) -> Self {
        Operation::Remove { path }
    }

    pub fn replace(path: JsonPointer, value: Value) -> Self {
        Operation::Replace { path, value }
    }

    pub fn test(path: JsonPointer, value: Value) -> Self {
        Operation::Test { path, value }
    }

    /// Target path of the operation
    pub fn path(&self) -> &JsonPointer {
        match self {
            Operation::Add { path, .. }
            | Operation::Remove { path }
            | Operation::Replace { path, .. }
            | Operation::Move { path, .. }
            | Operation::Copy { path, .. }
            | Operation::Test { path, .. } => path,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
            Operation::Replace { .. } => "replace",
            Operation::Move { .. } => "move",
            Operation::Copy { .. } => "copy",
            Operation::Test { .. } => "test",
        }
    }
}
