//! Patch application.
//!
//! Applies operations in order; the first failing operation aborts and the
//! document may be left partially patched, so callers apply onto a copy.

use crate::{JsonPointer, Operation, PatchError};
use serde_json::Value;

/// Apply every operation in order.
pub fn apply(doc: &mut Value, ops: &[Operation]) -> Result<(), PatchError> {
    for op in ops {
        apply_op(doc, op)?;
    }
    Ok(())
}

/// Apply a single operation.
pub fn apply_op(doc: &mut Value, op: &Operation) -> Result<(), PatchError> {
    match op {
        Operation::Add { path, value } => add(doc, path, value.clone()),
        Operation::Remove { path } => remove(doc, path).map(|_| ()),
        Operation::Replace { path, value } => replace(doc, path, value.clone()),
        Operation::Move { from, path } => {
            if from.is_prefix_of(path) {
                return Err(PatchError::InvalidTarget(path.to_string()));
            }
            let value = remove(doc, from)?;
            add(doc, path, value)
        }
        Operation::Copy { from, path } => {
            let value = get(doc, from)?.clone();
            add(doc, path, value)
        }
        Operation::Test { path, value } => {
            if get(doc, path)? == value {
                Ok(())
            } else {
                Err(PatchError::TestFailed(path.to_string()))
            }
        }
    }
}

fn get<'a>(doc: &'a Value, path: &JsonPointer) -> Result<&'a Value, PatchError> {
    doc.pointer(&path.to_string())
        .ok_or_else(|| PatchError::NotFound(path.to_string()))
}

fn parent_mut<'a>(doc: &'a mut Value, path: &JsonPointer) -> Result<&'a mut Value, PatchError> {
    doc.pointer_mut(&path.to_string())
        .ok_or_else(|| PatchError::NotFound(path.to_string()))
}

fn parse_index(token: &str, path: &JsonPointer) -> Result<usize, PatchError> {
    token
        .parse()
        .map_err(|_| PatchError::InvalidIndex(path.to_string()))
}

fn add(doc: &mut Value, path: &JsonPointer, value: Value) -> Result<(), PatchError> {
    let Some((parent, key)) = path.split_last() else {
        *doc = value;
        return Ok(());
    };

    match parent_mut(doc, &parent)? {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            if key == "-" {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(key, path)?;
            if index > items.len() {
                return Err(PatchError::InvalidIndex(path.to_string()));
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::InvalidTarget(path.to_string())),
    }
}

fn remove(doc: &mut Value, path: &JsonPointer) -> Result<Value, PatchError> {
    let (parent, key) = path
        .split_last()
        .ok_or_else(|| PatchError::InvalidTarget(path.to_string()))?;

    match parent_mut(doc, &parent)? {
        Value::Object(map) => map
            .remove(key)
            .ok_or_else(|| PatchError::NotFound(path.to_string())),
        Value::Array(items) => {
            let index = parse_index(key, path)?;
            if index >= items.len() {
                return Err(PatchError::NotFound(path.to_string()));
            }
            Ok(items.remove(index))
        }
        _ => Err(PatchError::InvalidTarget(path.to_string())),
    }
}

fn replace(doc: &mut Value, path: &JsonPointer, value: Value) -> Result<(), PatchError> {
    let Some((parent, key)) = path.split_last() else {
        *doc = value;
        return Ok(());
    };

    match parent_mut(doc, &parent)? {
        Value::Object(map) => match map.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PatchError::NotFound(path.to_string())),
        },
        Value::Array(items) => {
            let index = parse_index(key, path)?;
            let slot = items
                .get_mut(index)
                .ok_or_else(|| PatchError::NotFound(path.to_string()))?;
            *slot = value;
            Ok(())
        }
        _ => Err(PatchError::InvalidTarget(path.to_string())),
    }
}
