//! # Patch Computation
//!
//! Produces the minimal structural difference between two snapshots.
//!
//! ## Rules
//!
//! - Equal values emit nothing
//! - Objects: removed keys first (in `before` key order), then changed keys
//!   recursively and new keys (in `after` key order)
//! - Arrays are positional: index `i` is compared with index `i`, so an edit
//!   inside one element stays under that element's sub-path. Surplus trailing
//!   elements are removed from the highest index down; new trailing elements
//!   are appended in ascending order.
//! - Anything else that differs (including a type change at the root) is a
//!   single `replace`

use crate::{JsonPointer, Operation, PatchError};
use serde::Serialize;
use serde_json::{Map, Value};

/// Generate the operations that turn `before` into `after`.
pub fn diff(before: &Value, after: &Value) -> Vec<Operation> {
    let mut ops = Vec::new();
    diff_at(&mut ops, &JsonPointer::root(), before, after);
    ops
}

/// Diff two typed records through their serde representation.
pub fn diff_records<T: Serialize>(before: &T, after: &T) -> Result<Vec<Operation>, PatchError> {
    let before = serde_json::to_value(before)?;
    let after = serde_json::to_value(after)?;
    Ok(diff(&before, &after))
}

fn diff_at(ops: &mut Vec<Operation>, path: &JsonPointer, before: &Value, after: &Value) {
    if before == after {
        return;
    }
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => diff_object(ops, path, b, a),
        (Value::Array(b), Value::Array(a)) => diff_array(ops, path, b, a),
        _ => ops.push(Operation::replace(path.clone(), after.clone())),
    }
}

fn diff_object(
    ops: &mut Vec<Operation>,
    path: &JsonPointer,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
) {
    for key in before.keys() {
        if !after.contains_key(key) {
            ops.push(Operation::remove(path.child(key.as_str())));
        }
    }

    for (key, after_value) in after {
        let child = path.child(key.as_str());
        match before.get(key) {
            Some(before_value) => diff_at(ops, &child, before_value, after_value),
            None => ops.push(Operation::add(child, after_value.clone())),
        }
    }
}

fn diff_array(ops: &mut Vec<Operation>, path: &JsonPointer, before: &[Value], after: &[Value]) {
    let shared = before.len().min(after.len());

    for index in 0..shared {
        diff_at(ops, &path.index(index), &before[index], &after[index]);
    }

    // Highest index first so earlier removals never shift later ones
    for index in (shared..before.len()).rev() {
        ops.push(Operation::remove(path.index(index)));
    }

    for (index, value) in after.iter().enumerate().skip(shared) {
        ops.push(Operation::add(path.index(index), value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply;
    use serde_json::json;

    fn ptr(s: &str) -> JsonPointer {
        s.parse().unwrap()
    }

    #[test]
    fn test_equal_documents_produce_no_ops() {
        let doc = json!({"id": "d1", "tags": [{"tagFQN": "Tier.Tier1"}], "charts": []});
        assert!(diff(&doc, &doc.clone()).is_empty());
    }

    #[test]
    fn test_single_leaf_change() {
        let before = json!({"id": "d1", "description": "old", "owner": {"id": "u1", "type": "user"}});
        let after = json!({"id": "d1", "description": "old", "owner": {"id": "u2", "type": "user"}});

        let ops = diff(&before, &after);
        assert_eq!(ops, vec![Operation::replace(ptr("/owner/id"), json!("u2"))]);
    }

    #[test]
    fn test_new_key_is_added() {
        let ops = diff(&json!({"id": "d1"}), &json!({"id": "d1", "description": "x"}));
        assert_eq!(ops, vec![Operation::add(ptr("/description"), json!("x"))]);
    }

    #[test]
    fn test_missing_key_is_removed() {
        let ops = diff(&json!({"id": "d1", "owner": {"id": "u1"}}), &json!({"id": "d1"}));
        assert_eq!(ops, vec![Operation::remove(ptr("/owner"))]);
    }

    #[test]
    fn test_array_elements_are_positional() {
        let before = json!({"charts": [
            {"id": "c0", "description": "a"},
            {"id": "c1", "description": "b"},
            {"id": "c2", "description": "c"},
        ]});
        let mut after = before.clone();
        after["charts"][1]["description"] = json!("new desc");

        let ops = diff(&before, &after);
        assert_eq!(
            ops,
            vec![Operation::replace(ptr("/charts/1/description"), json!("new desc"))]
        );
    }

    #[test]
    fn test_array_shrink_removes_from_the_end() {
        let ops = diff(&json!([1, 2, 3, 4]), &json!([1, 2]));
        assert_eq!(
            ops,
            vec![Operation::remove(ptr("/3")), Operation::remove(ptr("/2"))]
        );
    }

    #[test]
    fn test_array_growth_appends() {
        let ops = diff(&json!({"tags": []}), &json!({"tags": ["a", "b"]}));
        assert_eq!(
            ops,
            vec![
                Operation::add(ptr("/tags/0"), json!("a")),
                Operation::add(ptr("/tags/1"), json!("b")),
            ]
        );
    }

    #[test]
    fn test_root_type_change_is_one_replace() {
        let ops = diff(&json!({"a": 1}), &json!([1]));
        assert_eq!(ops, vec![Operation::replace(JsonPointer::root(), json!([1]))]);
    }

    #[test]
    fn test_subset_change_never_rewrites_root() {
        let before = json!({"a": 1, "b": {"c": [1, 2]}, "d": "x"});
        let after = json!({"a": 2, "b": {"c": [1, 3]}, "d": "x"});

        let ops = diff(&before, &after);
        assert!(ops.iter().all(|op| !op.path().is_root()));
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_diff_is_deterministic() {
        let before = json!({"z": 1, "a": [1, {"k": "v"}], "m": null});
        let after = json!({"a": [2, {"k": "w"}, 3], "n": true});

        let first = diff(&before, &after);
        let second = diff(&before.clone(), &after.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_applying_diff_reaches_target() {
        let before = json!({"tags": [{"tagFQN": "A"}, {"tagFQN": "B"}, {"tagFQN": "C"}], "x": {"y": 1}});
        let after = json!({"tags": [{"tagFQN": "B"}], "x": {"z": 2}, "w": [true]});

        let mut doc = before.clone();
        apply(&mut doc, &diff(&before, &after)).unwrap();
        assert_eq!(doc, after);
    }

    #[test]
    fn test_diff_records() {
        #[derive(Serialize)]
        struct Row {
            id: String,
            description: Option<String>,
        }

        let before = Row { id: "c1".into(), description: None };
        let after = Row { id: "c1".into(), description: Some("hello".into()) };

        let ops = diff_records(&before, &after).unwrap();
        assert_eq!(ops, vec![Operation::replace(ptr("/description"), json!("hello"))]);
    }
}
