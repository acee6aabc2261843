//! Deep merge helpers for form data, dependency schemas and `allOf` branches.

use serde_json::{Map, Value};

use crate::classify::is_object_schema;
use crate::error::MergeError;

/// Recursively merge `right` into `left`.
///
/// Nested objects present on both sides are merged. When `concat_arrays` is
/// set, arrays present on both sides are concatenated; otherwise `right` wins.
pub fn merge_objects(left: &Value, right: &Value, concat_arrays: bool) -> Value {
    let Some(right_map) = right.as_object() else {
        return left.clone();
    };
    let mut acc = left.as_object().cloned().unwrap_or_default();

    for (key, right_value) in right_map {
        let merged = match acc.get(key) {
            Some(left_value) if right_value.is_object() => {
                merge_objects(left_value, right_value, concat_arrays)
            }
            Some(Value::Array(left_items)) if concat_arrays => match right_value {
                Value::Array(right_items) => {
                    Value::Array(left_items.iter().chain(right_items).cloned().collect())
                }
                other => other.clone(),
            },
            _ => right_value.clone(),
        };
        acc.insert(key.clone(), merged);
    }

    Value::Object(acc)
}

/// Merge a dependent schema into a schema.
///
/// Like [`merge_objects`], except `required` lists of object schemas are
/// unioned instead of replaced.
pub fn merge_schemas(left: &Value, right: &Value) -> Value {
    let Some(right_map) = right.as_object() else {
        return left.clone();
    };
    let mut acc = left.as_object().cloned().unwrap_or_default();
    let object_schemas = is_object_schema(left) || is_object_schema(right);

    for (key, right_value) in right_map {
        let merged = match acc.get(key) {
            Some(left_value) if right_value.is_object() => merge_schemas(left_value, right_value),
            Some(Value::Array(left_items)) if object_schemas && key == "required" => {
                match right_value {
                    Value::Array(right_items) => Value::Array(union(left_items, right_items)),
                    other => other.clone(),
                }
            }
            _ => right_value.clone(),
        };
        acc.insert(key.clone(), merged);
    }

    Value::Object(acc)
}

/// Merge every branch of `allOf` into the enclosing schema.
///
/// Branches are expected to be resolved already. The result carries no
/// `allOf` keyword.
///
/// # Errors
///
/// Returns `MergeError` naming the first keyword whose values cannot be
/// reconciled (for example disjoint `type`s or unequal `const`s).
pub fn merge_all_of(schema: &Value) -> Result<Value, MergeError> {
    let mut acc = schema.as_object().cloned().unwrap_or_default();
    let branches = match acc.remove("allOf") {
        Some(Value::Array(branches)) => branches,
        Some(_) => return Err(MergeError::new("allOf")),
        None => Vec::new(),
    };

    for branch in &branches {
        match branch {
            Value::Object(map) => {
                let nested = if map.contains_key("allOf") {
                    merge_all_of(branch)?
                } else {
                    branch.clone()
                };
                if let Value::Object(nested) = nested {
                    merge_keywords(&mut acc, &nested)?;
                }
            }
            Value::Bool(true) => {}
            _ => return Err(MergeError::new("allOf")),
        }
    }

    Ok(Value::Object(acc))
}

fn merge_keywords(acc: &mut Map<String, Value>, other: &Map<String, Value>) -> Result<(), MergeError> {
    for (key, right) in other {
        if !acc.contains_key(key) {
            acc.insert(key.clone(), right.clone());
            continue;
        }
        let left = &acc[key];
        if left == right {
            continue;
        }

        let merged = match key.as_str() {
            "type" => intersect_types(left, right)?,
            "required" => match (left, right) {
                (Value::Array(l), Value::Array(r)) => Value::Array(union(l, r)),
                _ => return Err(MergeError::new(key.as_str())),
            },
            "enum" => intersect_enum(left, right)?,
            "properties" | "patternProperties" | "definitions" | "$defs" => {
                merge_schema_maps(left, right, key)?
            }
            "items" | "additionalItems" | "additionalProperties" | "propertyNames" | "contains" => {
                merge_subschemas(left, right, key)?
            }
            "dependencies" => merge_dependencies(left, right)?,
            "minimum" | "exclusiveMinimum" | "minLength" | "minItems" | "minProperties" => {
                pick_number(left, right, key, f64::max)?
            }
            "maximum" | "exclusiveMaximum" | "maxLength" | "maxItems" | "maxProperties" => {
                pick_number(left, right, key, f64::min)?
            }
            "uniqueItems" => Value::Bool(left.as_bool() == Some(true) || right.as_bool() == Some(true)),
            "multipleOf" => multiple_of(left, right)?,
            "pattern" => match (left.as_str(), right.as_str()) {
                (Some(l), Some(r)) => Value::String(format!("(?={})(?={})", l, r)),
                _ => return Err(MergeError::new(key.as_str())),
            },
            "title" | "description" | "default" | "examples" | "$comment" | "$id" | "$schema"
            | "readOnly" | "writeOnly" => left.clone(),
            _ => return Err(MergeError::new(key.as_str())),
        };
        acc.insert(key.clone(), merged);
    }
    Ok(())
}

fn merge_subschemas(left: &Value, right: &Value, keyword: &str) -> Result<Value, MergeError> {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut acc = l.clone();
            merge_keywords(&mut acc, r)?;
            Ok(Value::Object(acc))
        }
        (Value::Bool(false), _) | (_, Value::Bool(false)) => Ok(Value::Bool(false)),
        (Value::Bool(true), other) | (other, Value::Bool(true)) => Ok(other.clone()),
        _ => Err(MergeError::new(keyword)),
    }
}

fn merge_schema_maps(left: &Value, right: &Value, keyword: &str) -> Result<Value, MergeError> {
    let (Some(l), Some(r)) = (left.as_object(), right.as_object()) else {
        return Err(MergeError::new(keyword));
    };
    let mut acc = l.clone();
    for (name, right_schema) in r {
        let merged = match acc.get(name) {
            Some(left_schema) => {
                merge_subschemas(left_schema, right_schema, &format!("{}.{}", keyword, name))?
            }
            None => right_schema.clone(),
        };
        acc.insert(name.clone(), merged);
    }
    Ok(Value::Object(acc))
}

fn merge_dependencies(left: &Value, right: &Value) -> Result<Value, MergeError> {
    let (Some(l), Some(r)) = (left.as_object(), right.as_object()) else {
        return Err(MergeError::new("dependencies"));
    };
    let mut acc = l.clone();
    for (name, right_dep) in r {
        let merged = match (acc.get(name), right_dep) {
            (None, _) => right_dep.clone(),
            (Some(Value::Array(a)), Value::Array(b)) => Value::Array(union(a, b)),
            (Some(a), b) => merge_subschemas(a, b, "dependencies")?,
        };
        acc.insert(name.clone(), merged);
    }
    Ok(Value::Object(acc))
}

fn type_list(value: &Value) -> Option<Vec<&str>> {
    match value {
        Value::String(t) => Some(vec![t.as_str()]),
        Value::Array(types) => types.iter().map(Value::as_str).collect(),
        _ => None,
    }
}

fn intersect_types(left: &Value, right: &Value) -> Result<Value, MergeError> {
    let (Some(l), Some(r)) = (type_list(left), type_list(right)) else {
        return Err(MergeError::new("type"));
    };

    let mut common: Vec<&str> = Vec::new();
    for t in &l {
        let matched = if r.contains(t) {
            Some(*t)
        } else if *t == "number" && r.contains(&"integer") {
            Some("integer")
        } else if *t == "integer" && r.contains(&"number") {
            Some("integer")
        } else {
            None
        };
        if let Some(m) = matched {
            if !common.contains(&m) {
                common.push(m);
            }
        }
    }

    match common.as_slice() {
        [] => Err(MergeError::new("type")),
        [single] => Ok(Value::String(single.to_string())),
        many => Ok(Value::Array(
            many.iter().map(|t| Value::String(t.to_string())).collect(),
        )),
    }
}

fn intersect_enum(left: &Value, right: &Value) -> Result<Value, MergeError> {
    let (Some(l), Some(r)) = (left.as_array(), right.as_array()) else {
        return Err(MergeError::new("enum"));
    };
    let common: Vec<Value> = l.iter().filter(|v| r.contains(v)).cloned().collect();
    if common.is_empty() {
        return Err(MergeError::new("enum"));
    }
    Ok(Value::Array(common))
}

fn pick_number(
    left: &Value,
    right: &Value,
    keyword: &str,
    pick: fn(f64, f64) -> f64,
) -> Result<Value, MergeError> {
    let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
        return Err(MergeError::new(keyword));
    };
    Ok(if pick(l, r) == l {
        left.clone()
    } else {
        right.clone()
    })
}

fn multiple_of(left: &Value, right: &Value) -> Result<Value, MergeError> {
    match (left.as_u64(), right.as_u64()) {
        (Some(l), Some(r)) if l > 0 && r > 0 => Ok(Value::from(l / gcd(l, r) * r)),
        _ => Err(MergeError::new("multipleOf")),
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Union of two lists, keeping first-seen order and dropping duplicates.
pub(crate) fn union(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(left.len() + right.len());
    for value in left.iter().chain(right) {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_objects_recursive() {
        let left = json!({ "a": { "b": 1, "c": 2 }, "keep": true });
        let right = json!({ "a": { "c": 3 }, "new": "x" });
        assert_eq!(
            merge_objects(&left, &right, false),
            json!({ "a": { "b": 1, "c": 3 }, "keep": true, "new": "x" })
        );
    }

    #[test]
    fn merge_objects_concat_arrays() {
        let left = json!({ "__errors": ["one"], "list": [1] });
        let right = json!({ "__errors": ["two"], "list": [2] });
        assert_eq!(
            merge_objects(&left, &right, true),
            json!({ "__errors": ["one", "two"], "list": [1, 2] })
        );
        assert_eq!(
            merge_objects(&left, &right, false),
            json!({ "__errors": ["two"], "list": [2] })
        );
    }

    #[test]
    fn merge_schemas_unions_required() {
        let left = json!({ "type": "object", "required": ["a", "b"] });
        let right = json!({ "required": ["b", "c"], "properties": { "c": {} } });
        assert_eq!(
            merge_schemas(&left, &right),
            json!({
                "type": "object",
                "required": ["a", "b", "c"],
                "properties": { "c": {} }
            })
        );
    }

    #[test]
    fn merge_schemas_replaces_required_for_non_objects() {
        let left = json!({ "required": ["a"] });
        let right = json!({ "required": ["b"] });
        assert_eq!(merge_schemas(&left, &right), json!({ "required": ["b"] }));
    }

    #[test]
    fn all_of_intersects_types_and_unions_required() {
        let schema = json!({
            "title": "outer",
            "allOf": [
                { "type": ["string", "number"], "required": ["a"] },
                { "type": ["integer", "boolean"], "required": ["b", "a"] }
            ]
        });
        assert_eq!(
            merge_all_of(&schema).unwrap(),
            json!({ "title": "outer", "type": "integer", "required": ["a", "b"] })
        );
    }

    #[test]
    fn all_of_merges_properties_and_bounds() {
        let schema = json!({
            "allOf": [
                { "properties": { "n": { "type": "number", "minimum": 1, "maximum": 10 } } },
                { "properties": { "n": { "minimum": 3, "maximum": 20 }, "s": { "type": "string" } } }
            ]
        });
        assert_eq!(
            merge_all_of(&schema).unwrap(),
            json!({
                "properties": {
                    "n": { "type": "number", "minimum": 3, "maximum": 10 },
                    "s": { "type": "string" }
                }
            })
        );
    }

    #[test]
    fn all_of_conflicting_types() {
        let schema = json!({ "allOf": [{ "type": "string" }, { "type": "boolean" }] });
        assert_eq!(merge_all_of(&schema), Err(MergeError::new("type")));
    }

    #[test]
    fn all_of_conflicting_const() {
        let schema = json!({ "allOf": [{ "const": 1 }, { "const": 2 }] });
        assert_eq!(merge_all_of(&schema), Err(MergeError::new("const")));
    }

    #[test]
    fn all_of_multiple_of_and_pattern() {
        let schema = json!({
            "allOf": [
                { "multipleOf": 4, "pattern": "a" },
                { "multipleOf": 6, "pattern": "b" }
            ]
        });
        assert_eq!(
            merge_all_of(&schema).unwrap(),
            json!({ "multipleOf": 12, "pattern": "(?=a)(?=b)" })
        );
    }

    #[test]
    fn all_of_additional_properties_false_wins() {
        let schema = json!({
            "allOf": [
                { "additionalProperties": { "type": "string" } },
                { "additionalProperties": false }
            ]
        });
        assert_eq!(
            merge_all_of(&schema).unwrap(),
            json!({ "additionalProperties": false })
        );
    }
}
