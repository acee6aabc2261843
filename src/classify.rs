//! Schema classification predicates used by resolution, defaults and widget selection.

use serde::Serialize;
use serde_json::Value;

use crate::resolver::{retrieve_schema, SchemaContext};

/// Guess the JSON Schema type of a runtime value.
pub fn guess_type(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Object(_) => "object",
    }
}

/// Determine the effective type of a schema.
///
/// Falls back to `const`, `enum`, and `properties`/`additionalProperties`
/// when `type` is absent. A nullable pair such as `["string", "null"]`
/// yields the non-null member. Other type lists have no single type.
pub fn get_schema_type(schema: &Value) -> Option<String> {
    match schema.get("type") {
        Some(Value::String(t)) => Some(t.clone()),
        Some(Value::Array(types)) => {
            if types.len() == 2 && types.iter().any(|t| t == "null") {
                types
                    .iter()
                    .find(|t| *t != "null")
                    .and_then(Value::as_str)
                    .map(String::from)
            } else {
                None
            }
        }
        Some(_) => None,
        None => {
            if let Some(constant) = schema.get("const") {
                Some(guess_type(constant).to_string())
            } else if schema.get("enum").is_some() {
                Some("string".to_string())
            } else if schema.get("properties").is_some()
                || schema
                    .get("additionalProperties")
                    .is_some_and(|ap| ap != &Value::Bool(false))
            {
                Some("object".to_string())
            } else {
                None
            }
        }
    }
}

/// True when the schema pins exactly one value.
pub fn is_constant(schema: &Value) -> bool {
    let single_enum = schema
        .get("enum")
        .and_then(Value::as_array)
        .is_some_and(|values| values.len() == 1);
    single_enum || schema.get("const").is_some()
}

/// The single value pinned by a constant schema.
pub fn to_constant(schema: &Value) -> Option<Value> {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        if values.len() == 1 {
            return values.first().cloned();
        }
    }
    schema.get("const").cloned()
}

/// True when the schema renders as a choice between fixed values.
///
/// Resolution failures are treated as "not a select".
pub fn is_select(schema: &Value, ctx: &SchemaContext<'_>) -> bool {
    let schema = match retrieve_schema(schema, ctx, &Value::Null) {
        Ok(schema) => schema,
        Err(e) => {
            log::debug!("is_select: {}", e);
            return false;
        }
    };

    if schema.get("enum").is_some_and(Value::is_array) {
        return true;
    }

    match alternatives(&schema) {
        Some(branches) => branches.iter().all(is_constant),
        None => false,
    }
}

/// True for arrays of unique values drawn from a select.
pub fn is_multi_select(schema: &Value, ctx: &SchemaContext<'_>) -> bool {
    let unique = schema
        .get("uniqueItems")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    match schema.get("items") {
        Some(items) if unique => is_select(items, ctx),
        _ => false,
    }
}

/// True for arrays that hold uploaded files.
pub fn is_files_array(schema: &Value, ui_schema: &Value, ctx: &SchemaContext<'_>) -> bool {
    if ui_schema.get("ui:widget").and_then(Value::as_str) == Some("files") {
        return true;
    }

    let Some(items) = schema.get("items") else {
        return false;
    };

    match retrieve_schema(items, ctx, &Value::Null) {
        Ok(items) => {
            items.get("type").and_then(Value::as_str) == Some("string")
                && items.get("format").and_then(Value::as_str) == Some("data-url")
        }
        Err(e) => {
            log::debug!("is_files_array: {}", e);
            false
        }
    }
}

/// True when `items` is a non-empty tuple of object schemas.
pub fn is_fixed_items(schema: &Value) -> bool {
    schema
        .get("items")
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty() && items.iter().all(Value::is_object))
}

/// True when a fixed-items array accepts entries past the tuple.
pub fn allow_additional_items(schema: &Value) -> bool {
    match schema.get("additionalItems") {
        Some(Value::Bool(true)) => {
            log::warn!("additionalItems=true is currently not supported");
            false
        }
        Some(value) => value.is_object(),
        None => false,
    }
}

/// One choice of a select widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// List the choices offered by an `enum` or by constant `oneOf`/`anyOf` branches.
pub fn options_list(schema: &Value) -> Vec<SelectOption> {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        let names = schema.get("enumNames").and_then(Value::as_array);
        return values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let label = names
                    .and_then(|names| names.get(i))
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| display_value(value));
                SelectOption {
                    label,
                    value: value.clone(),
                    schema: None,
                }
            })
            .collect();
    }

    alternatives(schema)
        .map(|branches| {
            branches
                .iter()
                .map(|branch| {
                    let value = to_constant(branch).unwrap_or(Value::Null);
                    let label = branch
                        .get("title")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or_else(|| display_value(&value));
                    SelectOption {
                        label,
                        value,
                        schema: Some(branch.clone()),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `oneOf` branches, or `anyOf` when there is no `oneOf`.
pub(crate) fn alternatives(schema: &Value) -> Option<&Vec<Value>> {
    schema
        .get("oneOf")
        .or_else(|| schema.get("anyOf"))
        .and_then(Value::as_array)
}

pub(crate) fn is_object_schema(schema: &Value) -> bool {
    get_schema_type(schema).as_deref() == Some("object")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
