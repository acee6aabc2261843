//! Identifier and path trees for rendered fields.
//!
//! `idSchema` gives every field a DOM-safe id (`root_address_city`);
//! `pathSchema` gives it a dotted name (`address.city`, `list.0`).

use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::resolver::{retrieve_schema, SchemaContext};
use crate::types::{ID_KEY, NAME_KEY, RJSF_ADDITIONAL_PROPERTIES_FLAG};

/// Schemas carrying any of these are resolved before being walked.
fn needs_resolution(schema: &Value) -> bool {
    ["$ref", "dependencies", "allOf"]
        .iter()
        .any(|key| schema.get(key).is_some())
}

/// Build the id tree for `schema`.
///
/// `id` is the id of this node; `None` uses `id_prefix`. Child ids append
/// `_<property>`. Arrays contribute no layer of their own: the tree
/// continues with the item schema, unless that is a `$ref`.
///
/// # Errors
///
/// Returns `ResolveError` if a `$ref` or dependency cannot be resolved.
pub fn to_id_schema(
    schema: &Value,
    id: Option<&str>,
    ctx: &SchemaContext<'_>,
    form_data: Option<&Value>,
    id_prefix: &str,
) -> Result<Value, ResolveError> {
    if needs_resolution(schema) {
        let resolved = retrieve_schema(schema, ctx, form_data.unwrap_or(&Value::Null))?;
        return to_id_schema(&resolved, id, ctx, form_data, id_prefix);
    }

    if let Some(items) = schema.get("items") {
        if items.get("$ref").is_none() {
            return to_id_schema(items, id, ctx, form_data, id_prefix);
        }
    }

    let node_id = id.unwrap_or(id_prefix);
    let mut id_schema = Map::new();
    id_schema.insert(ID_KEY.to_string(), Value::String(node_id.to_string()));

    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Ok(Value::Object(id_schema));
    }

    if let Some(Value::Object(properties)) = schema.get("properties") {
        for (name, field) in properties {
            let field_id = format!("{}_{}", node_id, name);
            let child = to_id_schema(
                field,
                Some(&field_id),
                ctx,
                form_data.and_then(|d| d.get(name)),
                id_prefix,
            )?;
            id_schema.insert(name.clone(), child);
        }
    }

    Ok(Value::Object(id_schema))
}

/// Build the path tree for `schema` and `form_data`.
///
/// Array nodes get one child per element actually present in the form
/// data, keyed by index. Nodes whose schema accepts dynamic keys are
/// flagged with `__rjsf_additionalProperties`.
///
/// # Errors
///
/// Returns `ResolveError` if a `$ref` or dependency cannot be resolved.
pub fn to_path_schema(
    schema: &Value,
    name: &str,
    ctx: &SchemaContext<'_>,
    form_data: Option<&Value>,
) -> Result<Value, ResolveError> {
    if needs_resolution(schema) {
        let resolved = retrieve_schema(schema, ctx, form_data.unwrap_or(&Value::Null))?;
        return to_path_schema(&resolved, name, ctx, form_data);
    }

    let mut path_schema = Map::new();
    path_schema.insert(
        NAME_KEY.to_string(),
        Value::String(name.strip_prefix('.').unwrap_or(name).to_string()),
    );

    if schema
        .get("additionalProperties")
        .is_some_and(|ap| ap != &Value::Bool(false))
    {
        path_schema.insert(
            RJSF_ADDITIONAL_PROPERTIES_FLAG.to_string(),
            Value::Bool(true),
        );
    }

    match (schema.get("items"), form_data) {
        (Some(items), Some(Value::Array(elements))) => {
            for (i, element) in elements.iter().enumerate() {
                let item_schema = match items {
                    Value::Array(tuple) => tuple
                        .get(i)
                        .or_else(|| schema.get("additionalItems"))
                        .unwrap_or(&Value::Null),
                    single => single,
                };
                let child =
                    to_path_schema(item_schema, &format!("{}.{}", name, i), ctx, Some(element))?;
                path_schema.insert(i.to_string(), child);
            }
        }
        _ => {
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (property, field) in properties {
                    let child = to_path_schema(
                        field,
                        &format!("{}.{}", name, property),
                        ctx,
                        form_data.and_then(|d| d.get(property)),
                    )?;
                    path_schema.insert(property.clone(), child);
                }
            }
        }
    }

    Ok(Value::Object(path_schema))
}
