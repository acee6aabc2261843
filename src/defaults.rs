//! Default form data computation.
//!
//! Defaults flow down the schema tree: an ancestor's `default` populates the
//! leaves a descendant doesn't define, a node's own `default` replaces what it
//! inherited, and existing form data wins over both when the result is
//! merged.

use serde_json::{json, Map, Value};

use crate::classify::{alternatives, get_schema_type, is_fixed_items, is_multi_select};
use crate::error::ResolveError;
use crate::merge::merge_objects;
use crate::resolver::{
    find_schema_definition, get_matching_option, resolve_dependencies, retrieve_schema,
    SchemaContext,
};

const NO_SCHEMA: &Value = &Value::Null;

/// Compute the default value for `schema`.
///
/// `parent_defaults` is whatever an ancestor's `default` provides for this
/// node. `None` means undefined; object members that compute to undefined
/// are left out unless `include_undefined` is set, in which case they are
/// materialised as `null`.
///
/// # Errors
///
/// Returns `ResolveError` if a `$ref` or dependency cannot be resolved.
pub fn compute_defaults(
    schema: &Value,
    parent_defaults: Option<&Value>,
    ctx: &SchemaContext<'_>,
    form_data: Option<&Value>,
    include_undefined: bool,
) -> Result<Option<Value>, ResolveError> {
    let own_default = schema.get("default");
    let mut defaults = match (parent_defaults, own_default) {
        (Some(parent @ Value::Object(_)), Some(own @ Value::Object(_))) => {
            Some(merge_objects(parent, own, false))
        }
        (_, Some(own)) => Some(own.clone()),
        (parent, None) => parent.cloned(),
    };

    let mut selected = None;
    if own_default.is_none() {
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            let definition = find_schema_definition(reference, ctx.root_schema)?;
            return compute_defaults(
                &definition,
                defaults.as_ref(),
                ctx,
                form_data,
                include_undefined,
            );
        }

        if schema.get("dependencies").is_some() {
            let resolved = resolve_dependencies(schema, ctx, form_data.unwrap_or(&Value::Null))?;
            return compute_defaults(
                &resolved,
                defaults.as_ref(),
                ctx,
                form_data,
                include_undefined,
            );
        }

        if is_fixed_items(schema) {
            defaults = Some(fixed_item_defaults(
                schema,
                parent_defaults,
                ctx,
                form_data,
                include_undefined,
            )?);
        } else if let Some(branches) = alternatives(schema).filter(|b| !b.is_empty()) {
            let index = get_matching_option(form_data, branches, ctx);
            selected = branches.get(index);
        }
    }

    let schema = selected.unwrap_or(schema);
    if defaults.is_none() {
        defaults = schema.get("default").cloned();
    }

    match get_schema_type(schema).as_deref() {
        Some("object") => {
            object_defaults(schema, defaults.as_ref(), ctx, form_data, include_undefined).map(Some)
        }
        Some("array") => array_defaults(schema, defaults, ctx, form_data),
        _ => Ok(defaults),
    }
}

fn fixed_item_defaults(
    schema: &Value,
    parent_defaults: Option<&Value>,
    ctx: &SchemaContext<'_>,
    form_data: Option<&Value>,
    include_undefined: bool,
) -> Result<Value, ResolveError> {
    let items = schema
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut out = Vec::with_capacity(items.len());
    for (idx, item_schema) in items.iter().enumerate() {
        let inherited = parent_defaults.and_then(|d| d.as_array()).and_then(|d| d.get(idx));
        let data = form_data.and_then(|d| d.as_array()).and_then(|d| d.get(idx));
        let computed = compute_defaults(item_schema, inherited, ctx, data, include_undefined)?;
        out.push(computed.unwrap_or(Value::Null));
    }
    Ok(Value::Array(out))
}

fn object_defaults(
    schema: &Value,
    defaults: Option<&Value>,
    ctx: &SchemaContext<'_>,
    form_data: Option<&Value>,
    include_undefined: bool,
) -> Result<Value, ResolveError> {
    let mut out = Map::new();
    let Some(Value::Object(properties)) = schema.get("properties") else {
        return Ok(Value::Object(out));
    };

    for (key, property) in properties {
        let computed = compute_defaults(
            property,
            defaults.and_then(|d| d.get(key)),
            ctx,
            form_data.and_then(|d| d.get(key)),
            include_undefined,
        )?;
        match computed {
            Some(value) => {
                out.insert(key.clone(), value);
            }
            None if include_undefined => {
                out.insert(key.clone(), Value::Null);
            }
            None => {}
        }
    }

    Ok(Value::Object(out))
}

fn array_defaults(
    schema: &Value,
    mut defaults: Option<Value>,
    ctx: &SchemaContext<'_>,
    form_data: Option<&Value>,
) -> Result<Option<Value>, ResolveError> {
    if let Some(Value::Array(current)) = &defaults {
        let mut mapped = Vec::with_capacity(current.len());
        for (idx, item) in current.iter().enumerate() {
            let computed = compute_defaults(item_schema(schema, idx), Some(item), ctx, None, false)?;
            mapped.push(computed.unwrap_or(Value::Null));
        }
        defaults = Some(Value::Array(mapped));
    }

    if let Some(Value::Array(data)) = form_data {
        let mut mapped = Vec::with_capacity(data.len());
        for (idx, item) in data.iter().enumerate() {
            let inherited = defaults.as_ref().and_then(|d| d.get(idx));
            let computed =
                compute_defaults(item_schema(schema, idx), inherited, ctx, Some(item), false)?;
            mapped.push(computed.unwrap_or(Value::Null));
        }
        defaults = Some(Value::Array(mapped));
    }

    let min_items = schema
        .get("minItems")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    if min_items == 0 {
        return Ok(defaults);
    }

    if is_multi_select(schema, ctx) {
        return Ok(Some(defaults.unwrap_or_else(|| json!([]))));
    }

    let mut entries = match defaults {
        Some(Value::Array(entries)) => entries,
        Some(other) => return Ok(Some(other)),
        None => Vec::new(),
    };
    if min_items > entries.len() {
        let filler_schema = match schema.get("items") {
            Some(Value::Array(_)) => schema.get("additionalItems"),
            items => items,
        };
        let filler = match filler_schema {
            Some(filler_schema) => compute_defaults(filler_schema, None, ctx, None, false)?,
            None => None,
        }
        .unwrap_or(Value::Null);
        entries.resize(min_items, filler);
    }

    Ok(Some(Value::Array(entries)))
}

/// Schema governing array slot `idx`: the tuple entry, `additionalItems`
/// past the tuple, or the single `items` schema.
fn item_schema(schema: &Value, idx: usize) -> &Value {
    match schema.get("items") {
        Some(Value::Array(items)) => items
            .get(idx)
            .or_else(|| schema.get("additionalItems"))
            .unwrap_or(NO_SCHEMA),
        Some(items) => items,
        None => NO_SCHEMA,
    }
}

/// Compute the form data a form starts from.
///
/// The schema is resolved against the form data, its defaults computed,
/// and then combined with `form_data`:
///
/// - undefined or `null` form data yields the defaults,
/// - objects and arrays are merged with
///   [`merge_defaults_with_form_data`],
/// - any other scalar is returned as is, so `0`, `false` and `""` survive.
///
/// Undefined defaults are returned as `null`.
///
/// # Errors
///
/// Returns `ResolveError::InvalidSchema` if `schema` is not an object, or
/// any error raised while resolving it.
pub fn get_default_form_state(
    schema: &Value,
    form_data: Option<&Value>,
    ctx: &SchemaContext<'_>,
    include_undefined: bool,
) -> Result<Value, ResolveError> {
    if !schema.is_object() {
        return Err(ResolveError::InvalidSchema {
            message: format!("expected an object, got {}", schema),
        });
    }

    let resolved = retrieve_schema(schema, ctx, form_data.unwrap_or(&Value::Null))?;
    let defaults = compute_defaults(
        &resolved,
        schema.get("default"),
        ctx,
        form_data,
        include_undefined,
    )?;

    Ok(match form_data {
        None | Some(Value::Null) => defaults.unwrap_or(Value::Null),
        Some(data @ (Value::Object(_) | Value::Array(_))) => {
            merge_defaults_with_form_data(defaults.as_ref(), data)
        }
        Some(data) => data.clone(),
    })
}

/// Overlay form data on computed defaults.
///
/// Arrays take the form data's length, merging per slot where a default
/// exists. Objects keep default-only keys and merge shared ones. For
/// scalars the form data wins.
pub fn merge_defaults_with_form_data(defaults: Option<&Value>, form_data: &Value) -> Value {
    match form_data {
        Value::Array(items) => {
            let defaults = defaults.and_then(Value::as_array);
            Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| match defaults.and_then(|d| d.get(idx)) {
                        Some(default) => merge_defaults_with_form_data(Some(default), item),
                        None => item.clone(),
                    })
                    .collect(),
            )
        }
        Value::Object(data) => {
            let mut out = defaults
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            for (key, value) in data {
                let merged = merge_defaults_with_form_data(defaults.and_then(|d| d.get(key)), value);
                out.insert(key.clone(), merged);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}
