//! Schema resolution - eliminates `$ref`, `allOf`, `dependencies` and dynamic
//! `additionalProperties` indirection for a given form-data context.

use serde_json::{json, Map, Value};

use crate::classify::guess_type;
use crate::error::ResolveError;
use crate::merge::{merge_all_of, merge_schemas, union};
use crate::types::ADDITIONAL_PROPERTY_FLAG;
use crate::validator::FormValidator;

/// Everything a resolution pass needs besides the node being resolved.
///
/// The validator owns any compiled-schema cache, so a context built from
/// one validator shares that cache across every call of a form session.
#[derive(Clone, Copy)]
pub struct SchemaContext<'a> {
    /// Target of every `$ref`.
    pub root_schema: &'a Value,
    /// Used to match `oneOf`/`anyOf` branches against form data.
    pub validator: &'a dyn FormValidator,
}

impl<'a> SchemaContext<'a> {
    pub fn new(root_schema: &'a Value, validator: &'a dyn FormValidator) -> Self {
        Self {
            root_schema,
            validator,
        }
    }
}

impl std::fmt::Debug for SchemaContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaContext")
            .field("root_schema", self.root_schema)
            .finish_non_exhaustive()
    }
}

/// Look up the node a URI-fragment `$ref` points at.
///
/// Follows chains of `$ref`s until a concrete node is reached.
///
/// # Errors
///
/// Returns `ResolveError::DefinitionNotFound` when the reference is not of
/// the `#...` form or does not point at anything, and
/// `ResolveError::CircularReference` when a chain loops back on itself.
pub fn find_schema_definition(reference: &str, root_schema: &Value) -> Result<Value, ResolveError> {
    let mut visited: Vec<String> = Vec::new();
    let mut current_ref = reference.to_string();

    loop {
        if visited.contains(&current_ref) {
            return Err(ResolveError::CircularReference {
                reference: current_ref,
            });
        }

        let Some(fragment) = current_ref.strip_prefix('#') else {
            return Err(ResolveError::DefinitionNotFound {
                reference: current_ref,
            });
        };

        let pointer = decode_uri_component(fragment);
        let Some(found) = root_schema.pointer(&pointer) else {
            return Err(ResolveError::DefinitionNotFound {
                reference: current_ref,
            });
        };

        match found.get("$ref").and_then(Value::as_str) {
            Some(next) => {
                let next = next.to_string();
                visited.push(std::mem::replace(&mut current_ref, next));
            }
            None => return Ok(found.clone()),
        }
    }
}

/// Resolve a schema node into a concrete schema for the given form data.
///
/// Non-object schemas resolve to `{}`.
///
/// # Errors
///
/// Returns `ResolveError` if a `$ref` cannot be followed or a dependency
/// declares a malformed `oneOf`. Incompatible `allOf` branches are not an
/// error: the merge is abandoned with a warning and `allOf` is dropped.
pub fn retrieve_schema(
    schema: &Value,
    ctx: &SchemaContext<'_>,
    form_data: &Value,
) -> Result<Value, ResolveError> {
    if !schema.is_object() {
        return Ok(json!({}));
    }

    let mut resolved = resolve_schema(schema, ctx, form_data)?;

    if schema.get("allOf").is_some() {
        match merge_all_of(&resolved) {
            Ok(merged) => resolved = merged,
            Err(e) => {
                log::warn!("{}", e);
                if let Value::Object(map) = &mut resolved {
                    map.remove("allOf");
                }
                return Ok(resolved);
            }
        }
    }

    let has_additional_properties = resolved
        .get("additionalProperties")
        .is_some_and(|ap| ap != &Value::Bool(false));
    if has_additional_properties {
        return stub_existing_additional_properties(&resolved, ctx, form_data);
    }

    Ok(resolved)
}

fn resolve_schema(
    schema: &Value,
    ctx: &SchemaContext<'_>,
    form_data: &Value,
) -> Result<Value, ResolveError> {
    if schema.get("$ref").is_some() {
        return resolve_reference(schema, ctx, form_data);
    }

    if schema.get("dependencies").is_some() {
        let resolved = resolve_dependencies(schema, ctx, form_data)?;
        return retrieve_schema(&resolved, ctx, form_data);
    }

    if let Some(Value::Array(branches)) = schema.get("allOf") {
        let resolved_branches = branches
            .iter()
            .map(|branch| retrieve_schema(branch, ctx, form_data))
            .collect::<Result<Vec<_>, _>>()?;
        let mut resolved = schema.clone();
        resolved["allOf"] = Value::Array(resolved_branches);
        return Ok(resolved);
    }

    Ok(schema.clone())
}

/// Replace `$ref` with the referenced definition. Sibling keys of the
/// `$ref` override the definition's keys.
fn resolve_reference(
    schema: &Value,
    ctx: &SchemaContext<'_>,
    form_data: &Value,
) -> Result<Value, ResolveError> {
    let Value::Object(local) = schema else {
        return Ok(json!({}));
    };
    let reference = local
        .get("$ref")
        .and_then(Value::as_str)
        .ok_or_else(|| ResolveError::InvalidSchema {
            message: "$ref must be a string".to_string(),
        })?;

    let mut merged = match find_schema_definition(reference, ctx.root_schema)? {
        Value::Object(definition) => definition,
        _ => Map::new(),
    };
    for (key, value) in local {
        if key != "$ref" {
            merged.insert(key.clone(), value.clone());
        }
    }

    retrieve_schema(&Value::Object(merged), ctx, form_data)
}

/// Apply every dependency whose trigger property is present in form data.
///
/// Dependencies are applied one at a time; each sees the schema produced by
/// the previous one.
pub fn resolve_dependencies(
    schema: &Value,
    ctx: &SchemaContext<'_>,
    form_data: &Value,
) -> Result<Value, ResolveError> {
    let mut resolved = schema.clone();
    let dependencies = match &mut resolved {
        Value::Object(map) => map.remove("dependencies"),
        _ => None,
    };
    let Some(Value::Object(dependencies)) = dependencies else {
        return Ok(resolved);
    };

    for (key, dependency) in &dependencies {
        if form_data.get(key).is_none() {
            continue;
        }
        if let Some(Value::Object(properties)) = resolved.get("properties") {
            if !properties.contains_key(key) {
                continue;
            }
        }

        resolved = match dependency {
            Value::Array(additionally_required) => {
                with_dependent_properties(&resolved, additionally_required)
            }
            Value::Object(_) => with_dependent_schema(&resolved, ctx, form_data, key, dependency)?,
            _ => resolved,
        };
    }

    Ok(resolved)
}

fn with_dependent_properties(schema: &Value, additionally_required: &[Value]) -> Value {
    let required = match schema.get("required") {
        Some(Value::Array(existing)) => union(existing, additionally_required),
        _ => additionally_required.to_vec(),
    };
    let mut out = schema.clone();
    out["required"] = Value::Array(required);
    out
}

fn with_dependent_schema(
    schema: &Value,
    ctx: &SchemaContext<'_>,
    form_data: &Value,
    dependency_key: &str,
    dependency: &Value,
) -> Result<Value, ResolveError> {
    let mut dependent = retrieve_schema(dependency, ctx, form_data)?;
    let one_of = match &mut dependent {
        Value::Object(map) => map.remove("oneOf"),
        _ => None,
    };
    let merged = merge_schemas(schema, &dependent);

    let branches = match one_of {
        None => return Ok(merged),
        Some(Value::Array(branches)) => branches,
        Some(other) => {
            return Err(ResolveError::InvalidSchema {
                message: format!(
                    "oneOf in dependency '{}' must be an array, got {}",
                    dependency_key,
                    crate::types::json_type_name(&other)
                ),
            })
        }
    };

    let resolved_branches = branches
        .iter()
        .map(|branch| {
            if branch.get("$ref").is_some() {
                resolve_reference(branch, ctx, form_data)
            } else {
                Ok(branch.clone())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    with_exactly_one_subschema(merged, ctx, form_data, dependency_key, &resolved_branches)
}

fn with_exactly_one_subschema(
    schema: Value,
    ctx: &SchemaContext<'_>,
    form_data: &Value,
    dependency_key: &str,
    branches: &[Value],
) -> Result<Value, ResolveError> {
    let valid: Vec<&Value> = branches
        .iter()
        .filter(|branch| {
            let Some(condition) = branch
                .get("properties")
                .and_then(|props| props.get(dependency_key))
            else {
                return false;
            };
            let condition_schema = json!({
                "type": "object",
                "properties": { dependency_key: condition }
            });
            ctx.validator
                .is_valid(&condition_schema, form_data, ctx.root_schema)
        })
        .collect();

    let [branch] = valid.as_slice() else {
        log::warn!(
            "ignoring oneOf in dependencies because there isn't exactly one subschema that is valid ({} matched for '{}')",
            valid.len(),
            dependency_key
        );
        return Ok(schema);
    };

    let mut dependent = (*branch).clone();
    if let Some(Value::Object(properties)) = dependent.get_mut("properties") {
        properties.remove(dependency_key);
    }
    let dependent = retrieve_schema(&dependent, ctx, form_data)?;
    Ok(merge_schemas(&schema, &dependent))
}

/// Give every form-data key missing from `properties` a schema derived from
/// `additionalProperties`, flagged with [`ADDITIONAL_PROPERTY_FLAG`].
fn stub_existing_additional_properties(
    schema: &Value,
    ctx: &SchemaContext<'_>,
    form_data: &Value,
) -> Result<Value, ResolveError> {
    let mut out = schema.clone();
    let additional = schema
        .get("additionalProperties")
        .cloned()
        .unwrap_or(Value::Bool(true));
    let mut properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if let Some(data) = form_data.as_object() {
        for (key, value) in data {
            if properties.contains_key(key) {
                continue;
            }

            let mut stub = if let Some(reference) = additional.get("$ref") {
                retrieve_schema(&json!({ "$ref": reference }), ctx, form_data)?
            } else if additional.get("type").is_some() {
                additional.clone()
            } else {
                json!({ "type": guess_type(value) })
            };
            stub[ADDITIONAL_PROPERTY_FLAG] = Value::Bool(true);
            properties.insert(key.clone(), stub);
        }
    }

    out["properties"] = Value::Object(properties);
    Ok(out)
}

/// Index of the first `oneOf`/`anyOf` branch that matches the form data.
///
/// Branches declaring `properties` match when the data is valid and carries at
/// least one of those properties; the branch's own `required` is ignored.
/// Falls back to `0` when nothing matches or there is no data.
pub fn get_matching_option(
    form_data: Option<&Value>,
    options: &[Value],
    ctx: &SchemaContext<'_>,
) -> usize {
    let Some(data) = form_data else {
        return 0;
    };

    for (i, option) in options.iter().enumerate() {
        let matched = match option.get("properties").and_then(Value::as_object) {
            Some(properties) => {
                let requires_any_of: Vec<Value> = properties
                    .keys()
                    .map(|key| json!({ "required": [key] }))
                    .collect();
                let mut augmented = option.clone();
                if option.get("anyOf").is_some() {
                    let mut all_of = option
                        .get("allOf")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    all_of.push(json!({ "anyOf": requires_any_of }));
                    augmented["allOf"] = Value::Array(all_of);
                } else {
                    augmented["anyOf"] = Value::Array(requires_any_of);
                }
                if let Value::Object(map) = &mut augmented {
                    map.remove("required");
                }
                ctx.validator.is_valid(&augmented, data, ctx.root_schema)
            }
            None => ctx.validator.is_valid(option, data, ctx.root_schema),
        };
        if matched {
            return i;
        }
    }

    0
}

/// Percent-decode a URI fragment.
fn decode_uri_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}
