//! Form data validation and the validator collaborator contract.
//!
//! The core never depends on a validator's native error format: anything
//! implementing [`FormValidator`] reports [`FlatError`]s. The bundled
//! [`JsonSchemaValidator`] wraps the `jsonschema` crate (Draft 7) and
//! memoises compiled schemas for the lifetime of the instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use serde::Serialize;
use serde_json::Value;

use crate::defaults::get_default_form_state;
use crate::error::ResolveError;
use crate::error_schema::{to_error_schema, ErrorSchemaBuilder};
use crate::merge::merge_objects;
use crate::resolver::SchemaContext;
use crate::types::FlatError;

/// Key under which the root schema is embedded when validating a subschema.
pub const ROOT_SCHEMA_PREFIX: &str = "__rjsf_rootSchema";

/// Validates form data and reports errors in the uniform flat shape.
pub trait FormValidator {
    /// Validate `form_data` against `schema`, which is also the root for `$ref`s.
    fn validate(&self, form_data: &Value, schema: &Value) -> Vec<FlatError>;

    /// Whether `data` satisfies `schema`, a subschema of `root_schema`.
    ///
    /// Never fails: malformed schemas are reported as invalid.
    fn is_valid(&self, schema: &Value, data: &Value, root_schema: &Value) -> bool;
}

type FormatCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;
type Compiled = Result<Rc<jsonschema::Validator>, String>;

/// [`FormValidator`] backed by the `jsonschema` crate.
///
/// Construct one per form session. Compiled validators are cached by the
/// serialized schema they were built from; entries are never evicted.
#[derive(Default)]
pub struct JsonSchemaValidator {
    formats: Vec<(String, FormatCheck)>,
    compiled: RefCell<HashMap<String, Compiled>>,
}

impl JsonSchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom `format` check.
    ///
    /// Clears the compile cache, since cached validators lack the new format.
    pub fn with_format<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.push((name.into(), Arc::new(check)));
        self.compiled.get_mut().clear();
        self
    }

    /// Number of compiled schemas currently cached.
    pub fn cached_schemas(&self) -> usize {
        self.compiled.borrow().len()
    }

    fn compile(&self, schema: &Value) -> Compiled {
        let key = schema.to_string();
        if let Some(hit) = self.compiled.borrow().get(&key) {
            log::debug!("validator cache hit");
            return hit.clone();
        }

        log::debug!("compiling schema for validation");
        let mut options = jsonschema::options();
        options
            .with_draft(jsonschema::Draft::Draft7)
            .should_validate_formats(true);
        for (name, check) in &self.formats {
            let check = Arc::clone(check);
            options.with_format(name.clone(), move |value: &str| check(value));
        }
        let compiled = options
            .build(schema)
            .map(Rc::new)
            .map_err(|e| e.to_string());

        self.compiled.borrow_mut().insert(key, compiled.clone());
        compiled
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field(
                "formats",
                &self.formats.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("cached_schemas", &self.cached_schemas())
            .finish()
    }
}

impl FormValidator for JsonSchemaValidator {
    fn validate(&self, form_data: &Value, schema: &Value) -> Vec<FlatError> {
        match self.compile(schema) {
            Ok(validator) => validator
                .iter_errors(form_data)
                .map(|e| {
                    let mut property = pointer_to_property(&e.instance_path.to_string(), form_data);
                    if let ValidationErrorKind::Required { property: missing } = &e.kind {
                        if let Some(name) = missing.as_str() {
                            property.push('.');
                            property.push_str(name);
                        }
                    }
                    let schema_path = e.schema_path.to_string();
                    let keyword = schema_path.rsplit('/').next().unwrap_or_default();
                    FlatError::new(property, e.to_string()).with_name(keyword)
                })
                .collect(),
            Err(message) => {
                log::warn!("invalid schema: {}", message);
                vec![FlatError::new("", format!("invalid schema: {}", message))]
            }
        }
    }

    fn is_valid(&self, schema: &Value, data: &Value, root_schema: &Value) -> bool {
        let combined = with_root_namespace(schema, root_schema);
        match self.compile(&combined) {
            Ok(validator) => validator.is_valid(data),
            Err(message) => {
                log::warn!("could not validate against subschema: {}", message);
                false
            }
        }
    }
}

/// Embed the root schema into a subschema so both can be compiled as one
/// document without their `$ref`s colliding.
///
/// Every local `$ref` (`#...`) is moved into the `#/__rjsf_rootSchema`
/// namespace, where the root now lives.
pub fn with_root_namespace(schema: &Value, root_schema: &Value) -> Value {
    let mut combined = prefix_refs(schema);
    if let Value::Object(map) = &mut combined {
        let mut root = prefix_refs(root_schema);
        if let Value::Object(root_map) = &mut root {
            root_map.remove("$id");
            root_map.remove("$schema");
        }
        map.insert(ROOT_SCHEMA_PREFIX.to_string(), root);
    }
    combined
}

fn prefix_refs(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| {
                    let rewritten = match (key.as_str(), child) {
                        ("$ref", Value::String(reference)) => {
                            Value::String(prefix_ref(reference))
                        }
                        _ => prefix_refs(child),
                    };
                    (key.clone(), rewritten)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(prefix_refs).collect()),
        other => other.clone(),
    }
}

fn prefix_ref(reference: &str) -> String {
    match reference.strip_prefix('#') {
        Some("") => format!("#/{}", ROOT_SCHEMA_PREFIX),
        Some(pointer) if pointer.starts_with('/') => {
            format!("#/{}{}", ROOT_SCHEMA_PREFIX, pointer)
        }
        _ => reference.to_string(),
    }
}

/// Convert a JSON pointer into the instance to a `.key`/`[n]` property path.
///
/// Segments addressing array elements become brackets.
pub fn pointer_to_property(pointer: &str, instance: &Value) -> String {
    let mut property = String::new();
    let mut current = Some(instance);

    for raw in pointer.split('/').skip(1) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        match current {
            Some(Value::Array(items)) => {
                property.push_str(&format!("[{}]", segment));
                current = segment.parse::<usize>().ok().and_then(|i| items.get(i));
            }
            Some(node) => {
                property.push('.');
                property.push_str(&segment);
                current = node.get(&segment);
            }
            None => {
                property.push('.');
                property.push_str(&segment);
            }
        }
    }

    property
}

/// Outcome of validating form data.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<FlatError>,
    pub error_schema: Value,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Custom validation hook: receives the defaulted form data and adds errors.
pub type CustomValidate<'a> = &'a dyn Fn(&Value, &mut ErrorSchemaBuilder);

/// Validate form data against the context's root schema.
///
/// Defaults are filled in first so the validator sees the data the form
/// would submit. Errors added by `custom_validate` are appended to the list
/// and merged into the error schema.
///
/// # Errors
///
/// Returns `ResolveError` when defaults cannot be computed (bad `$ref`,
/// non-object schema).
pub fn validate_form_data(
    ctx: &SchemaContext<'_>,
    form_data: Option<&Value>,
    custom_validate: Option<CustomValidate<'_>>,
) -> Result<ValidationReport, ResolveError> {
    let data = get_default_form_state(ctx.root_schema, form_data, ctx, false)?;
    let mut errors = ctx.validator.validate(&data, ctx.root_schema);
    let mut error_schema = to_error_schema(&errors);

    if let Some(hook) = custom_validate {
        let mut builder = ErrorSchemaBuilder::new();
        hook(&data, &mut builder);
        errors.extend(builder.errors().iter().cloned());
        error_schema = merge_objects(&error_schema, &builder.build(), true);
    }

    Ok(ValidationReport {
        errors,
        error_schema,
    })
}
