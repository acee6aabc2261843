//! Conversion between flat validation errors and the nested error schema.
//!
//! An error schema mirrors the form data shape. Each node may carry an
//! `__errors` list next to child segments, since a container and one of its
//! fields can both be invalid:
//!
//! ```json
//! { "__errors": ["should have 2 items"], "0": { "__errors": ["is required"] } }
//! ```

use serde_json::{json, Map, Value};

use crate::types::{FlatError, ERRORS_KEY};

/// Split a `.a[0].b`-style property path into segments.
///
/// Accepts dotted keys, bracketed indices and quoted bracket keys
/// (`['a.b']`). Empty segments, including the one produced by a leading dot,
/// are dropped.
pub fn to_path_segments(property: &str) -> Vec<String> {
    to_path_steps(property)
        .into_iter()
        .map(|step| step.key)
        .collect()
}

/// One segment of a property path.
///
/// `indexed` is set for array positions written as `[n]`; `.10` and
/// `['10']` are object keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathStep {
    pub(crate) key: String,
    pub(crate) indexed: bool,
}

pub(crate) fn to_path_steps(property: &str) -> Vec<PathStep> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut chars = property.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => flush(&mut steps, &mut current, false),
            '[' => {
                flush(&mut steps, &mut current, false);
                let quote = match chars.peek() {
                    Some(&q) if q == '\'' || q == '"' => {
                        chars.next();
                        Some(q)
                    }
                    _ => None,
                };
                for c in chars.by_ref() {
                    match quote {
                        Some(q) if c == q => {}
                        _ if c == ']' => break,
                        _ => current.push(c),
                    }
                }
                let indexed = quote.is_none() && current.bytes().all(|b| b.is_ascii_digit());
                flush(&mut steps, &mut current, indexed);
            }
            _ => current.push(c),
        }
    }
    flush(&mut steps, &mut current, false);
    steps
}

fn flush(steps: &mut Vec<PathStep>, current: &mut String, indexed: bool) {
    if !current.is_empty() {
        steps.push(PathStep {
            key: std::mem::take(current),
            indexed,
        });
    }
}

/// Incrementally builds an error schema.
///
/// Also keeps the flat errors it was fed, so custom validation hooks can
/// report errors that flow into both representations.
#[derive(Debug, Default, Clone)]
pub struct ErrorSchemaBuilder {
    root: Map<String, Value>,
    errors: Vec<FlatError>,
}

impl ErrorSchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of flat errors, in order.
    pub fn from_errors(errors: &[FlatError]) -> Self {
        let mut builder = Self::new();
        for error in errors {
            builder.push(error.clone());
        }
        builder
    }

    /// Record `message` against the field at `property` (`""` for the root).
    pub fn add_error(&mut self, property: &str, message: impl Into<String>) -> &mut Self {
        self.push(FlatError::new(property, message));
        self
    }

    fn push(&mut self, error: FlatError) {
        let mut node = &mut self.root;
        for segment in to_path_segments(&error.property) {
            let child = node.entry(segment).or_insert_with(|| json!({}));
            if !child.is_object() {
                *child = json!({});
            }
            node = match child {
                Value::Object(map) => map,
                _ => unreachable!("error schema nodes are objects"),
            };
        }

        let messages = node
            .entry(ERRORS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = messages {
            list.push(Value::String(error.message.clone()));
        }
        self.errors.push(error);
    }

    /// Flat errors recorded so far.
    pub fn errors(&self) -> &[FlatError] {
        &self.errors
    }

    pub fn build(self) -> Value {
        Value::Object(self.root)
    }
}

/// Fold flat errors into a nested error schema.
pub fn to_error_schema(errors: &[FlatError]) -> Value {
    ErrorSchemaBuilder::from_errors(errors).build()
}

/// Flatten an error schema back into a list.
///
/// Each message becomes `"<field>: <message>"` in `stack`, where `<field>` is
/// the node's own key (`field_name` at the top). A node's own errors come
/// before its children's. `form_data` decides how keys are written into
/// `property`: children of an array become `[n]`, anything else `.key`.
pub fn to_error_list(error_schema: &Value, field_name: &str, form_data: &Value) -> Vec<FlatError> {
    let mut out = Vec::new();
    collect_errors(error_schema, field_name, "", Some(form_data), &mut out);
    out
}

fn collect_errors(
    node: &Value,
    field_name: &str,
    property: &str,
    data: Option<&Value>,
    out: &mut Vec<FlatError>,
) {
    let Some(map) = node.as_object() else {
        return;
    };

    if let Some(Value::Array(messages)) = map.get(ERRORS_KEY) {
        for message in messages {
            let message = match message {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push(FlatError {
                property: property.to_string(),
                stack: format!("{}: {}", field_name, message),
                message,
                name: None,
            });
        }
    }

    for (key, child) in map {
        if key == ERRORS_KEY {
            continue;
        }
        let (child_property, child_data) = match data {
            Some(Value::Array(items)) => (
                format!("{}[{}]", property, key),
                key.parse::<usize>().ok().and_then(|i| items.get(i)),
            ),
            _ => (
                format!("{}.{}", property, key),
                data.and_then(|d| d.get(key.as_str())),
            ),
        };
        collect_errors(child, key, &child_property, child_data, out);
    }
}
