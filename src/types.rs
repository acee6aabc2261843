//! Core types shared by resolution, defaults and error handling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marks a property synthesized from `additionalProperties` for a key in form data.
pub const ADDITIONAL_PROPERTY_FLAG: &str = "__additional_property";

/// Set on path-schema nodes whose schema allows dynamic keys.
pub const RJSF_ADDITIONAL_PROPERTIES_FLAG: &str = "__rjsf_additionalProperties";

/// Key holding the message list of an error-schema node.
pub const ERRORS_KEY: &str = "__errors";

/// Key holding the identifier of an id-schema node.
pub const ID_KEY: &str = "$id";

/// Key holding the dotted field name of a path-schema node.
pub const NAME_KEY: &str = "$name";

/// Default id prefix for the root field.
pub const DEFAULT_ID_PREFIX: &str = "root";

/// Wildcard accepted in `ui:order`.
pub const ORDER_WILDCARD: &str = "*";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One validation error in the uniform shape consumed and produced by the core.
///
/// `property` uses a leading-dot/bracket path: `""` for the root, `.a`, `.a[0].b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatError {
    #[serde(default)]
    pub property: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub stack: String,
}

impl FlatError {
    /// Build an error, deriving `stack` as `"<property> <message>"`.
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        let property = property.into();
        let message = message.into();
        let stack = format!("{} {}", property, message).trim().to_string();
        Self {
            property,
            message,
            name: None,
            stack,
        }
    }

    /// Attach the failing keyword name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl std::fmt::Display for FlatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_error_stack() {
        let err = FlatError::new(".foo", "is a required property");
        assert_eq!(err.stack, ".foo is a required property");

        let root = FlatError::new("", "should be object");
        assert_eq!(root.stack, "should be object");
    }

    #[test]
    fn flat_error_deserializes_minimal_shape() {
        let err: FlatError =
            serde_json::from_value(json!({ "property": ".a[0]", "message": "bad" })).unwrap();
        assert_eq!(err.property, ".a[0]");
        assert_eq!(err.name, None);
        assert_eq!(err.stack, "");
    }

    #[test]
    fn type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
