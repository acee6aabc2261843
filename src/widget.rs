//! Widget selection contract.
//!
//! Rendering lives outside this crate. A renderer exposes its widgets through
//! a [`WidgetRegistry`]; `get_widget` maps a `ui:widget` declaration plus the
//! schema type onto one of them, following registry aliases and the built-in
//! per-type alias tables (`"textarea"` on a string means `TextareaWidget`).

use serde_json::{Map, Value};

use crate::classify::{get_schema_type, is_files_array, is_multi_select, is_select};
use crate::error::WidgetError;
use crate::resolver::SchemaContext;
use crate::types::json_type_name;
use crate::ui::get_ui_options;

/// A widget declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetRef<H> {
    /// Registered name or built-in alias.
    Named(String),
    /// A renderer's own widget handle.
    Component(H),
    /// Deprecated object form: `{"component": <name>, "options": {..}}`.
    Inline(Map<String, Value>),
}

impl<H> WidgetRef<H> {
    /// Interpret a `ui:widget` value.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Unsupported` for anything but a string or an
    /// object.
    pub fn from_ui(value: &Value) -> Result<Self, WidgetError> {
        match value {
            Value::String(name) => Ok(WidgetRef::Named(name.clone())),
            Value::Object(map) => Ok(WidgetRef::Inline(map.clone())),
            other => Err(WidgetError::Unsupported {
                kind: json_type_name(other).to_string(),
            }),
        }
    }
}

/// The widgets a renderer makes available.
pub trait WidgetRegistry {
    type Handle: Clone;

    /// Look up a registered widget by name.
    fn lookup(&self, name: &str) -> Option<WidgetRef<Self::Handle>>;
}

/// A widget handle together with options picked up along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWidget<H> {
    pub component: H,
    pub options: Map<String, Value>,
}

/// Built-in aliases for a schema type, mapped to registry names.
fn builtin_widget(schema_type: &str, alias: &str) -> Option<Option<&'static str>> {
    let table: &[(&str, &str)] = match schema_type {
        "boolean" => &[
            ("checkbox", "CheckboxWidget"),
            ("radio", "RadioWidget"),
            ("select", "SelectWidget"),
            ("hidden", "HiddenWidget"),
        ],
        "string" => &[
            ("text", "TextWidget"),
            ("password", "PasswordWidget"),
            ("email", "EmailWidget"),
            ("hostname", "TextWidget"),
            ("ipv4", "TextWidget"),
            ("ipv6", "TextWidget"),
            ("uri", "URLWidget"),
            ("data-url", "FileWidget"),
            ("radio", "RadioWidget"),
            ("select", "SelectWidget"),
            ("textarea", "TextareaWidget"),
            ("hidden", "HiddenWidget"),
            ("date", "DateWidget"),
            ("datetime", "DateTimeWidget"),
            ("date-time", "DateTimeWidget"),
            ("alt-date", "AltDateWidget"),
            ("alt-datetime", "AltDateTimeWidget"),
            ("color", "ColorWidget"),
            ("file", "FileWidget"),
        ],
        "number" | "integer" => &[
            ("text", "TextWidget"),
            ("select", "SelectWidget"),
            ("updown", "UpDownWidget"),
            ("range", "RangeWidget"),
            ("radio", "RadioWidget"),
            ("hidden", "HiddenWidget"),
        ],
        "array" => &[
            ("select", "SelectWidget"),
            ("checkboxes", "CheckboxesWidget"),
            ("files", "FileWidget"),
            ("hidden", "HiddenWidget"),
        ],
        _ => return None,
    };
    Some(
        table
            .iter()
            .find(|(name, _)| *name == alias)
            .map(|(_, widget)| *widget),
    )
}

/// Resolve a widget declaration for `schema` against `registry`.
///
/// Registered names take precedence over built-in aliases, and may
/// themselves point at other names.
///
/// # Errors
///
/// - `WidgetError::Unsupported` for an inline declaration without a
///   string `component`,
/// - `WidgetError::NoWidgetForType` when a built-in alias is needed but the
///   schema type has none,
/// - `WidgetError::NoWidget` when the alias is unknown for the type or its
///   widget isn't registered,
/// - `WidgetError::AliasCycle` when registry names refer back to themselves.
pub fn get_widget<R: WidgetRegistry>(
    schema: &Value,
    widget: &WidgetRef<R::Handle>,
    registry: &R,
) -> Result<ResolvedWidget<R::Handle>, WidgetError> {
    let mut options = Map::new();
    let mut visited: Vec<String> = Vec::new();
    let mut current = widget.clone();

    loop {
        let name = match current {
            WidgetRef::Component(component) => return Ok(ResolvedWidget { component, options }),
            WidgetRef::Inline(map) => {
                if let Some(Value::Object(extra)) = map.get("options") {
                    for (key, value) in extra {
                        options.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
                match map.get("component") {
                    Some(Value::String(name)) => name.clone(),
                    other => {
                        return Err(WidgetError::Unsupported {
                            kind: other.map_or("undefined", json_type_name).to_string(),
                        })
                    }
                }
            }
            WidgetRef::Named(name) => name,
        };

        if visited.contains(&name) {
            return Err(WidgetError::AliasCycle { widget: name });
        }

        current = match registry.lookup(&name) {
            Some(registered) => registered,
            None => {
                let schema_type = get_schema_type(schema).unwrap_or_else(|| "undefined".into());
                let builtin = builtin_widget(&schema_type, &name).ok_or_else(|| {
                    WidgetError::NoWidgetForType {
                        schema_type: schema_type.clone(),
                    }
                })?;
                let registered = builtin.and_then(|builtin| registry.lookup(builtin));
                registered.ok_or(WidgetError::NoWidget {
                    widget: name.clone(),
                    schema_type,
                })?
            }
        };
        visited.push(name);
    }
}

/// Whether [`get_widget`] would succeed.
pub fn has_widget<R: WidgetRegistry>(schema: &Value, widget: &WidgetRef<R::Handle>, registry: &R) -> bool {
    get_widget(schema, widget, registry).is_ok()
}

/// The widget name a field renders with when its uiSchema doesn't pick one.
pub fn default_widget_name<R: WidgetRegistry>(
    schema: &Value,
    ui_schema: &Value,
    ctx: &SchemaContext<'_>,
    registry: &R,
) -> String {
    match get_schema_type(schema).as_deref() {
        Some("array") if is_multi_select(schema, ctx) => "select".into(),
        Some("array") if is_files_array(schema, ui_schema, ctx) => "files".into(),
        Some("boolean") => "checkbox".into(),
        Some("string") | Some("number") | Some("integer") if is_select(schema, ctx) => {
            "select".into()
        }
        Some("string") => match schema.get("format").and_then(Value::as_str) {
            Some(format) if has_widget(schema, &WidgetRef::Named(format.to_string()), registry) => {
                format.to_string()
            }
            _ => "text".into(),
        },
        _ => "text".into(),
    }
}

/// Pick the widget for a field from its uiSchema, falling back to the
/// type's default. `ui:options` are carried into the result.
///
/// # Errors
///
/// Returns `WidgetError` as described for [`get_widget`].
pub fn widget_for_field<R: WidgetRegistry>(
    schema: &Value,
    ui_schema: &Value,
    ctx: &SchemaContext<'_>,
    registry: &R,
) -> Result<ResolvedWidget<R::Handle>, WidgetError> {
    let mut ui_options = get_ui_options(ui_schema);
    let declared = match ui_schema.get("ui:widget") {
        Some(value) => WidgetRef::from_ui(value)?,
        None => WidgetRef::Named(default_widget_name(schema, ui_schema, ctx, registry)),
    };
    ui_options.remove("widget");

    let mut resolved = get_widget(schema, &declared, registry)?;
    for (key, value) in ui_options {
        resolved.options.insert(key, value);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::JsonSchemaValidator;
    use serde_json::json;
    use std::collections::HashMap;

    struct Registry(HashMap<&'static str, WidgetRef<&'static str>>);

    impl Registry {
        fn standard() -> Self {
            let mut widgets = HashMap::new();
            for (name, handle) in [
                ("TextWidget", "text-input"),
                ("TextareaWidget", "textarea"),
                ("SelectWidget", "select"),
                ("CheckboxWidget", "checkbox"),
                ("EmailWidget", "email-input"),
                ("UpDownWidget", "number-input"),
            ] {
                widgets.insert(name, WidgetRef::Component(handle));
            }
            Registry(widgets)
        }

        fn with(mut self, name: &'static str, widget: WidgetRef<&'static str>) -> Self {
            self.0.insert(name, widget);
            self
        }
    }

    impl WidgetRegistry for Registry {
        type Handle = &'static str;

        fn lookup(&self, name: &str) -> Option<WidgetRef<&'static str>> {
            self.0.get(name).cloned()
        }
    }

    fn named(name: &str) -> WidgetRef<&'static str> {
        WidgetRef::Named(name.to_string())
    }

    #[test]
    fn builtin_aliases_per_type() {
        let registry = Registry::standard();
        let string = json!({ "type": "string" });
        let widget = get_widget(&string, &named("textarea"), &registry).unwrap();
        assert_eq!(widget.component, "textarea");

        let integer = json!({ "type": "integer" });
        let widget = get_widget(&integer, &named("updown"), &registry).unwrap();
        assert_eq!(widget.component, "number-input");
    }

    #[test]
    fn registered_names_win_and_chain() {
        let registry = Registry::standard()
            .with("fancy", named("TextareaWidget"))
            .with("text", WidgetRef::Component("custom-text"));
        let schema = json!({ "type": "string" });

        assert_eq!(
            get_widget(&schema, &named("fancy"), &registry).unwrap().component,
            "textarea"
        );
        assert_eq!(
            get_widget(&schema, &named("text"), &registry).unwrap().component,
            "custom-text"
        );
    }

    #[test]
    fn lookup_failures() {
        let registry = Registry::standard();

        let err = get_widget(&json!({ "type": "string" }), &named("nope"), &registry).unwrap_err();
        assert_eq!(
            err,
            WidgetError::NoWidget {
                widget: "nope".into(),
                schema_type: "string".into()
            }
        );

        let err = get_widget(&json!({ "type": "null" }), &named("text"), &registry).unwrap_err();
        assert!(matches!(err, WidgetError::NoWidgetForType { .. }));

        let err = get_widget(&json!({ "type": "string" }), &named("password"), &registry).unwrap_err();
        assert!(matches!(err, WidgetError::NoWidget { .. }));

        let err = WidgetRef::<&str>::from_ui(&json!(3)).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported widget definition: number");
    }

    #[test]
    fn alias_cycles_are_detected() {
        let registry = Registry::standard()
            .with("a", named("b"))
            .with("b", named("a"));
        let err = get_widget(&json!({ "type": "string" }), &named("a"), &registry).unwrap_err();
        assert_eq!(err, WidgetError::AliasCycle { widget: "a".into() });
        assert!(!has_widget(&json!({ "type": "string" }), &named("a"), &registry));
    }

    #[test]
    fn inline_declarations_carry_options() {
        let registry = Registry::standard();
        let declared = WidgetRef::from_ui(&json!({
            "component": "updown",
            "options": { "step": 5 }
        }))
        .unwrap();
        let widget = get_widget(&json!({ "type": "number" }), &declared, &registry).unwrap();
        assert_eq!(widget.component, "number-input");
        assert_eq!(widget.options.get("step"), Some(&json!(5)));

        let declared = WidgetRef::<&str>::Inline(Map::new());
        assert!(!has_widget(&json!({ "type": "number" }), &declared, &registry));
    }

    #[test]
    fn default_widgets_follow_classification() {
        let validator = JsonSchemaValidator::new();
        let root = json!({});
        let ctx = SchemaContext::new(&root, &validator);
        let registry = Registry::standard();

        let pick = |schema: Value| default_widget_name(&schema, &json!({}), &ctx, &registry);
        assert_eq!(pick(json!({ "type": "string" })), "text");
        assert_eq!(pick(json!({ "type": "string", "enum": ["a"] })), "select");
        assert_eq!(pick(json!({ "type": "string", "format": "email" })), "email");
        assert_eq!(pick(json!({ "type": "string", "format": "uri" })), "text");
        assert_eq!(pick(json!({ "type": "boolean" })), "checkbox");
        assert_eq!(
            pick(json!({ "type": "array", "uniqueItems": true, "items": { "enum": ["x"] } })),
            "select"
        );
    }

    #[test]
    fn field_widget_merges_ui_options() {
        let validator = JsonSchemaValidator::new();
        let root = json!({});
        let ctx = SchemaContext::new(&root, &validator);
        let registry = Registry::standard();

        let ui = json!({ "ui:widget": "textarea", "ui:options": { "rows": 4 } });
        let widget = widget_for_field(&json!({ "type": "string" }), &ui, &ctx, &registry).unwrap();
        assert_eq!(widget.component, "textarea");
        assert_eq!(widget.options.get("rows"), Some(&json!(4)));

        let widget = widget_for_field(&json!({ "type": "string" }), &json!({}), &ctx, &registry).unwrap();
        assert_eq!(widget.component, "text-input");
    }
}
