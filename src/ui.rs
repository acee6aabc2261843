//! Reading `ui:`-prefixed presentation options from a uiSchema node.

use serde_json::{Map, Value};

/// Collect the `ui:` options of a uiSchema node, without the prefix.
///
/// `ui:options` is flattened into the result. The deprecated object form of
/// `ui:widget` (`{"component": .., "options": {..}}`) contributes its
/// `options` and is otherwise dropped.
pub fn get_ui_options(ui_schema: &Value) -> Map<String, Value> {
    let mut options = Map::new();
    let Some(map) = ui_schema.as_object() else {
        return options;
    };

    for (key, value) in map {
        let Some(name) = key.strip_prefix("ui:") else {
            continue;
        };
        match (name, value) {
            ("widget", Value::Object(widget)) => {
                log::warn!(
                    "Setting options via ui:widget object is deprecated, use ui:options instead"
                );
                if let Some(Value::Object(extra)) = widget.get("options") {
                    options.extend(extra.clone());
                }
            }
            ("options", Value::Object(extra)) => options.extend(extra.clone()),
            _ => {
                options.insert(name.to_string(), value.clone());
            }
        }
    }

    options
}

/// True when the node asks for its field to be hidden.
pub fn is_hidden(ui_schema: &Value) -> bool {
    ui_schema.get("ui:widget").and_then(Value::as_str) == Some("hidden")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_prefix_and_flattens_options() {
        let ui = json!({
            "ui:widget": "textarea",
            "ui:title": "Bio",
            "ui:options": { "rows": 5, "label": false },
            "nested": { "ui:widget": "hidden" }
        });
        let options = get_ui_options(&ui);
        assert_eq!(
            Value::Object(options),
            json!({ "widget": "textarea", "title": "Bio", "rows": 5, "label": false })
        );
    }

    #[test]
    fn deprecated_widget_object_contributes_options() {
        let ui = json!({
            "ui:widget": { "component": "updown", "options": { "step": 2 } }
        });
        let options = get_ui_options(&ui);
        assert_eq!(options.get("step"), Some(&json!(2)));
        assert!(options.get("widget").is_none());
    }

    #[test]
    fn non_object_has_no_options() {
        assert!(get_ui_options(&json!(null)).is_empty());
        assert!(get_ui_options(&json!(["ui:widget"])).is_empty());
    }

    #[test]
    fn hidden_widget() {
        assert!(is_hidden(&json!({ "ui:widget": "hidden" })));
        assert!(!is_hidden(&json!({ "ui:widget": "text" })));
    }
}
