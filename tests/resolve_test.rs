//! Integration tests for resolution, defaults and error ordering.

use schema_form::{
    find_schema_definition, get_default_form_state, merge_defaults_with_form_data,
    order_errors_by_ui_schema, retrieve_schema, to_error_list, to_error_schema, FlatError,
    FormValidator, JsonSchemaValidator, ResolveError, SchemaContext,
};
use serde_json::{json, Value};

fn properties(errors: &[FlatError]) -> Vec<&str> {
    errors.iter().map(|e| e.property.as_str()).collect()
}

// === Schema Resolution ===

mod resolution {
    use super::*;

    #[test]
    fn definition_lookup_decodes_escapes() {
        let root = json!({
            "definitions": { "a~complex/name": { "type": "integer" } }
        });
        let found = find_schema_definition("#/definitions/a~0complex~1name", &root).unwrap();
        assert_eq!(found, json!({ "type": "integer" }));
    }

    #[test]
    fn definition_lookup_requires_fragment() {
        let root = json!({ "definitions": { "a": {} } });
        let err = find_schema_definition("definitions/a", &root).unwrap_err();
        assert!(matches!(err, ResolveError::DefinitionNotFound { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn additional_properties_are_stubbed() {
        let schema = json!({ "type": "object", "additionalProperties": { "type": "string" } });
        let validator = JsonSchemaValidator::new();
        let ctx = SchemaContext::new(&schema, &validator);

        let resolved = retrieve_schema(&schema, &ctx, &json!({ "first": 1 })).unwrap();
        assert_eq!(
            resolved["properties"]["first"],
            json!({ "type": "string", "__additional_property": true })
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let schema = json!({
            "definitions": {
                "named": { "type": "object", "properties": { "name": { "type": "string" } } }
            },
            "type": "object",
            "allOf": [
                { "$ref": "#/definitions/named" },
                { "properties": { "age": { "type": "integer" } }, "required": ["age"] }
            ],
            "additionalProperties": { "type": "number" },
            "dependencies": { "name": ["age"] }
        });
        let data = json!({ "name": "n", "extra": 2 });
        let validator = JsonSchemaValidator::new();
        let ctx = SchemaContext::new(&schema, &validator);

        let once = retrieve_schema(&schema, &ctx, &data).unwrap();
        let twice = retrieve_schema(&once, &ctx, &data).unwrap();
        assert_eq!(once, twice);
        assert!(once["properties"]["age"].is_object());
        assert_eq!(once["properties"]["extra"]["__additional_property"], json!(true));
    }

    #[test]
    fn oneof_dependency_selects_matching_branch() {
        let schema = json!({
            "type": "object",
            "properties": { "kind": { "enum": ["card", "bank"] } },
            "dependencies": {
                "kind": {
                    "oneOf": [
                        {
                            "properties": {
                                "kind": { "enum": ["card"] },
                                "number": { "type": "string" }
                            }
                        },
                        {
                            "properties": {
                                "kind": { "enum": ["bank"] },
                                "iban": { "type": "string" }
                            }
                        }
                    ]
                }
            }
        });
        let validator = JsonSchemaValidator::new();
        let ctx = SchemaContext::new(&schema, &validator);

        let resolved = retrieve_schema(&schema, &ctx, &json!({ "kind": "bank" })).unwrap();
        let keys: Vec<&String> = resolved["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["kind", "iban"]);
    }
}

// === Defaults ===

mod defaults {
    use super::*;

    #[test]
    fn node_default_beats_ancestor_default() {
        let schema = json!({
            "type": "object",
            "default": { "a": 1, "b": 2 },
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number", "default": 9 }
            }
        });
        let validator = JsonSchemaValidator::new();
        let ctx = SchemaContext::new(&schema, &validator);

        let state = get_default_form_state(&schema, None, &ctx, false).unwrap();
        assert_eq!(state, json!({ "a": 1, "b": 9 }));
    }

    #[test]
    fn array_merge_law() {
        let merged = merge_defaults_with_form_data(
            Some(&json!([{ "x": 1 }, { "x": 2 }])),
            &json!([{ "y": 3 }]),
        );
        assert_eq!(merged, json!([{ "x": 1, "y": 3 }]));
    }

    #[test]
    fn false_is_not_replaced_by_default() {
        let schema = json!({ "type": "boolean" });
        let validator = JsonSchemaValidator::new();
        let ctx = SchemaContext::new(&schema, &validator);

        let state = get_default_form_state(&schema, Some(&json!(false)), &ctx, false).unwrap();
        assert_eq!(state, json!(false));
    }
}

// === Error Schema and Ordering ===

mod errors {
    use super::*;

    fn validate(schema: &Value, data: &Value) -> Vec<FlatError> {
        JsonSchemaValidator::new().validate(data, schema)
    }

    #[test]
    fn ordering_follows_ui_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "bar": { "type": "string", "minLength": 1 },
                "foo": { "type": "string", "minLength": 1 }
            }
        });
        let errors = validate(&schema, &json!({ "foo": "", "bar": "" }));
        let ordered =
            order_errors_by_ui_schema(&errors, &json!({ "ui:order": ["foo", "bar"] })).unwrap();
        assert_eq!(properties(&ordered), [".foo", ".bar"]);
    }

    #[test]
    fn wildcard_expands_in_schema_order() {
        let schema = json!({
            "type": "object",
            "required": ["foo", "bar", "qux", "quuz"],
            "properties": {
                "foo": { "type": "string", "minLength": 1 },
                "bar": { "type": "string", "minLength": 1 },
                "qux": { "type": "string", "minLength": 1 },
                "quuz": { "type": "string", "minLength": 1 }
            }
        });
        let data = json!({ "foo": "", "bar": "", "qux": "", "quuz": "" });
        let errors = validate(&schema, &data);
        let ui = json!({ "ui:order": ["foo", "*", "bar"] });
        let ordered = order_errors_by_ui_schema(&errors, &ui).unwrap();
        assert_eq!(properties(&ordered), [".foo", ".qux", ".quuz", ".bar"]);
    }

    #[test]
    fn numeric_property_names_follow_ui_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "10": { "type": "string", "minLength": 1 },
                "9": { "type": "string", "minLength": 1 }
            }
        });
        let errors = validate(&schema, &json!({ "10": "", "9": "" }));
        let ordered =
            order_errors_by_ui_schema(&errors, &json!({ "ui:order": ["10", "9"] })).unwrap();
        assert_eq!(properties(&ordered), [".10", ".9"]);

        let ordered =
            order_errors_by_ui_schema(&errors, &json!({ "ui:order": ["9", "10"] })).unwrap();
        assert_eq!(properties(&ordered), [".9", ".10"]);
    }

    #[test]
    fn nested_array_errors() {
        let schema = json!({
            "type": "object",
            "properties": {
                "people": {
                    "type": "array",
                    "minItems": 3,
                    "items": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "age": { "type": "integer" },
                            "name": { "type": "string" }
                        }
                    }
                }
            }
        });
        let data = json!({ "people": [{ "age": "old" }, { "name": "b" }] });
        let errors = validate(&schema, &data);
        let ui = json!({ "people": { "items": { "ui:order": ["name", "age"] } } });
        let ordered = order_errors_by_ui_schema(&errors, &ui).unwrap();
        assert_eq!(
            properties(&ordered),
            [".people", ".people[0].name", ".people[0].age"]
        );
    }

    #[test]
    fn error_round_trip_keeps_messages() {
        let errors = vec![
            FlatError::new(".a", "first"),
            FlatError::new(".a[0].b", "second"),
            FlatError::new("", "third"),
        ];
        let data = json!({ "a": [{ "b": 1 }] });
        let list = to_error_list(&to_error_schema(&errors), "root", &data);
        let mut messages: Vec<&str> = list.iter().map(|e| e.message.as_str()).collect();
        messages.sort_unstable();
        assert_eq!(messages, ["first", "second", "third"]);
        assert!(list.iter().any(|e| e.stack == "b: second"));
    }

    #[test]
    fn is_valid_cache_is_transparent() {
        let validator = JsonSchemaValidator::new();
        let root = json!({ "definitions": { "short": { "type": "string", "maxLength": 2 } } });
        let schema = json!({ "$ref": "#/definitions/short" });

        for data in [json!("ab"), json!("abc"), json!(3)] {
            let cold = JsonSchemaValidator::new().is_valid(&schema, &data, &root);
            let warm_first = validator.is_valid(&schema, &data, &root);
            let warm_second = validator.is_valid(&schema, &data, &root);
            assert_eq!(cold, warm_first);
            assert_eq!(warm_first, warm_second);
        }
    }
}
