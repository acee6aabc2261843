//! Schema Form Core
//!
//! Framework-independent algorithms behind JSON Schema driven forms: schema
//! resolution, default form data, field id/path trees, and validation error
//! trees ordered the way fields appear on screen.
//!
//! # Example
//!
//! ```
//! use schema_form::{
//!     get_default_form_state, order_errors_by_ui_schema, JsonSchemaValidator, FormValidator,
//!     SchemaContext,
//! };
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "bar": { "type": "string", "minLength": 1 },
//!         "foo": { "type": "string", "minLength": 1, "default": "" }
//!     }
//! });
//! let validator = JsonSchemaValidator::new();
//! let ctx = SchemaContext::new(&schema, &validator);
//!
//! let data = get_default_form_state(&schema, Some(&json!({ "bar": "" })), &ctx, false).unwrap();
//! assert_eq!(data, json!({ "foo": "", "bar": "" }));
//!
//! let errors = validator.validate(&data, &schema);
//! let ordered = order_errors_by_ui_schema(&errors, &json!({ "ui:order": ["foo", "*"] })).unwrap();
//! let properties: Vec<&str> = ordered.iter().map(|e| e.property.as_str()).collect();
//! assert_eq!(properties, [".foo", ".bar"]);
//! ```
//!
//! # Components
//!
//! | Module | Provides |
//! |--------|----------|
//! | resolution | [`retrieve_schema`], [`find_schema_definition`], [`get_matching_option`] |
//! | defaults | [`get_default_form_state`], [`compute_defaults`], [`merge_defaults_with_form_data`] |
//! | ids | [`to_id_schema`], [`to_path_schema`] |
//! | errors | [`to_error_schema`], [`to_error_list`], [`order_errors_by_ui_schema`] |
//! | validation | [`FormValidator`], [`JsonSchemaValidator`], [`validate_form_data`] |
//! | form | [`FormState`] |
//!
//! Every resolution takes a [`SchemaContext`]: the root schema all `$ref`s
//! point into, and the validator used to match `oneOf`/`anyOf` branches.
//! Build one validator per form session; it caches compiled schemas.

mod classify;
mod defaults;
mod error;
mod error_schema;
mod form;
mod ids;
mod loader;
mod merge;
mod ordering;
mod resolver;
mod types;
mod ui;
mod validator;
mod widget;

pub use classify::{
    allow_additional_items, get_schema_type, guess_type, is_constant, is_files_array,
    is_fixed_items, is_multi_select, is_select, options_list, to_constant, SelectOption,
};
pub use defaults::{compute_defaults, get_default_form_state, merge_defaults_with_form_data};
pub use error::{FormError, MergeError, OrderError, ResolveError, WidgetError};
pub use error_schema::{to_error_list, to_error_schema, to_path_segments, ErrorSchemaBuilder};
pub use form::{omit_extra_data, FormOptions, FormState};
pub use ids::{to_id_schema, to_path_schema};
pub use loader::{is_url, load_json, load_json_auto, load_json_str};
pub use merge::{merge_all_of, merge_objects, merge_schemas};
pub use ordering::{order_errors_by_ui_schema, order_properties};
pub use resolver::{
    find_schema_definition, get_matching_option, resolve_dependencies, retrieve_schema,
    SchemaContext,
};
pub use types::{
    json_type_name, FlatError, ADDITIONAL_PROPERTY_FLAG, DEFAULT_ID_PREFIX, ERRORS_KEY, ID_KEY,
    NAME_KEY, ORDER_WILDCARD, RJSF_ADDITIONAL_PROPERTIES_FLAG,
};
pub use ui::{get_ui_options, is_hidden};
pub use validator::{
    pointer_to_property, validate_form_data, with_root_namespace, CustomValidate, FormValidator,
    JsonSchemaValidator, ValidationReport, ROOT_SCHEMA_PREFIX,
};
pub use widget::{
    default_widget_name, get_widget, has_widget, widget_for_field, ResolvedWidget, WidgetRef,
    WidgetRegistry,
};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
