//! Form state: the pure computation behind a form controller.
//!
//! A [`FormState`] holds everything a renderer needs for one form session
//! (resolved schema, filled-in form data, id and path trees, errors) and
//! recomputes it as the data changes.

use serde_json::{json, Value};

use crate::defaults::get_default_form_state;
use crate::error::FormError;
use crate::error_schema::to_error_list;
use crate::ids::{to_id_schema, to_path_schema};
use crate::merge::merge_objects;
use crate::ordering::order_errors_by_ui_schema;
use crate::resolver::{retrieve_schema, SchemaContext};
use crate::types::{FlatError, DEFAULT_ID_PREFIX, RJSF_ADDITIONAL_PROPERTIES_FLAG};
use crate::validator::{validate_form_data, CustomValidate};

/// Behaviour switches for a form session.
#[derive(Clone)]
pub struct FormOptions<'a> {
    /// Prefix of every field id.
    pub id_prefix: String,
    /// Validate on every change, not only on submit.
    pub live_validate: bool,
    /// Never validate.
    pub no_validate: bool,
    /// Drop form data that no field renders, on submit.
    pub omit_extra_data: bool,
    /// With `omit_extra_data`, also drop it on every change.
    pub live_omit: bool,
    /// Errors to show in addition to validation errors, as an error schema.
    pub extra_errors: Option<Value>,
    pub custom_validate: Option<CustomValidate<'a>>,
}

impl Default for FormOptions<'_> {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            live_validate: false,
            no_validate: false,
            omit_extra_data: false,
            live_omit: false,
            extra_errors: None,
            custom_validate: None,
        }
    }
}

impl std::fmt::Debug for FormOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormOptions")
            .field("id_prefix", &self.id_prefix)
            .field("live_validate", &self.live_validate)
            .field("no_validate", &self.no_validate)
            .field("omit_extra_data", &self.omit_extra_data)
            .field("live_omit", &self.live_omit)
            .field("extra_errors", &self.extra_errors)
            .field("custom_validate", &self.custom_validate.is_some())
            .finish()
    }
}

/// Computed state of one form session.
#[derive(Debug)]
pub struct FormState<'a> {
    ctx: SchemaContext<'a>,
    ui_schema: &'a Value,
    options: FormOptions<'a>,
    schema: Value,
    form_data: Value,
    id_schema: Value,
    path_schema: Value,
    errors: Vec<FlatError>,
    error_schema: Value,
}

impl<'a> FormState<'a> {
    /// Compute the initial state from the root schema in `ctx` and optional
    /// initial form data.
    ///
    /// Initial data is validated straight away only with `live_validate`.
    ///
    /// # Errors
    ///
    /// Returns `FormError` if the schema cannot be resolved or the errors
    /// cannot be ordered.
    pub fn new(
        ctx: SchemaContext<'a>,
        ui_schema: &'a Value,
        form_data: Option<&Value>,
        options: FormOptions<'a>,
    ) -> Result<Self, FormError> {
        let mut state = Self {
            ctx,
            ui_schema,
            options,
            schema: json!({}),
            form_data: Value::Null,
            id_schema: json!({}),
            path_schema: json!({}),
            errors: Vec::new(),
            error_schema: json!({}),
        };

        state.recompute(form_data)?;
        if form_data.is_some() && state.options.live_validate && !state.options.no_validate {
            state.validate()?;
        } else {
            state.apply_extra_errors(json!({}))?;
        }
        Ok(state)
    }

    /// Replace the form data after an edit.
    ///
    /// With `live_validate` the new data is validated. Otherwise an error
    /// schema patch reported by the field, if any, becomes the current
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns `FormError` if the schema cannot be resolved or the errors
    /// cannot be ordered.
    pub fn change(&mut self, form_data: Value, error_schema: Option<Value>) -> Result<(), FormError> {
        if form_data.is_object() || form_data.is_array() {
            self.recompute(Some(&form_data))?;
        } else {
            self.form_data = form_data;
        }

        if self.options.omit_extra_data && self.options.live_omit {
            self.form_data = omit_extra_data(&self.form_data, &self.path_schema);
        }

        if self.options.no_validate {
            return Ok(());
        }
        if self.options.live_validate {
            self.validate()?;
        } else if let Some(patch) = error_schema {
            self.apply_extra_errors(patch)?;
        }
        Ok(())
    }

    /// Validate the current form data and store the errors, ordered as
    /// their fields appear on screen.
    ///
    /// Returns whether the data is valid.
    ///
    /// # Errors
    ///
    /// Returns `FormError` if the schema cannot be resolved or `ui:order`
    /// is malformed.
    pub fn validate(&mut self) -> Result<bool, FormError> {
        let report = validate_form_data(
            &self.ctx,
            Some(&self.form_data),
            self.options.custom_validate,
        )?;
        log::debug!("validation reported {} error(s)", report.errors.len());

        let valid = report.is_valid();
        if self.options.extra_errors.is_some() {
            self.apply_extra_errors(report.error_schema)?;
        } else {
            self.errors = order_errors_by_ui_schema(&report.errors, self.ui_schema)?;
            self.error_schema = report.error_schema;
        }
        Ok(valid)
    }

    /// Validate and, when valid, return the data to submit.
    ///
    /// `None` means validation failed; the errors are then available from
    /// [`FormState::errors`].
    ///
    /// # Errors
    ///
    /// Returns `FormError` as described for [`FormState::validate`].
    pub fn submit(&mut self) -> Result<Option<Value>, FormError> {
        if self.options.omit_extra_data {
            self.form_data = omit_extra_data(&self.form_data, &self.path_schema);
        }

        if !self.options.no_validate && !self.validate()? {
            return Ok(None);
        }

        self.errors.clear();
        self.error_schema = json!({});
        self.apply_extra_errors(json!({}))?;
        Ok(Some(self.form_data.clone()))
    }

    /// The root schema resolved against the current form data.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn ui_schema(&self) -> &Value {
        self.ui_schema
    }

    pub fn form_data(&self) -> &Value {
        &self.form_data
    }

    pub fn id_schema(&self) -> &Value {
        &self.id_schema
    }

    pub fn path_schema(&self) -> &Value {
        &self.path_schema
    }

    pub fn errors(&self) -> &[FlatError] {
        &self.errors
    }

    pub fn error_schema(&self) -> &Value {
        &self.error_schema
    }

    fn recompute(&mut self, form_data: Option<&Value>) -> Result<(), FormError> {
        let root = self.ctx.root_schema;
        self.form_data = get_default_form_state(root, form_data, &self.ctx, false)?;
        self.schema = retrieve_schema(root, &self.ctx, &self.form_data)?;

        let root_id = self.ui_schema.get("ui:rootFieldId").and_then(Value::as_str);
        self.id_schema = to_id_schema(
            &self.schema,
            root_id,
            &self.ctx,
            Some(&self.form_data),
            &self.options.id_prefix,
        )?;
        self.path_schema = to_path_schema(&self.schema, "", &self.ctx, Some(&self.form_data))?;
        Ok(())
    }

    /// Make `error_schema` (plus any configured extra errors) the current
    /// errors.
    fn apply_extra_errors(&mut self, error_schema: Value) -> Result<(), FormError> {
        let merged = match &self.options.extra_errors {
            Some(extra) => merge_objects(&error_schema, extra, true),
            None => error_schema,
        };
        let errors = to_error_list(&merged, "root", &self.form_data);
        self.errors = order_errors_by_ui_schema(&errors, self.ui_schema)?;
        self.error_schema = merged;
        Ok(())
    }
}

/// Keep only the form data that has a node in `path_schema`.
///
/// Nodes flagged as accepting dynamic keys keep all of their data.
pub fn omit_extra_data(form_data: &Value, path_schema: &Value) -> Value {
    if path_schema.get(RJSF_ADDITIONAL_PROPERTIES_FLAG) == Some(&Value::Bool(true)) {
        return form_data.clone();
    }

    match form_data {
        Value::Object(data) => Value::Object(
            data.iter()
                .filter_map(|(key, value)| {
                    path_schema
                        .get(key)
                        .filter(|child| child.is_object())
                        .map(|child| (key.clone(), omit_extra_data(value, child)))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| match path_schema.get(i.to_string()) {
                    Some(child) => omit_extra_data(item, child),
                    None => item.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
