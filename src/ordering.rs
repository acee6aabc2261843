//! Ordering of properties and validation errors by `ui:order`.
//!
//! Errors are reported in the order their fields appear on screen: a node's
//! own errors first, then its children in `ui:order` order (with `*`
//! standing for every child not named), array items by index.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::OrderError;
use crate::error_schema::{to_path_steps, PathStep};
use crate::types::{FlatError, ORDER_WILDCARD};

/// Arrange `properties` according to a `ui:order` list.
///
/// Names in `order` that aren't properties are dropped. A single `*` is
/// replaced by the remaining properties in their original order.
///
/// # Errors
///
/// Returns `OrderError::MissingProperties` when properties are left out and
/// there is no wildcard, and `OrderError::MultipleWildcards` when `*` appears
/// more than once.
pub fn order_properties(properties: &[String], order: &[String]) -> Result<Vec<String>, OrderError> {
    let known: HashSet<&str> = properties.iter().map(String::as_str).collect();
    let filtered: Vec<&str> = order
        .iter()
        .map(String::as_str)
        .filter(|name| *name == ORDER_WILDCARD || known.contains(name))
        .collect();
    let named: HashSet<&str> = filtered.iter().copied().collect();
    let rest: Vec<String> = properties
        .iter()
        .filter(|name| !named.contains(name.as_str()))
        .cloned()
        .collect();

    let wildcards: Vec<usize> = filtered
        .iter()
        .enumerate()
        .filter(|(_, name)| **name == ORDER_WILDCARD)
        .map(|(i, _)| i)
        .collect();

    match wildcards.as_slice() {
        [] if !rest.is_empty() => Err(OrderError::MissingProperties { properties: rest }),
        [] => Ok(filtered.into_iter().map(String::from).collect()),
        [at] => {
            let mut complete: Vec<String> = filtered.iter().map(|s| s.to_string()).collect();
            complete.splice(*at..=*at, rest);
            Ok(complete)
        }
        _ => Err(OrderError::MultipleWildcards {
            path: String::new(),
        }),
    }
}

/// Reorder flat validation errors to match the on-screen field order.
///
/// Every input error appears exactly once in the result. Children without
/// a `ui:order` keep the order in which the validator reported them.
///
/// # Errors
///
/// Returns `OrderError::MultipleWildcards` when a `ui:order` list contains
/// more than one `*` at a node whose children have errors.
pub fn order_errors_by_ui_schema(
    errors: &[FlatError],
    ui_schema: &Value,
) -> Result<Vec<FlatError>, OrderError> {
    let mut walk = ErrorWalk::new(errors);
    walk.visit(ui_schema, &[])?;

    for i in 0..errors.len() {
        walk.emit(i);
    }

    Ok(walk.order.into_iter().map(|i| errors[i].clone()).collect())
}

/// Accumulator for one ordering call: the emitted order plus a seen-set.
struct ErrorWalk {
    steps: Vec<Vec<PathStep>>,
    emitted: Vec<bool>,
    order: Vec<usize>,
}

impl ErrorWalk {
    fn new(errors: &[FlatError]) -> Self {
        Self {
            steps: errors.iter().map(|e| to_path_steps(&e.property)).collect(),
            emitted: vec![false; errors.len()],
            order: Vec::with_capacity(errors.len()),
        }
    }

    fn emit(&mut self, i: usize) {
        if !self.emitted[i] {
            self.emitted[i] = true;
            self.order.push(i);
        }
    }

    fn visit(&mut self, ui: &Value, path: &[PathStep]) -> Result<(), OrderError> {
        for i in 0..self.steps.len() {
            if self.steps[i] == path {
                self.emit(i);
            }
        }

        let (indices, keys) = self.children(path);

        match ui.get("ui:order").and_then(Value::as_array) {
            Some(order) if !keys.is_empty() => {
                let names = expand_order(order, &keys, path)?;
                for name in &names {
                    self.visit_key(ui, path, name)?;
                }
                for key in keys.iter().filter(|k| !names.contains(*k)) {
                    self.visit_key(ui, path, key)?;
                }
            }
            _ => {
                for key in &keys {
                    self.visit_key(ui, path, key)?;
                }
            }
        }

        for index in indices {
            let mut child = path.to_vec();
            child.push(PathStep {
                key: index,
                indexed: true,
            });
            self.visit(ui.get("items").unwrap_or(&Value::Null), &child)?;
        }

        Ok(())
    }

    fn visit_key(&mut self, ui: &Value, path: &[PathStep], key: &str) -> Result<(), OrderError> {
        let mut child = path.to_vec();
        child.push(PathStep {
            key: key.to_string(),
            indexed: false,
        });
        self.visit(ui.get(key).unwrap_or(&Value::Null), &child)
    }

    /// Distinct child segments below `path` carrying errors: array indices
    /// sorted numerically, object keys in encounter order.
    fn children(&self, path: &[PathStep]) -> (Vec<String>, Vec<String>) {
        let mut indices: Vec<String> = Vec::new();
        let mut keys: Vec<String> = Vec::new();

        for steps in &self.steps {
            if steps.len() <= path.len() || !steps.starts_with(path) {
                continue;
            }
            let next = &steps[path.len()];
            let bucket = if next.indexed { &mut indices } else { &mut keys };
            if !bucket.contains(&next.key) {
                bucket.push(next.key.clone());
            }
        }

        indices.sort_by_key(|i| i.parse::<usize>().unwrap_or(usize::MAX));
        (indices, keys)
    }
}

/// Expand a `ui:order` list against the child keys that carry errors.
fn expand_order(
    order: &[Value],
    keys: &[String],
    path: &[PathStep],
) -> Result<Vec<String>, OrderError> {
    let declared: Vec<&str> = order.iter().filter_map(Value::as_str).collect();
    let wildcards = declared.iter().filter(|n| **n == ORDER_WILDCARD).count();
    if wildcards > 1 {
        return Err(OrderError::MultipleWildcards {
            path: to_property(path),
        });
    }

    let mut names = Vec::with_capacity(declared.len() + keys.len());
    for name in &declared {
        if *name == ORDER_WILDCARD {
            names.extend(
                keys.iter()
                    .filter(|k| !declared.contains(&k.as_str()))
                    .cloned(),
            );
        } else {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn to_property(path: &[PathStep]) -> String {
    path.iter()
        .map(|step| {
            if step.indexed {
                format!("[{}]", step.key)
            } else {
                format!(".{}", step.key)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors(properties: &[&str]) -> Vec<FlatError> {
        properties
            .iter()
            .map(|p| FlatError::new(*p, "is invalid"))
            .collect()
    }

    fn properties(ordered: &[FlatError]) -> Vec<&str> {
        ordered.iter().map(|e| e.property.as_str()).collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn follows_declared_order() {
        let input = errors(&[".bar", ".foo"]);
        let ordered = order_errors_by_ui_schema(&input, &json!({ "ui:order": ["foo", "bar"] })).unwrap();
        assert_eq!(properties(&ordered), [".foo", ".bar"]);
    }

    #[test]
    fn wildcard_takes_unnamed_in_encounter_order() {
        let input = errors(&[".foo", ".bar", ".qux", ".quuz"]);
        let ui = json!({ "ui:order": ["foo", "*", "bar"] });
        let ordered = order_errors_by_ui_schema(&input, &ui).unwrap();
        assert_eq!(properties(&ordered), [".foo", ".qux", ".quuz", ".bar"]);
    }

    #[test]
    fn nested_orders_are_local() {
        let input = errors(&[".a.y", ".a.x", ".b", ".a"]);
        let ui = json!({
            "ui:order": ["b", "a"],
            "a": { "ui:order": ["x", "y"] }
        });
        let ordered = order_errors_by_ui_schema(&input, &ui).unwrap();
        assert_eq!(properties(&ordered), [".b", ".a", ".a.x", ".a.y"]);
    }

    #[test]
    fn array_errors_precede_item_errors() {
        let input = errors(&[".list[1].b", ".list", ".list[0].a", ".list[1].a", ""]);
        let ui = json!({
            "ui:order": ["list"],
            "list": { "items": { "ui:order": ["a", "b"] } }
        });
        let ordered = order_errors_by_ui_schema(&input, &ui).unwrap();
        assert_eq!(
            properties(&ordered),
            ["", ".list", ".list[0].a", ".list[1].a", ".list[1].b"]
        );
    }

    #[test]
    fn unnamed_children_still_reported() {
        let input = errors(&[".c", ".a", ".b"]);
        let ordered = order_errors_by_ui_schema(&input, &json!({ "ui:order": ["b"] })).unwrap();
        assert_eq!(properties(&ordered), [".b", ".c", ".a"]);
    }

    #[test]
    fn without_ui_order_keeps_validator_order() {
        let input = errors(&[".z", ".a.k", ".a"]);
        let ordered = order_errors_by_ui_schema(&input, &json!({})).unwrap();
        assert_eq!(properties(&ordered), [".z", ".a", ".a.k"]);
    }

    #[test]
    fn every_error_appears_once() {
        let mut input = errors(&[".a", ".a", ".b"]);
        input[1].message = "another".into();
        let ordered = order_errors_by_ui_schema(&input, &json!({ "ui:order": ["b", "*"] })).unwrap();
        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered[1].message, "is invalid");
        assert_eq!(ordered[2].message, "another");
    }

    #[test]
    fn multiple_wildcards_are_rejected() {
        let input = errors(&[".o.a"]);
        let ui = json!({ "o": { "ui:order": ["*", "a", "*"] } });
        let err = order_errors_by_ui_schema(&input, &ui).unwrap_err();
        assert_eq!(
            err,
            OrderError::MultipleWildcards {
                path: ".o".into()
            }
        );
    }

    #[test]
    fn orders_properties() {
        let props = names(&["a", "b", "c"]);
        assert_eq!(
            order_properties(&props, &names(&["c", "*"])).unwrap(),
            names(&["c", "a", "b"])
        );
        assert_eq!(
            order_properties(&props, &names(&["b", "c", "a", "ghost"])).unwrap(),
            names(&["b", "c", "a"])
        );
    }

    #[test]
    fn property_order_must_be_complete() {
        let props = names(&["a", "b", "c"]);
        let err = order_properties(&props, &names(&["a"])).unwrap_err();
        assert_eq!(err.to_string(), "uiSchema order list does not contain properties 'b', 'c'");

        let err = order_properties(&props, &names(&["*", "a", "*"])).unwrap_err();
        assert!(matches!(err, OrderError::MultipleWildcards { .. }));
    }

    #[test]
    fn numeric_object_keys_follow_declared_order() {
        let input = errors(&[".10", ".9", ".10.2", ".10.1"]);
        let ui = json!({
            "ui:order": ["10", "9"],
            "10": { "ui:order": ["1", "2"] }
        });
        let ordered = order_errors_by_ui_schema(&input, &ui).unwrap();
        assert_eq!(properties(&ordered), [".10", ".10.1", ".10.2", ".9"]);
    }

    #[test]
    fn bracketed_and_dotted_digits_are_distinct() {
        let input = errors(&[".m.1", ".m[1]", ".m[0]"]);
        let ui = json!({ "m": { "ui:order": ["1"] } });
        let ordered = order_errors_by_ui_schema(&input, &ui).unwrap();
        assert_eq!(properties(&ordered), [".m.1", ".m[0]", ".m[1]"]);
    }
}
