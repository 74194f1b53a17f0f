//! The evaluation algorithm.
//!
//! Every node is evaluated in the same order:
//!
//! 1. empty schema: a value matching it is treated as absent
//! 2. presence: required, forbidden, ignored or defaulted
//! 3. allowed values accept immediately, denied values fail
//! 4. coercion (only when converting), extension coerce hooks first
//! 5. base type check; a mismatch stops the node
//! 6. allowed and denied values again when coercion changed the value
//! 7. `allowOnly`
//! 8. cast, then extension pre hooks
//! 9. rules, in declaration order
//! 10. children (object keys, array items, alternatives)
//!
//! With `abort_early` a node returns at its first failure.

use std::future::{IntoFuture, Ready, ready};
use std::sync::LazyLock;

use super::Schema;
use super::flags::ErrorOverride;
use super::rule::{NodeContext, context};
use crate::foundation::state::State;
use crate::foundation::{Presence, Report, ValidationError, ValidationOptions};
use crate::value::Value;

pub(crate) static DEFAULT_OPTIONS: LazyLock<ValidationOptions> = LazyLock::new(ValidationOptions::default);

/// Result of evaluating one node.
///
/// A stripped node still returns its value so a parent object can keep it
/// visible to sibling references until every key is done; [`kept`](Self::kept)
/// applies the strip.
pub(crate) struct Evaluated {
    pub(crate) value: Option<Value>,
    pub(crate) errors: Vec<Report>,
    pub(crate) strip: bool,
}

impl Evaluated {
    pub(crate) fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The value as its container should store it.
    pub(crate) fn kept(self) -> Option<Value> {
        if self.strip { None } else { self.value }
    }
}

/// Evaluates `value` against `schema` at `state`.
pub(crate) fn evaluate(
    schema: &Schema,
    value: Option<Value>,
    state: &State<'_>,
    options: &ValidationOptions,
) -> Evaluated {
    let node = &*schema.0;
    let merged;
    let options = match &node.settings {
        Some(settings) => {
            merged = options.merged(settings);
            &merged
        }
        None => options,
    };

    let original = if node.flags.raw { value.clone() } else { None };
    let cx = NodeContext::new(node, state, options);
    let mut errors = Vec::new();
    let value = run(&cx, value, &mut errors);

    if !errors.is_empty() {
        let errors = match &node.flags.error {
            Some(ErrorOverride::Fixed(error)) => vec![Report::replaced(error.clone(), state.path.clone())],
            Some(ErrorOverride::Remap(remap)) => {
                let message = remap(&errors);
                vec![Report::overridden(message, state.path.clone(), errors)]
            }
            None => errors,
        };
        return Evaluated {
            value,
            errors,
            strip: false,
        };
    }

    Evaluated {
        value: original.or(value),
        errors,
        strip: node.flags.strip,
    }
}

enum Admission {
    Continue(Value),
    Done(Option<Value>),
    Delegate,
}

fn matches_empty(cx: &NodeContext<'_>, value: &Value) -> bool {
    cx.node.flags.empty.as_ref().is_some_and(|empty| {
        evaluate(empty, Some(value.clone()), &State::root(), &DEFAULT_OPTIONS).is_ok()
    })
}

fn admit(cx: &NodeContext<'_>, value: Option<Value>, errors: &mut Vec<Report>) -> Admission {
    let value = value.filter(|value| !matches_empty(cx, value));
    let presence = cx.node.flags.presence.unwrap_or(cx.options.presence);

    match (value, presence) {
        (Some(_), Presence::Forbidden) => {
            errors.push(cx.error("any.unknown", context!()));
            Admission::Done(None)
        }
        (Some(value), _) => Admission::Continue(value),
        (None, Presence::Required) => {
            errors.push(cx.error("any.required", context!()));
            Admission::Done(None)
        }
        (None, Presence::Forbidden) => Admission::Done(None),
        (None, Presence::Ignore) => Admission::Delegate,
        (None, Presence::Optional) => {
            let default = match &cx.node.flags.default {
                Some(default) if !cx.options.no_defaults => default,
                _ => return Admission::Done(None),
            };
            match default.produce(cx) {
                Ok(Some(value)) => Admission::Continue(value),
                Ok(None) => Admission::Done(None),
                Err(message) => {
                    errors.push(cx.error("any.default", context!("error" => message)));
                    Admission::Done(None)
                }
            }
        }
    }
}

/// Checks allowed then denied values. `true` ends the node.
fn settled_by_values(cx: &NodeContext<'_>, value: &Value, errors: &mut Vec<Report>) -> bool {
    let node = cx.node;
    if node.valids.has(value, cx, node.flags.insensitive) {
        return true;
    }
    if node.invalids.has(value, cx, node.flags.insensitive) {
        let code = if value.as_str() == Some("") {
            "any.empty"
        } else {
            "any.invalid"
        };
        errors.push(cx.error(
            code,
            context!("value" => value.clone(), "invalids" => node.invalids.describe()),
        ));
        return cx.options.abort_early;
    }
    false
}

fn run(cx: &NodeContext<'_>, value: Option<Value>, errors: &mut Vec<Report>) -> Option<Value> {
    let node = cx.node;
    let evaluator = node.inner.evaluator();

    let mut value = match admit(cx, value, errors) {
        Admission::Continue(value) => value,
        Admission::Done(value) => return value,
        Admission::Delegate => return evaluator.children(None, cx, errors),
    };

    if settled_by_values(cx, &value, errors) {
        return Some(value);
    }

    let mut changed = false;
    if cx.options.convert {
        for hook in &node.hooks.coerce {
            match hook(&value, cx) {
                Ok(next) => value = next,
                Err(report) => {
                    errors.push(report);
                    return Some(value);
                }
            }
            changed = true;
        }
        if let Some(coerced) = evaluator.coerce(&value, cx) {
            value = coerced;
            changed = true;
        }
    }

    if !evaluator.check_base(&value, cx) {
        errors.push(cx.error(evaluator.base_code(cx), context!("value" => value.clone())));
        return Some(value);
    }

    if changed && settled_by_values(cx, &value, errors) {
        return Some(value);
    }

    if node.flags.allow_only {
        errors.push(cx.error(
            "any.allowOnly",
            context!("value" => value.clone(), "valids" => node.valids.describe()),
        ));
        if cx.options.abort_early {
            return Some(value);
        }
    }

    let before = errors.len();
    value = evaluator.cast(value, cx, errors);
    if cx.options.abort_early && errors.len() > before {
        return Some(value);
    }

    for hook in &node.hooks.pre {
        match hook(&value, cx) {
            Ok(next) => value = next,
            Err(report) => {
                errors.push(report);
                return Some(value);
            }
        }
    }

    for rule in &node.rules {
        match (rule.check)(&value, cx) {
            Ok(Some(next)) => value = next,
            Ok(None) => {}
            Err(report) => {
                errors.push(report);
                if cx.options.abort_early {
                    return Some(value);
                }
            }
        }
    }

    evaluator.children(Some(value), cx, errors)
}

// ============================================================================
// ROOT VALIDATION
// ============================================================================

/// Result of a top-level validation.
///
/// `error` is `None` on success. `value` holds the converted value either
/// way; it is `None` when the input was absent and no default applied.
///
/// An outcome can be awaited; it resolves immediately.
#[derive(Debug, Clone)]
#[must_use]
pub struct Outcome {
    pub value: Option<Value>,
    pub error: Option<ValidationError>,
}

impl Outcome {
    /// `true` when validation succeeded.
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The accepted value, or the error.
    pub fn into_result(self) -> Result<Option<Value>, ValidationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }
}

impl IntoFuture for Outcome {
    type Output = Result<Option<Value>, ValidationError>;
    type IntoFuture = Ready<Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.into_result())
    }
}

pub(crate) fn validate_root(schema: &Schema, value: Option<Value>, options: &ValidationOptions) -> Outcome {
    tracing::trace!(schema = %schema.type_name(), "validation started");

    let object = value.clone();
    let result = evaluate(schema, value, &State::root(), options);
    if result.errors.is_empty() {
        tracing::trace!(schema = %schema.type_name(), "validation succeeded");
        return Outcome {
            value: result.kept(),
            error: None,
        };
    }

    let error = ValidationError::from_reports(&result.errors, object);
    tracing::debug!(
        schema = %schema.type_name(),
        code = error.details().first().map_or("override", |detail| detail.code.as_str()),
        details = error.details().len(),
        "validation failed"
    );
    Outcome {
        value: result.value,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn codes(outcome: &Outcome) -> Vec<String> {
        outcome
            .error
            .as_ref()
            .map(|error| error.details().iter().map(|d| d.code.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn valid_values_bypass_the_base_check() {
        let schema = number().allow(["x"]);
        assert!(schema.validate("x").is_ok());
        assert_eq!(codes(&schema.validate("y")), ["number.base"]);
    }

    #[test]
    fn invalid_values_fail_before_conversion() {
        let schema = number().invalid([5]);
        assert_eq!(codes(&schema.validate(5)), ["any.invalid"]);
        assert_eq!(codes(&schema.validate("5")), ["any.invalid"]);
    }

    #[test]
    fn empty_string_is_rejected_as_empty() {
        assert_eq!(codes(&string().validate("")), ["any.empty"]);
        assert!(string().allow([""]).validate("").is_ok());
    }

    #[test]
    fn defaults_are_validated() {
        let schema = number().max(3).default(10);
        let outcome = schema.validate_value(None, &ValidationOptions::default());
        assert_eq!(codes(&outcome), ["number.max"]);

        let schema = number().default(2);
        let outcome = schema.validate_value(None, &ValidationOptions::default());
        assert_eq!(outcome.value, Some(Value::from(2)));
    }

    #[test]
    fn no_defaults_option_skips_substitution() {
        let options = ValidationOptions::default().with_no_defaults(true);
        let outcome = number().default(2).validate_value(None, &options);
        assert!(outcome.is_ok());
        assert_eq!(outcome.value, None);
    }

    #[test]
    fn failing_generator_reports_any_default() {
        let schema = number().default_fn("boom", |_| Err("exploded".into()));
        let outcome = schema.validate_value(None, &ValidationOptions::default());
        assert_eq!(codes(&outcome), ["any.default"]);
        let error = outcome.error.unwrap();
        assert_eq!(error.details()[0].context.get("error"), Some(&Value::from("exploded")));
    }

    #[test]
    fn empty_schema_turns_matches_into_absence() {
        let schema = string().empty("").unwrap().default("none");
        let outcome = schema.validate("");
        assert_eq!(outcome.value, Some(Value::from("none")));
    }

    #[test]
    fn abort_early_stops_at_first_rule() {
        let schema = string().min(5).regex(regex::Regex::new("^[0-9]+$").unwrap());
        assert_eq!(codes(&schema.validate("ab")), ["string.min"]);

        let all = ValidationOptions::default().with_abort_early(false);
        assert_eq!(
            codes(&schema.validate_with("ab", &all)),
            ["string.min", "string.regex.base"]
        );
    }

    #[test]
    fn raw_returns_the_input() {
        let outcome = number().raw().validate("5");
        assert_eq!(outcome.value, Some(Value::from("5")));
    }

    #[test]
    fn strip_removes_the_root_value() {
        let outcome = number().strip().validate(1);
        assert!(outcome.is_ok());
        assert_eq!(outcome.value, None);
    }

    #[test]
    fn node_settings_override_call_options() {
        let schema = number().strict(true);
        assert_eq!(codes(&schema.validate("5")), ["number.base"]);
    }

    #[test]
    fn fixed_error_replaces_subtree_errors() {
        #[derive(Debug, thiserror::Error)]
        #[error("bad number")]
        struct Bad;

        let schema = object().keys([("a", number().error(Bad))]).unwrap();
        let error = schema.validate(json!({ "a": "x" })).error.unwrap();
        assert!(error.is_custom());
        assert_eq!(error.to_string(), "bad number");
    }

    #[test]
    fn remapped_error_keeps_details() {
        let schema = number().min(10).error_with(|reports| format!("{} problem(s)", reports.len()));
        let error = schema.validate(1).error.unwrap();
        assert_eq!(error.message(), "1 problem(s)");
        assert_eq!(error.details()[0].code, "number.min");
    }
}
