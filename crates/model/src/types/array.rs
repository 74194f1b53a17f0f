//! The `array` type.
//!
//! Items declared with [`ArraySchema::items`] are sorted by presence:
//!
//! - **required** items must each match at least one element
//! - **forbidden** items must match no element
//! - everything else is an inclusion, and every element must match one
//!
//! [`ArraySchema::ordered`] instead validates elements by position. An item
//! that validates to absence is reported as `array.sparse`, since arrays
//! cannot hold holes.

use std::sync::Arc;

use super::{Bound, parse_json, push_size_rule};
use crate::foundation::state::{Path, PathSegment, State};
use crate::foundation::{Presence, Ref, Report, SchemaError};
use crate::schema::rule::{Limit, NodeContext, Rule, context};
use crate::schema::{
    DEFAULT_OPTIONS, Description, Evaluate, Evaluated, Inner, Schema, SchemaBuilder, SchemaLike, compile, describe, evaluate,
    map, try_map, typed_schema,
};
use crate::value::Value;

typed_schema!(
    /// Arrays, validated item by item.
    ///
    /// ```rust,ignore
    /// let tags = array().items([string().max(16)])?.unique().max(8);
    /// let point = array().ordered([number(), number()])?;
    /// ```
    ArraySchema,
    "array"
);

type Comparator = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct ArrayInner {
    /// Items as declared, for describe.
    items: Vec<Schema>,
    inclusions: Vec<Schema>,
    requireds: Vec<Schema>,
    /// Forbidden items, made optional so a match means "present".
    exclusions: Vec<Schema>,
    ordereds: Vec<Schema>,
}

impl ArrayInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        self.items.extend(other.items.iter().cloned());
        self.inclusions.extend(other.inclusions.iter().cloned());
        self.requireds.extend(other.requireds.iter().cloned());
        self.exclusions.extend(other.exclusions.iter().cloned());
        self.ordereds.extend(other.ordereds.iter().cloned());
    }

    fn has_items(&self) -> bool {
        !self.inclusions.is_empty()
            || !self.requireds.is_empty()
            || !self.exclusions.is_empty()
            || !self.ordereds.is_empty()
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Where the element under check sits. A wrapped single value reports at
/// the array's own location.
struct Position<'a> {
    state: State<'a>,
    pos: usize,
}

impl<'a> Position<'a> {
    fn new(cx: &NodeContext<'a>, pos: usize, was_array: bool) -> Self {
        let state = if was_array {
            State {
                key: Some(PathSegment::Index(pos)),
                path: cx.state.path_to(PathSegment::Index(pos)),
                parent: cx.state.parent,
            }
        } else {
            State {
                key: cx.state.key.clone(),
                path: cx.state.path.clone(),
                parent: cx.state.parent,
            }
        };
        Self { state, pos }
    }

    fn path(&self) -> Path {
        self.state.path.clone()
    }
}

fn label_of(schema: &Schema) -> Option<Value> {
    schema.0.flags.label.clone().map(Value::String)
}

/// Reports required items that matched no element.
fn missed(cx: &NodeContext<'_>, requireds: &[&Schema], errors: &mut Vec<Report>) {
    let known: Vec<Value> = requireds.iter().filter_map(|schema| label_of(schema)).collect();
    let unknown = requireds.len() - known.len();
    let report = match (known.is_empty(), unknown) {
        (true, _) => cx.error("array.includesRequiredUnknowns", context!("unknownMisses" => unknown)),
        (false, 0) => cx.error("array.includesRequiredKnowns", context!("knownMisses" => known)),
        (false, _) => cx.error(
            "array.includesRequiredBoth",
            context!("knownMisses" => known, "unknownMisses" => unknown),
        ),
    };
    errors.push(report);
}

enum Check {
    /// Replace the element.
    Keep(Value),
    /// Remove the element.
    Drop,
    /// The element failed; leave it as it was.
    Failed,
}

impl Check {
    /// What a successful match does with the element.
    fn matched(result: Evaluated, cx: &NodeContext<'_>, at: &Position<'_>, errors: &mut Vec<Report>) -> Self {
        match (result.strip, result.value) {
            (true, _) => Self::Drop,
            (false, Some(value)) => Self::Keep(value),
            (false, None) => {
                errors.push(cx.error_with("array.sparse", context!("pos" => at.pos), at.path(), Vec::new()));
                Self::Failed
            }
        }
    }

    /// Applies the outcome at `i`; returns the next index.
    fn apply(self, items: &mut Vec<Value>, i: usize) -> usize {
        match self {
            Self::Keep(value) => {
                items[i] = value;
                i + 1
            }
            Self::Drop => {
                items.remove(i);
                i
            }
            Self::Failed => i + 1,
        }
    }
}

impl ArrayInner {
    /// Validates `items` in place, appending failures to `errors`.
    fn check_items(&self, items: &mut Vec<Value>, was_array: bool, cx: &NodeContext<'_>, errors: &mut Vec<Report>) {
        let abort = cx.options.abort_early;
        let strip_unknown = cx.options.strip_unknown.arrays();
        let inclusion_count = self.inclusions.len() + self.requireds.len();
        // Indices into `self.requireds` not matched yet.
        let mut pending: Vec<usize> = (0..self.requireds.len()).collect();
        let mut ordereds = self.ordereds.iter();

        let mut i = 0;
        while i < items.len() {
            let at = Position::new(cx, i, was_array);
            let item = items[i].clone();
            let before = errors.len();

            let check = 'check: {
                let excluded = self
                    .exclusions
                    .iter()
                    .any(|schema| evaluate(schema, Some(item.clone()), &at.state, &DEFAULT_OPTIONS).is_ok());
                if excluded {
                    let code = if was_array { "array.excludes" } else { "array.excludesSingle" };
                    errors.push(cx.error_with(code, context!("pos" => i, "value" => item), at.path(), Vec::new()));
                    break 'check Check::Failed;
                }

                if !self.ordereds.is_empty() {
                    if let Some(ordered) = ordereds.next() {
                        let result = evaluate(ordered, Some(item.clone()), &at.state, cx.options);
                        if result.is_ok() {
                            break 'check Check::matched(result, cx, &at, errors);
                        }
                        errors.push(cx.error_with(
                            "array.ordered",
                            context!("pos" => i, "value" => item),
                            at.path(),
                            result.errors,
                        ));
                        break 'check Check::Failed;
                    }
                    if inclusion_count == 0 {
                        errors.push(cx.error_with(
                            "array.orderedLength",
                            context!("pos" => i, "limit" => self.ordereds.len()),
                            at.path(),
                            Vec::new(),
                        ));
                        break 'check Check::Failed;
                    }
                }

                let mut failed_requireds = Vec::new();
                let mut satisfied = None;
                for (slot, &index) in pending.iter().enumerate() {
                    let result = evaluate(&self.requireds[index], Some(item.clone()), &at.state, cx.options);
                    if result.is_ok() {
                        satisfied = Some((slot, result));
                        break;
                    }
                    failed_requireds.push((index, result.errors));
                }
                if let Some((slot, result)) = satisfied {
                    pending.remove(slot);
                    break 'check Check::matched(result, cx, &at, errors);
                }

                // Requireds still pending already failed above; matched ones
                // keep accepting elements like any inclusion.
                let mut reasons = Vec::new();
                let candidates = self
                    .inclusions
                    .iter()
                    .map(|schema| (None, schema))
                    .chain(self.requireds.iter().enumerate().map(|(index, schema)| (Some(index), schema)));
                for (index, schema) in candidates {
                    let failure = index.and_then(|index| failed_requireds.iter().find(|(failed, _)| *failed == index));
                    if let Some((_, failure)) = failure {
                        reasons.clone_from(failure);
                        continue;
                    }
                    let result = evaluate(schema, Some(item.clone()), &at.state, cx.options);
                    if result.is_ok() {
                        break 'check Check::matched(result, cx, &at, errors);
                    }
                    reasons = result.errors;
                }

                if inclusion_count == 0 || (inclusion_count > 1 && self.inclusions.is_empty()) {
                    break 'check Check::Keep(item);
                }
                if strip_unknown {
                    break 'check Check::Drop;
                }
                let (code, reasons) = match (inclusion_count, was_array) {
                    (1, true) => ("array.includesOne", reasons),
                    (1, false) => ("array.includesOneSingle", reasons),
                    (_, true) => ("array.includes", Vec::new()),
                    (_, false) => ("array.includesSingle", Vec::new()),
                };
                errors.push(cx.error_with(code, context!("pos" => i, "value" => item), at.path(), reasons));
                Check::Failed
            };

            if abort && errors.len() > before {
                return;
            }
            i = check.apply(items, i);
        }

        if !pending.is_empty() {
            let missing: Vec<&Schema> = pending.iter().map(|&index| &self.requireds[index]).collect();
            missed(cx, &missing, errors);
        }
        let unmet: Vec<&Schema> = ordereds
            .filter(|schema| schema.0.flags.presence == Some(Presence::Required))
            .collect();
        if !unmet.is_empty() {
            missed(cx, &unmet, errors);
        }
    }
}

impl Evaluate for ArrayInner {
    fn coerce(&self, value: &Value, cx: &NodeContext<'_>) -> Option<Value> {
        if let Some(parsed) = parse_json(value, Value::is_array) {
            return Some(parsed);
        }
        if cx.node.flags.single && !value.is_array() {
            cx.wrapped.set(true);
            return Some(Value::Array(vec![value.clone()]));
        }
        None
    }

    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        value.is_array()
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "array.base"
    }

    fn children(&self, value: Option<Value>, cx: &NodeContext<'_>, errors: &mut Vec<Report>) -> Option<Value> {
        let value = value?;
        if !self.has_items() {
            return Some(value);
        }
        let Value::Array(mut items) = value else {
            return Some(value);
        };

        let was_array = !cx.wrapped.get();
        let original = items.clone();
        let mut found = Vec::new();
        self.check_items(&mut items, was_array, cx, &mut found);

        // A rejected array may still be one element of a single-value array.
        if !found.is_empty() && was_array && cx.options.convert && cx.node.flags.single {
            let mut wrapped = vec![Value::Array(original.clone())];
            let mut retry = Vec::new();
            self.check_items(&mut wrapped, false, cx, &mut retry);
            if retry.is_empty() {
                return Some(Value::Array(wrapped));
            }
        }

        if found.is_empty() {
            Some(Value::Array(items))
        } else {
            errors.extend(found);
            Some(Value::Array(original))
        }
    }

    fn describe(&self, description: &mut Description) {
        description.items = self.items.iter().map(describe).collect();
        description.ordereds = self.ordereds.iter().map(describe).collect();
    }
}

// ============================================================================
// BUILDER
// ============================================================================

fn array_inner(node: &mut crate::schema::Node) -> Option<&mut ArrayInner> {
    match &mut node.inner {
        Inner::Array(inner) => Some(inner),
        _ => None,
    }
}

fn compile_all<I>(schema: &ArraySchema, items: I) -> Result<Vec<Schema>, SchemaError>
where
    I: IntoIterator,
    I::Item: Into<SchemaLike>,
{
    let model = schema.0.model();
    items
        .into_iter()
        .enumerate()
        .map(|(index, like)| compile(&model, like.into()).map_err(|err| err.within(&index.to_string())))
        .collect()
}

fn unique_rule(arg: Option<Value>, same: Comparator) -> Rule {
    Rule::test("unique", arg, move |value, cx| {
        let Some(items) = value.as_array() else {
            return Ok(());
        };
        for (pos, item) in items.iter().enumerate() {
            if let Some(dupe) = items[..pos].iter().position(|seen| same(seen, item)) {
                return Err(cx.error_with(
                    "array.unique",
                    context!(
                        "pos" => pos,
                        "value" => item.clone(),
                        "dupePos" => dupe,
                        "dupeValue" => items[dupe].clone()
                    ),
                    cx.state.path_to(PathSegment::Index(pos)),
                    Vec::new(),
                ));
            }
        }
        Ok(())
    })
}

impl ArraySchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Array(ArrayInner::default())))
    }

    /// Allowed element types. Required items must appear, forbidden ones
    /// must not.
    pub fn items<I>(self, items: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<SchemaLike>,
    {
        let compiled = compile_all(&self, items)?;
        try_map(self, |node| {
            let inner = array_inner(node).ok_or_else(|| SchemaError::invalid_argument("items", "not an array schema"))?;
            for item in compiled {
                match item.0.flags.presence {
                    Some(Presence::Required) => inner.requireds.push(item.clone()),
                    Some(Presence::Forbidden) => inner.exclusions.push(item.clone().optional()),
                    _ => inner.inclusions.push(item.clone()),
                }
                inner.items.push(item);
            }
            Ok(())
        })
    }

    /// Element schemas by position. Extra elements need [`items`](Self::items).
    pub fn ordered<I>(self, items: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<SchemaLike>,
    {
        let compiled = compile_all(&self, items)?;
        try_map(self, |node| {
            let inner = array_inner(node).ok_or_else(|| SchemaError::invalid_argument("ordered", "not an array schema"))?;
            inner.ordereds.extend(compiled);
            Ok(())
        })
    }

    fn size(self, bound: Bound, limit: Limit<usize>) -> Self {
        map(self, |node| push_size_rule(node, "array", bound, limit))
    }

    /// At least `limit` elements.
    pub fn min(self, limit: usize) -> Self {
        self.size(Bound::Min, Limit::Value(limit))
    }

    pub fn min_ref(self, reference: impl Into<Ref>) -> Self {
        self.size(Bound::Min, Limit::Ref(reference.into()))
    }

    /// At most `limit` elements.
    pub fn max(self, limit: usize) -> Self {
        self.size(Bound::Max, Limit::Value(limit))
    }

    pub fn max_ref(self, reference: impl Into<Ref>) -> Self {
        self.size(Bound::Max, Limit::Ref(reference.into()))
    }

    /// Exactly `limit` elements.
    pub fn length(self, limit: usize) -> Self {
        self.size(Bound::Length, Limit::Value(limit))
    }

    pub fn length_ref(self, reference: impl Into<Ref>) -> Self {
        self.size(Bound::Length, Limit::Ref(reference.into()))
    }

    /// No two elements deeply equal.
    pub fn unique(self) -> Self {
        let rule = unique_rule(None, Arc::new(|a, b| a == b));
        map(self, |node| node.push_rule(rule))
    }

    /// No two elements `same` considers equal.
    pub fn unique_by<F>(self, same: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        let rule = unique_rule(Some(Value::from("custom")), Arc::new(same));
        map(self, |node| node.push_rule(rule))
    }

    /// In convert mode, a non-array value is validated as a one-element
    /// array.
    pub fn single(self, enabled: bool) -> Self {
        if self.0.0.flags.single == enabled {
            return self;
        }
        map(self, |node| node.flags.single = enabled)
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
    fn converts_items_in_place() {
        let schema = array().items([number()]).unwrap();
        assert_eq!(schema.validate(json!(["1", 2])).value, Some(Value::from(json!([1, 2]))));
        assert_eq!(schema.validate("[3]").value, Some(Value::from(json!([3]))));
    }

    #[test]
    fn a_single_inclusion_reports_its_reason() {
        let schema = array().items([number()]).unwrap();
        let error = schema.validate(json!([1, "x"])).error.unwrap();
        assert_eq!(error.details()[0].code, "number.base");
        assert_eq!(error.details()[0].path, vec![PathSegment::Index(1)]);
        assert_eq!(
            error.message(),
            "\"value\" at position 1 fails because [\"1\" must be a number]"
        );
    }

    #[test]
    fn several_inclusions_report_includes() {
        let schema = array().items([SchemaLike::from(number()), string().into()]).unwrap();
        assert!(schema.validate(json!([1, "a"])).is_ok());
        assert_eq!(codes(&schema.validate(json!([true]))), ["array.includes"]);
    }

    #[test]
    fn required_and_forbidden_items() {
        let schema = array()
            .items([
                SchemaLike::from(string().required().label("name")),
                number().required().into(),
                boolean().forbidden().into(),
            ])
            .unwrap();
        assert!(schema.validate(json!(["a", 1, "b", 2])).is_ok());
        assert_eq!(codes(&schema.validate(json!(["a", 1, true]))), ["array.excludes"]);
        assert_eq!(codes(&schema.validate(json!([1]))), ["array.includesRequiredKnowns"]);
        assert_eq!(codes(&schema.validate(json!(["a"]))), ["array.includesRequiredUnknowns"]);
        assert_eq!(codes(&schema.validate(json!([]))), ["array.includesRequiredBoth"]);
    }

    #[test]
    fn ordered_items() {
        let schema = array().ordered([SchemaLike::from(number().required()), string().into()]).unwrap();
        assert!(schema.validate(json!([1, "a"])).is_ok());
        assert_eq!(codes(&schema.validate(json!(["a"]))), ["number.base"]);
        assert_eq!(codes(&schema.validate(json!([1, "a", 2]))), ["array.orderedLength"]);
        assert_eq!(codes(&schema.validate(json!([]))), ["array.includesRequiredUnknowns"]);

        let open = schema.items([boolean()]).unwrap();
        assert!(open.validate(json!([1, "a", true])).is_ok());
    }

    #[test]
    fn stripped_items_are_removed() {
        let schema = array().items([SchemaLike::from(number()), string().strip().into()]).unwrap();
        assert_eq!(schema.validate(json!([1, "a", 2])).value, Some(Value::from(json!([1, 2]))));
    }

    #[test]
    fn strip_unknown_drops_unmatched_items() {
        let schema = array().items([number()]).unwrap();
        let options = ValidationOptions::default().with_strip_unknown(StripUnknown::Only {
            arrays: true,
            objects: false,
        });
        let outcome = schema.validate_with(json!([1, "x", 2]), &options);
        assert!(outcome.is_ok());
        assert_eq!(outcome.value, Some(Value::from(json!([1, 2]))));
    }

    #[test]
    fn items_that_validate_to_absence_are_sparse() {
        let schema = array().items([any().empty(0).unwrap()]).unwrap();
        assert_eq!(codes(&schema.validate(json!([1, 0]))), ["array.sparse"]);
    }

    #[test]
    fn unique_compares_deeply_or_by_comparator() {
        let schema = array().unique();
        assert!(schema.validate(json!([{ "a": 1 }, { "a": 2 }])).is_ok());
        let error = schema.validate(json!([{ "a": 1 }, { "a": 1 }])).error.unwrap();
        assert_eq!(error.details()[0].code, "array.unique");
        assert_eq!(error.details()[0].path, vec![PathSegment::Index(1)]);

        let by_id = array().unique_by(|a, b| a.get("id") == b.get("id"));
        assert_eq!(
            codes(&by_id.validate(json!([{ "id": 1, "x": 1 }, { "id": 1, "x": 2 }]))),
            ["array.unique"]
        );
    }

    #[test]
    fn single_wraps_non_arrays() {
        let schema = array().items([number()]).unwrap().single(true);
        assert_eq!(schema.validate(5).value, Some(Value::from(json!([5]))));
        assert_eq!(codes(&schema.validate("x")), ["number.base"]);
        assert_eq!(codes(&array().validate(5)), ["array.base"]);

        let strict = ValidationOptions::default().with_convert(false);
        assert_eq!(codes(&schema.validate_with(5, &strict)), ["array.base"]);
    }

    #[test]
    fn single_retries_arrays_as_one_element() {
        let schema = array().items([array().items([number()]).unwrap()]).unwrap().single(true);
        assert_eq!(schema.validate(json!([1, 2])).value, Some(Value::from(json!([[1, 2]]))));
    }

    #[test]
    fn sizes_count_elements() {
        let schema = array().min(1).max(2);
        assert_eq!(codes(&schema.validate(json!([]))), ["array.min"]);
        assert_eq!(codes(&schema.validate(json!([1, 2, 3]))), ["array.max"]);

        let referenced = object()
            .keys([
                ("n", SchemaLike::from(number())),
                ("list", array().length_ref("n").into()),
            ])
            .unwrap();
        assert!(referenced.validate(json!({ "n": 2, "list": [1, 2] })).is_ok());
        assert_eq!(codes(&referenced.validate(json!({ "n": 2, "list": [1] }))), ["array.length"]);
    }

    #[test]
    fn items_reference_the_arrays_parent() {
        let schema = object()
            .keys([
                ("limit", SchemaLike::from(number())),
                ("values", array().items([number().max_ref("limit")]).unwrap().into()),
            ])
            .unwrap();
        assert!(schema.validate(json!({ "limit": 3, "values": [1, 3] })).is_ok());
        assert_eq!(
            codes(&schema.validate(json!({ "limit": 3, "values": [4] }))),
            ["number.max"]
        );
    }

    #[test]
    fn describe_lists_items() {
        let description = array().items([number()]).unwrap().ordered([string()]).unwrap().describe();
        assert_eq!(description.items.len(), 1);
        assert_eq!(description.ordereds[0].type_name, "string");
    }
}
