//! Behavioural laws every schema obeys.

use nebula_model::prelude::*;
use nebula_model::{compile, describe};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn codes(outcome: &Outcome) -> Vec<String> {
    outcome
        .error
        .as_ref()
        .map(|error| error.details().iter().map(|detail| detail.code.clone()).collect())
        .unwrap_or_default()
}

// ============================================================================
// PRESENCE
// ============================================================================

#[test]
fn optional_keys_may_be_absent() {
    let schema = object! { "a" => number() }.unwrap();
    let outcome = schema.validate(json!({}));
    assert!(outcome.is_ok());
    assert_eq!(outcome.value.unwrap().get("a"), None);
}

#[test]
fn required_keys_report_one_detail_at_their_path() {
    let schema = object! { "a" => number().required() }.unwrap();
    let error = schema.validate(json!({})).error.unwrap();
    assert_eq!(error.details().len(), 1);
    assert_eq!(error.details()[0].code, "any.required");
    assert_eq!(error.details()[0].path, vec![PathSegment::from("a")]);
    assert_eq!(error.message(), "child \"a\" fails because [\"a\" is required]");
}

#[test]
fn forbidden_keys_must_be_absent() {
    let schema = object! { "a" => any().forbidden() }.unwrap();
    assert!(schema.validate(json!({})).is_ok());
    assert_eq!(codes(&schema.validate(json!({ "a": 1 }))), ["any.unknown"]);
}

#[test]
fn presence_option_applies_to_unmarked_keys() {
    let schema = object! { "a" => number(), "b" => number().optional() }.unwrap();
    let options = ValidationOptions::default().with_presence(Presence::Required);
    assert_eq!(codes(&schema.validate_with(json!({ "b": 1 }), &options)), ["any.required"]);
    assert!(schema.validate_with(json!({ "a": 1 }), &options).is_ok());
}

// ============================================================================
// DEPENDENCIES
// ============================================================================

#[rstest]
#[case(json!({}), Some("object.missing"))]
#[case(json!({ "a": 1 }), None)]
#[case(json!({ "b": 1 }), None)]
#[case(json!({ "a": 1, "b": 1 }), Some("object.xor"))]
fn xor_truth_table(#[case] input: serde_json::Value, #[case] expected: Option<&str>) {
    let schema = object! { "a" => any(), "b" => any() }.unwrap().xor(["a", "b"]);
    let outcome = schema.validate(input);
    assert_eq!(codes(&outcome).first().map(String::as_str), expected);
}

#[rstest]
#[case(json!({}), None)]
#[case(json!({ "a": 1 }), Some("object.and"))]
#[case(json!({ "b": 1 }), Some("object.and"))]
#[case(json!({ "a": 1, "b": 1 }), None)]
fn and_truth_table(#[case] input: serde_json::Value, #[case] expected: Option<&str>) {
    let schema = object! { "a" => any(), "b" => any() }.unwrap().and(["a", "b"]);
    assert_eq!(codes(&schema.validate(input)).first().map(String::as_str), expected);
}

#[rstest]
#[case(json!({}), Some("object.missing"))]
#[case(json!({ "a": 1 }), None)]
#[case(json!({ "a": 1, "b": 1 }), None)]
fn or_truth_table(#[case] input: serde_json::Value, #[case] expected: Option<&str>) {
    let schema = object! { "a" => any(), "b" => any() }.unwrap().or(["a", "b"]);
    assert_eq!(codes(&schema.validate(input)).first().map(String::as_str), expected);
}

#[rstest]
#[case(json!({ "a": 1 }), Some("object.with"))]
#[case(json!({ "a": 1, "b": 1 }), None)]
#[case(json!({ "b": 1 }), None)]
fn with_truth_table(#[case] input: serde_json::Value, #[case] expected: Option<&str>) {
    let schema = object! { "a" => any(), "b" => any() }.unwrap().with("a", ["b"]);
    assert_eq!(codes(&schema.validate(input)).first().map(String::as_str), expected);
}

#[rstest]
#[case(json!({ "a": 1 }), None)]
#[case(json!({ "a": 1, "b": 1 }), Some("object.without"))]
#[case(json!({ "b": 1 }), None)]
fn without_truth_table(#[case] input: serde_json::Value, #[case] expected: Option<&str>) {
    let schema = object! { "a" => any(), "b" => any() }.unwrap().without("a", ["b"]);
    assert_eq!(codes(&schema.validate(input)).first().map(String::as_str), expected);
}

#[test]
fn defaults_count_as_present_for_dependencies() {
    let schema = object! { "a" => number().default(1), "b" => number() }
        .unwrap()
        .xor(["a", "b"]);
    assert!(schema.validate(json!({})).is_ok());
    assert_eq!(codes(&schema.validate(json!({ "b": 2 }))), ["object.xor"]);
}

#[test]
fn empty_string_is_invalid_not_absent() {
    let schema = object! { "a" => string(), "b" => string() }.unwrap().xor(["a", "b"]);
    let outcome = schema.validate(json!({ "a": "" }));
    assert_eq!(codes(&outcome), ["any.empty"]);
}

// ============================================================================
// ABORT EARLY
// ============================================================================

#[test]
fn abort_early_controls_the_number_of_details() {
    let schema = object! { "a" => number(), "b" => string() }.unwrap();
    let input = json!({ "a": "x", "b": 1 });

    let first = schema.validate(input.clone());
    assert_eq!(codes(&first), ["number.base"]);

    let all = ValidationOptions::default().with_abort_early(false);
    let every = schema.validate_with(input, &all);
    assert_eq!(codes(&every), ["number.base", "string.base"]);
}

// ============================================================================
// ALTERNATIVES
// ============================================================================

#[test]
fn first_matching_alternative_wins() {
    let schema = alternatives()
        .try_([SchemaLike::from(number()), string().into()])
        .unwrap();
    assert_eq!(schema.validate("5").value, Some(Value::from(5)));

    let reversed = alternatives()
        .try_([SchemaLike::from(string()), number().into()])
        .unwrap();
    assert_eq!(reversed.validate("5").value, Some(Value::from("5")));
}

#[test]
fn failed_alternatives_report_every_candidate() {
    let schema = alternatives()
        .try_([SchemaLike::from(number()), boolean().into()])
        .unwrap();
    let all = ValidationOptions::default().with_abort_early(false);
    assert_eq!(codes(&schema.validate_with("x", &all)), ["number.base", "boolean.base"]);
}

// ============================================================================
// CONCRETE SCENARIO
// ============================================================================

#[test]
fn number_max_reports_its_limit() {
    let schema = object! {
        "a" => number().min(0).max(3),
        "b" => string().valid(["a", "b", "c"]),
    }
    .unwrap();
    let error = schema.validate(json!({ "a": 10, "b": "a" })).error.unwrap();
    let detail = &error.details()[0];
    assert_eq!(detail.code, "number.max");
    assert_eq!(detail.path, vec![PathSegment::from("a")]);
    assert_eq!(detail.context.get("limit"), Some(&Value::from(3)));
    assert_eq!(detail.message, "\"a\" must be less than or equal to 3");
}

// ============================================================================
// IMMUTABILITY
// ============================================================================

#[test]
fn repeated_no_op_setters_return_the_same_node() {
    let schema = object().unknown(true);
    let again = schema.clone().unknown(true);
    assert!(again.as_schema().ptr_eq(schema.as_schema()));

    let required = number().required();
    assert!(required.clone().required().as_schema().ptr_eq(required.as_schema()));
}

#[test]
fn derived_schemas_leave_the_original_untouched() {
    let base = number().min(0);
    let derived = base.clone().max(10);
    assert!(!derived.as_schema().ptr_eq(base.as_schema()));

    assert!(base.validate(11).is_ok());
    assert_eq!(codes(&derived.validate(11)), ["number.max"]);
    assert!(base.validate(11).is_ok());
}

// ============================================================================
// COMPILE AND DESCRIBE
// ============================================================================

#[rstest]
#[case(json!("a"), "string")]
#[case(json!(1), "number")]
#[case(json!(true), "boolean")]
#[case(json!({ "a": 1 }), "object")]
#[case(json!([1, "a"]), "alternatives")]
fn describing_a_compiled_literal_is_stable(#[case] literal: serde_json::Value, #[case] expected: &str) {
    let schema = compile(literal).unwrap();
    let first = describe(&schema).unwrap();
    let second = describe(&schema).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.type_name, expected);
}

#[test]
fn undefined_leaves_fail_with_their_path() {
    let like = SchemaLike::Object(vec![(
        "a".to_owned(),
        SchemaLike::Object(vec![("b".to_owned(), SchemaLike::Undefined)]),
    )]);
    let err = compile(like).unwrap_err();
    assert_eq!(err.to_string(), "Invalid schema content: (a.b)");
}
