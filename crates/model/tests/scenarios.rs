//! End-to-end validation scenarios.

use std::fmt;

use nebula_model::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn codes(outcome: &Outcome) -> Vec<String> {
    outcome
        .error
        .as_ref()
        .map(|error| error.details().iter().map(|detail| detail.code.clone()).collect())
        .unwrap_or_default()
}

fn json_of(outcome: Outcome) -> serde_json::Value {
    serde_json::to_value(outcome.value.expect("accepted value")).expect("serializable value")
}

// ============================================================================
// REFERENCES
// ============================================================================

#[test]
fn sibling_reference_must_match() {
    let schema = object! {
        "password" => string().required(),
        "confirm" => reference("password"),
    }
    .unwrap();

    assert!(schema.validate(json!({ "password": "x", "confirm": "x" })).is_ok());
    assert_eq!(
        codes(&schema.validate(json!({ "password": "x", "confirm": "y" }))),
        ["any.allowOnly"]
    );
}

#[test]
fn rule_limits_follow_references() {
    let schema = object! {
        "floor" => number(),
        "value" => number().min_ref("floor"),
    }
    .unwrap();

    assert!(schema.validate(json!({ "floor": 2, "value": 3 })).is_ok());
    assert_eq!(codes(&schema.validate(json!({ "floor": 5, "value": 3 }))), ["number.min"]);
}

#[test]
fn references_declared_later_resolve_first() {
    let schema = object! {
        "value" => number().max_ref("ceiling"),
        "ceiling" => number(),
    }
    .unwrap();
    assert_eq!(codes(&schema.validate(json!({ "value": "9", "ceiling": "4" }))), ["number.max"]);
}

#[test]
fn context_references_read_the_options() {
    let schema = number().max_ref("$limit");
    let options = ValidationOptions::default().with_context(json!({ "limit": 3 }));
    assert!(schema.validate_with(2, &options).is_ok());
    assert_eq!(codes(&schema.validate_with(4, &options)), ["number.max"]);
}

#[test]
fn root_references_start_at_the_top_level_value() {
    let schema = object! {
        "limits" => object! { "max" => number() }.unwrap(),
        "order" => object! { "qty" => number().max_ref("/limits.max") }.unwrap(),
    }
    .unwrap();

    assert!(schema.validate(json!({ "limits": { "max": 5 }, "order": { "qty": 5 } })).is_ok());
    assert_eq!(
        codes(&schema.validate(json!({ "limits": { "max": 5 }, "order": { "qty": 6 } }))),
        ["number.max"]
    );
}

#[test]
fn root_references_reach_into_their_own_branch() {
    let schema = object! {
        "a" => object! { "b" => number(), "c" => number().max_ref("/a.b") }.unwrap(),
    }
    .unwrap();
    assert!(schema.validate(json!({ "a": { "b": 5, "c": 3 } })).is_ok());
    assert_eq!(codes(&schema.validate(json!({ "a": { "b": 5, "c": 8 } }))), ["number.max"]);
}

#[test]
fn grandparent_references_see_converted_siblings() {
    let schema = object! {
        "line" => object! { "qty" => number().max_ref("...stock") }.unwrap(),
        "stock" => number(),
    }
    .unwrap();

    let value = json_of(schema.validate(json!({ "line": { "qty": 2 }, "stock": "3" })));
    assert_eq!(value, json!({ "line": { "qty": 2 }, "stock": 3 }));
    assert_eq!(
        codes(&schema.validate(json!({ "line": { "qty": 4 }, "stock": "3" }))),
        ["number.max"]
    );
}

#[test]
fn deeper_references_climb_one_level_per_dot() {
    let schema = object! {
        "outer" => object! {
            "inner" => object! { "v" => number().min_ref("....floor") }.unwrap(),
        }
        .unwrap(),
        "floor" => number().default(10),
    }
    .unwrap();

    assert!(schema.validate(json!({ "outer": { "inner": { "v": 10 } } })).is_ok());
    assert_eq!(
        codes(&schema.validate(json!({ "outer": { "inner": { "v": 9 } } }))),
        ["number.min"]
    );
}

#[test]
fn defaults_can_copy_a_sibling() {
    let schema = object! {
        "name" => string(),
        "display" => string().default_ref("name"),
    }
    .unwrap();
    let value = json_of(schema.validate(json!({ "name": "ada" })));
    assert_eq!(value, json!({ "name": "ada", "display": "ada" }));
}

// ============================================================================
// CONDITIONALS
// ============================================================================

#[test]
fn when_selects_a_branch_from_a_sibling() {
    let schema = object! {
        "kind" => string(),
        "size" => number()
            .when("kind", When::new().is("big").then(number().min(10)))
            .unwrap(),
    }
    .unwrap();

    assert_eq!(codes(&schema.validate(json!({ "kind": "big", "size": 5 }))), ["number.min"]);
    assert!(schema.validate(json!({ "kind": "big", "size": 12 })).is_ok());
    assert!(schema.validate(json!({ "kind": "small", "size": 5 })).is_ok());
    assert_eq!(
        codes(&schema.validate(json!({ "kind": "small", "size": "x" }))),
        ["number.base"]
    );
}

#[test]
fn when_can_forbid_a_key() {
    let schema = object! {
        "mode" => string(),
        "token" => any()
            .when(
                "mode",
                When::new().is("anonymous").then(any().forbidden()).otherwise(string().required()),
            )
            .unwrap(),
    }
    .unwrap();

    assert!(schema.validate(json!({ "mode": "anonymous" })).is_ok());
    assert_eq!(
        codes(&schema.validate(json!({ "mode": "anonymous", "token": "t" }))),
        ["any.unknown"]
    );
    assert_eq!(codes(&schema.validate(json!({ "mode": "user" }))), ["any.required"]);
}

// ============================================================================
// OBJECT SHAPING
// ============================================================================

#[test]
fn renames_move_keys_before_validation() {
    let schema = object! { "name" => string().required() }
        .unwrap()
        .rename("username", "name", RenameOptions::new())
        .unwrap();
    let value = json_of(schema.validate(json!({ "username": "ada" })));
    assert_eq!(value, json!({ "name": "ada" }));
}

#[test]
fn stripped_keys_leave_the_output() {
    let schema = object! {
        "keep" => number(),
        "drop" => any().strip(),
    }
    .unwrap();
    let value = json_of(schema.validate(json!({ "keep": 1, "drop": 2 })));
    assert_eq!(value, json!({ "keep": 1 }));
}

#[test]
fn strip_unknown_option_removes_undeclared_keys() {
    let schema = object! { "a" => number() }.unwrap();
    let options = ValidationOptions::default().with_strip_unknown(true);
    let value = json_of(schema.validate_with(json!({ "a": 1, "b": 2 }), &options));
    assert_eq!(value, json!({ "a": 1 }));
}

#[test]
fn pattern_keys_validate_matching_entries() {
    let schema = object()
        .pattern(Regex::new("^x-").unwrap(), number())
        .unwrap();
    assert!(schema.validate(json!({ "x-a": 1 })).is_ok());
    assert_eq!(codes(&schema.validate(json!({ "x-a": "no" }))), ["number.base"]);
    assert_eq!(codes(&schema.validate(json!({ "y": 1 }))), ["object.allowUnknown"]);
}

// ============================================================================
// ARRAYS
// ============================================================================

#[test]
fn array_items_are_converted() {
    let schema = array().items([number()]).unwrap();
    let value = json_of(schema.validate(json!(["1", 2])));
    assert_eq!(value, json!([1, 2]));
    assert!(!schema.validate(json!(["x"])).is_ok());
}

#[test]
fn unique_rejects_duplicates() {
    let schema = array().unique();
    assert!(schema.validate(json!([1, 2])).is_ok());
    assert_eq!(codes(&schema.validate(json!([1, 2, 1]))), ["array.unique"]);
}

#[test]
fn ordered_arrays_limit_their_length() {
    let schema = array().ordered([SchemaLike::from(string()), number().into()]).unwrap();
    assert!(schema.validate(json!(["a", 1])).is_ok());
    assert_eq!(codes(&schema.validate(json!(["a", 1, 2]))), ["array.orderedLength"]);
}

#[test]
fn array_size_rules() {
    let schema = array().min(1).max(2);
    assert_eq!(codes(&schema.validate(json!([]))), ["array.min"]);
    assert_eq!(codes(&schema.validate(json!([1, 2, 3]))), ["array.max"]);
}

// ============================================================================
// RECURSION
// ============================================================================

fn tree() -> Result<ObjectSchema, SchemaError> {
    object! {
        "value" => number().required(),
        "children" => array().items([lazy(tree)])?,
    }
}

#[test]
fn lazy_schemas_describe_recursive_shapes() {
    let schema = tree().unwrap();
    let input = json!({
        "value": 1,
        "children": [{ "value": 2, "children": [{ "value": 3 }] }],
    });
    assert!(schema.validate(input).is_ok());

    let broken = json!({ "value": 1, "children": [{ "children": [] }] });
    assert_eq!(codes(&schema.validate(broken)), ["any.required"]);
}

// ============================================================================
// EXTENSIONS
// ============================================================================

fn even_quantities() -> Model {
    Model::root()
        .extend([Extension::new("qty")
            .base(number())
            .rule(
                ExtensionRule::new("even")
                    .setup(|_, _| Ok(Some(number().integer().min(0).into())))
                    .validate(|_, value, cx| {
                        if value.as_f64().is_some_and(|n| n % 2.0 == 0.0) {
                            Ok(value.clone())
                        } else {
                            Err(cx.error("qty.even", Context::new()))
                        }
                    }),
            )])
        .unwrap()
}

#[test]
fn extension_rules_check_the_schema_their_setup_builds() {
    let model = even_quantities();
    let even = model.custom("qty").unwrap().rule("even", Vec::<Value>::new()).unwrap();
    let schema = object! { "pairs" => even }.unwrap();

    assert!(schema.validate(json!({ "pairs": 4 })).is_ok());
    assert_eq!(codes(&schema.validate(json!({ "pairs": 3 }))), ["qty.even"]);
    assert_eq!(codes(&schema.validate(json!({ "pairs": -2 }))), ["number.min"]);
    assert_eq!(codes(&schema.validate(json!({ "pairs": 2.5 }))), ["number.integer"]);
}

// ============================================================================
// MESSAGES
// ============================================================================

#[test]
fn root_values_use_the_value_label() {
    let error = number().validate("x").error.unwrap();
    assert_eq!(error.message(), "\"value\" must be a number");
}

#[test]
fn labels_replace_keys_in_messages() {
    let schema = object! { "age" => number().label("Age") }.unwrap();
    let error = schema.validate(json!({ "age": "x" })).error.unwrap();
    assert_eq!(error.details()[0].message, "\"Age\" must be a number");
}

#[test]
fn language_overrides_replace_templates() {
    let language = Language::new().with_message("number.base", "needs digits");
    let options = ValidationOptions::default().with_language(language);
    let error = number().validate_with("x", &options).error.unwrap();
    assert_eq!(error.message(), "\"value\" needs digits");
}

#[test]
fn node_options_override_call_options() {
    let schema = number().options(Settings::new().convert(false));
    assert_eq!(codes(&schema.validate("5")), ["number.base"]);
    assert!(number().validate("5").is_ok());
}

#[derive(Debug)]
struct Rejected;

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rejected")
    }
}

impl std::error::Error for Rejected {}

#[test]
fn fixed_errors_replace_the_subtree() {
    let schema = object! { "a" => number().error(Rejected) }.unwrap();
    let error = schema.validate(json!({ "a": "x" })).error.unwrap();
    assert!(error.is_custom());
    assert_eq!(std::error::Error::source(&error).map(ToString::to_string), Some("rejected".to_owned()));
}

// ============================================================================
// SERDE
// ============================================================================

#[test]
fn options_read_camel_case_json() {
    let options: ValidationOptions = serde_json::from_value(json!({
        "abortEarly": false,
        "stripUnknown": { "objects": true },
        "presence": "required",
        "language": { "number": { "base": "needs digits" } },
    }))
    .unwrap();

    assert!(!options.abort_early);
    assert!(options.strip_unknown.objects());
    assert!(!options.strip_unknown.arrays());
    assert_eq!(options.presence, Presence::Required);
    assert_eq!(options.language.get("number.base"), Some("needs digits"));
    assert!(options.convert);
}

#[test]
fn details_serialize_with_a_type_key() {
    let schema = object! { "a" => number().max(3) }.unwrap();
    let error = schema.validate(json!({ "a": 10 })).error.unwrap();
    let detail = serde_json::to_value(&error.details()[0]).unwrap();

    assert_eq!(detail["type"], json!("number.max"));
    assert_eq!(detail["path"], json!(["a"]));
    assert_eq!(detail["context"]["limit"], json!(3));
    assert_eq!(detail["message"], json!("\"a\" must be less than or equal to 3"));
}

#[test]
fn descriptions_serialize_as_plain_data() {
    let schema = object! { "a" => number().min(1).required() }.unwrap();
    let description = serde_json::to_value(schema.describe()).unwrap();
    assert_eq!(description["type"], json!("object"));
    assert_eq!(description["children"]["a"]["type"], json!("number"));
    assert_eq!(description["children"]["a"]["flags"]["presence"], json!("required"));
}
