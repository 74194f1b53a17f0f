//! Benchmarks for schema validation
//!
//! Tests performance of:
//! - Scalar types with and without conversion
//! - Objects with dependencies and references
//! - Arrays of growing size
//! - Message rendering on failure

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nebula_model::prelude::*;
use serde_json::json;

// ============================================================================
// SCALARS
// ============================================================================

fn bench_scalars(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalars");

    let number_schema = number().min(0).max(100).integer();
    let native = Value::from(42);
    group.bench_function("number_native", |b| {
        b.iter(|| number_schema.validate(black_box(native.clone())))
    });
    group.bench_function("number_from_string", |b| {
        b.iter(|| number_schema.validate(black_box("42")))
    });

    let string_schema = string().trim().lowercase().min(3).max(30);
    group.bench_function("string_transforms", |b| {
        b.iter(|| string_schema.validate(black_box("  Hello World  ")))
    });

    let email = string().email();
    group.bench_function("string_email", |b| {
        b.iter(|| email.validate(black_box("someone@example.com")))
    });

    group.finish();
}

// ============================================================================
// OBJECTS
// ============================================================================

fn bench_objects(c: &mut Criterion) {
    let mut group = c.benchmark_group("objects");

    let account = object! {
        "username" => string().alphanum().min(3).max(30).required(),
        "password" => string().regex(Regex::new("^[a-zA-Z0-9]{3,30}$").unwrap()),
        "confirm" => reference("password"),
        "access_token" => alternatives().try_([SchemaLike::from(string()), number().into()]).unwrap(),
        "birth_year" => number().integer().min(1900).max(2013),
    }
    .unwrap()
    .with("username", ["birth_year"])
    .xor(["password", "access_token"]);

    let valid: Value = json!({
        "username": "abc",
        "password": "secret1",
        "confirm": "secret1",
        "birth_year": 1994,
    })
    .into();
    group.bench_function("account_valid", |b| {
        b.iter(|| account.validate(black_box(valid.clone())))
    });

    let invalid: Value = json!({ "username": "a!", "password": "x", "access_token": 1 }).into();
    group.bench_function("account_invalid_all_errors", |b| {
        let options = ValidationOptions::default().with_abort_early(false);
        b.iter(|| account.validate_with(black_box(invalid.clone()), &options))
    });

    group.finish();
}

// ============================================================================
// ARRAYS
// ============================================================================

fn bench_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("arrays");

    let schema = array().items([number().integer()]).unwrap().unique();
    for size in [10_usize, 100, 1000] {
        let input = Value::Array((0..size).map(Value::from).collect());
        group.bench_with_input(BenchmarkId::new("unique_numbers", size), &input, |b, input| {
            b.iter(|| schema.validate(black_box(input.clone())))
        });
    }

    group.finish();
}

// ============================================================================
// MESSAGES
// ============================================================================

fn bench_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("messages");

    let schema = object! { "a" => number().max(3) }.unwrap();
    let input: Value = json!({ "a": 10 }).into();

    group.bench_function("render_failure", |b| {
        b.iter(|| schema.validate(black_box(input.clone())).error)
    });

    let error = schema.validate(input.clone()).error.unwrap();
    group.bench_function("annotate", |b| b.iter(|| black_box(&error).annotate(true)));

    group.finish();
}

criterion_group!(benches, bench_scalars, bench_objects, bench_arrays, bench_messages);
criterion_main!(benches);
