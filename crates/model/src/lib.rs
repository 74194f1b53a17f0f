//! # nebula-model
//!
//! Declarative, composable validation of dynamic values.
//!
//! A schema describes what a value may look like: its base type, allowed and
//! denied values, rules, nested keys or items, conditions on sibling values.
//! Validating a value walks the schema and returns the converted value or a
//! [`ValidationError`] listing every failure with its path and error code.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nebula_model::prelude::*;
//! use serde_json::json;
//!
//! let schema = object! {
//!     "username" => string().alphanum().min(3).max(30).required(),
//!     "password" => string().regex(Regex::new("^[a-zA-Z0-9]{3,30}$")?),
//!     "access_token" => alternatives().try_([SchemaLike::from(string()), number().into()])?,
//!     "birth_year" => number().integer().min(1900).max(2013),
//! }?
//! .with("username", ["birth_year"])
//! .xor(["password", "access_token"]);
//!
//! let outcome = schema.validate(json!({ "username": "abc", "birth_year": 1994 }));
//! assert_eq!(outcome.error.unwrap().details()[0].code, "object.xor");
//! ```
//!
//! ## Modules
//!
//! - [`value`]: the dynamic [`Value`] tree
//! - [`foundation`]: errors, options, message templates and references
//! - [`schema`]: the immutable [`Schema`] node, the shared
//!   [`SchemaBuilder`] surface and the evaluation algorithm
//! - [`types`]: one typed builder per base type
//! - [`factory`]: the [`Model`] factory, extensions and the root operations

// Report carries its rendered message, path and context; rule and hook
// results return it by value on every failure.
#![allow(clippy::result_large_err)]

pub mod factory;
pub mod foundation;
mod macros;
pub mod prelude;
pub mod schema;
pub mod types;
pub mod value;

pub use factory::{
    AssertMessage, Extension, ExtensionRule, Model, alt, alternatives, any, array, assert, attempt, binary, bool,
    boolean, compile, date, defaults, describe, extend, func, is_ref, lazy, number, object, reach, reach_path,
    reference, string, validate, validate_with,
};
pub use foundation::{AssertError, Ref, SchemaError, ValidationError, ValidationOptions};
pub use schema::{Schema, SchemaBuilder, SchemaLike};
pub use value::Value;
