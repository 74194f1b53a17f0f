//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use nebula_model::prelude::*;
//!
//! let schema = object! {
//!     "username" => string().alphanum().min(3).max(30).required(),
//!     "birth_year" => number().integer().min(1900).max(2013),
//! }?;
//! ```

// ============================================================================
// FACTORIES
// ============================================================================

pub use crate::factory::{
    AssertMessage, Extension, ExtensionRule, Model, alt, alternatives, any, array, binary, bool, boolean, date, func,
    lazy, number, reference, string,
};
pub use crate::object;

// ============================================================================
// SCHEMAS
// ============================================================================

pub use crate::schema::{Condition, Description, NodeContext, Outcome, Schema, SchemaBuilder, SchemaLike, When};
pub use crate::types::{
    AlternativesSchema, AnySchema, ArraySchema, BinarySchema, BooleanSchema, DateBound, DateSchema, Encoding,
    FuncSchema, LazySchema, NumberSchema, ObjectSchema, PatternOptions, RenameOptions, StringSchema, TimestampUnit,
};

// ============================================================================
// FOUNDATION
// ============================================================================

pub use crate::foundation::{
    AssertError, Context, Detail, Language, PathSegment, Presence, Ref, RefScope, Report, SchemaError, Settings,
    StripUnknown, ValidationError, ValidationOptions,
};
pub use crate::value::{Func, Value};

pub use regex::Regex;
