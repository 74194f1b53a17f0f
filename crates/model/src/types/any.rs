//! The `any` type: no shape constraint of its own.

use crate::schema::rule::NodeContext;
use crate::schema::{Evaluate, Inner, Schema, typed_schema};
use crate::value::Value;

typed_schema!(
    /// Accepts any present value; the starting point for literal and
    /// reference-only schemas.
    ///
    /// ```rust,ignore
    /// let schema = any().valid([1, 2]).required();
    /// ```
    AnySchema,
    "any"
);

impl AnySchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Any))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AnyInner;

impl Evaluate for AnyInner {
    fn check_base(&self, _value: &Value, _cx: &NodeContext<'_>) -> bool {
        true
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "any.base"
    }
}
