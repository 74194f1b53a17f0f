//! The `func` type.

use crate::foundation::SchemaError;
use crate::schema::rule::{NodeContext, Rule, context};
use crate::schema::{Evaluate, Inner, Schema, map, typed_schema};
use crate::value::Value;

typed_schema!(
    /// Functions, checked by declared arity.
    FuncSchema,
    "func"
);

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FuncInner;

impl Evaluate for FuncInner {
    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        value.is_function()
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "function.base"
    }
}

fn arity_rule(name: &'static str, code: &'static str, n: usize, holds: fn(usize, usize) -> bool) -> Rule {
    Rule::test(name, Some(Value::from(n)), move |value, cx| {
        let arity = value.as_func().map_or(0, crate::value::Func::arity);
        if holds(arity, n) {
            return Ok(());
        }
        Err(cx.error(code, context!("n" => n)))
    })
}

impl FuncSchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Func))
    }

    /// Exactly `n` parameters.
    pub fn arity(self, n: usize) -> Self {
        let rule = arity_rule("arity", "function.arity", n, |a, n| a == n);
        map(self, |node| node.push_rule(rule))
    }

    /// At least `n` parameters; `n` must be positive.
    pub fn min_arity(self, n: usize) -> Result<Self, SchemaError> {
        if n == 0 {
            return Err(SchemaError::invalid_argument("min_arity", "n must be a strict positive integer"));
        }
        let rule = arity_rule("minArity", "function.minArity", n, |a, n| a >= n);
        Ok(map(self, |node| node.push_rule(rule)))
    }

    /// At most `n` parameters.
    pub fn max_arity(self, n: usize) -> Self {
        let rule = arity_rule("maxArity", "function.maxArity", n, |a, n| a <= n);
        map(self, |node| node.push_rule(rule))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn two_args() -> Func {
        Func::new(2, |args| args.first().cloned().unwrap_or_default())
    }

    #[test]
    fn checks_arity() {
        assert!(func().arity(2).validate(two_args()).is_ok());
        let error = func().arity(1).validate(two_args()).error.unwrap();
        assert_eq!(error.details()[0].code, "function.arity");
        assert_eq!(error.message(), "\"value\" must have an arity of 1");
        assert!(func().min_arity(0).is_err());
        assert!(func().min_arity(2).unwrap().max_arity(3).validate(two_args()).is_ok());
    }

    #[test]
    fn rejects_non_functions() {
        let error = func().validate("f").error.unwrap();
        assert_eq!(error.details()[0].code, "function.base");
    }
}
