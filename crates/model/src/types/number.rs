//! The `number` type.

use super::{Bound, predicate_rule, push_number_rule};
use crate::foundation::{Ref, SchemaError};
use crate::schema::rule::{Limit, NodeContext, Rule, context};
use crate::schema::{Evaluate, Inner, Schema, map, typed_schema};
use crate::value::{Value, as_safe_integer};

typed_schema!(
    /// Numbers. Numeric strings convert in convert mode.
    ///
    /// ```rust,ignore
    /// let age = number().integer().min(0).max(150);
    /// let price = number().precision(2).positive();
    /// ```
    NumberSchema,
    "number"
);

#[derive(Debug, Clone, Default)]
pub(crate) struct NumberInner {
    precision: Option<u32>,
}

impl NumberInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        if other.precision.is_some() {
            self.precision = other.precision;
        }
    }
}

fn scale(places: u32) -> f64 {
    10f64.powi(i32::try_from(places).unwrap_or(i32::MAX))
}

/// Digits after the decimal point in the shortest representation of `n`.
fn decimal_places(n: f64) -> u32 {
    let text = format!("{n:e}");
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return 0;
    };
    let fraction = mantissa.split_once('.').map_or(0, |(_, digits)| digits.len());
    let fraction = i64::try_from(fraction).unwrap_or(i64::MAX);
    let exponent = exponent.parse::<i64>().unwrap_or_default();
    u32::try_from((fraction - exponent).max(0)).unwrap_or(u32::MAX)
}

impl Evaluate for NumberInner {
    fn coerce(&self, value: &Value, _cx: &NodeContext<'_>) -> Option<Value> {
        let n = match value {
            Value::Number(n) => *n,
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite())?,
            _ => return None,
        };
        let n = match self.precision {
            Some(places) if n.is_finite() => (n * scale(places)).round() / scale(places),
            _ => n,
        };
        match value {
            Value::Number(original) if original.to_bits() == n.to_bits() => None,
            _ => Some(Value::Number(n)),
        }
    }

    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        value.as_f64().is_some_and(|n| !n.is_nan())
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "number.base"
    }
}

impl NumberSchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Number(NumberInner::default())))
    }

    fn bound(self, bound: Bound, limit: Limit<f64>) -> Self {
        map(self, |node| push_number_rule(node, bound, limit))
    }

    /// Greater than or equal to `limit`.
    pub fn min(self, limit: impl Into<f64>) -> Self {
        self.bound(Bound::Min, Limit::Value(limit.into()))
    }

    pub fn min_ref(self, reference: impl Into<Ref>) -> Self {
        self.bound(Bound::Min, Limit::Ref(reference.into()))
    }

    /// Less than or equal to `limit`.
    pub fn max(self, limit: impl Into<f64>) -> Self {
        self.bound(Bound::Max, Limit::Value(limit.into()))
    }

    pub fn max_ref(self, reference: impl Into<Ref>) -> Self {
        self.bound(Bound::Max, Limit::Ref(reference.into()))
    }

    /// Strictly greater than `limit`.
    pub fn greater(self, limit: impl Into<f64>) -> Self {
        self.bound(Bound::Greater, Limit::Value(limit.into()))
    }

    pub fn greater_ref(self, reference: impl Into<Ref>) -> Self {
        self.bound(Bound::Greater, Limit::Ref(reference.into()))
    }

    /// Strictly less than `limit`.
    pub fn less(self, limit: impl Into<f64>) -> Self {
        self.bound(Bound::Less, Limit::Value(limit.into()))
    }

    pub fn less_ref(self, reference: impl Into<Ref>) -> Self {
        self.bound(Bound::Less, Limit::Ref(reference.into()))
    }

    /// A safe integer.
    pub fn integer(self) -> Self {
        let rule = predicate_rule("integer", "number.integer", None, |value, _| {
            value.as_f64().and_then(as_safe_integer).is_some()
        });
        map(self, |node| node.push_rule(rule))
    }

    /// At most `places` decimal places. In convert mode values are rounded
    /// to `places` first.
    pub fn precision(self, places: u32) -> Self {
        let rule = Rule::test("precision", Some(Value::from(places)), move |value, cx| {
            let n = value.as_f64().unwrap_or_default();
            if decimal_places(n) <= places {
                return Ok(());
            }
            Err(cx.error("number.precision", context!("limit" => places, "value" => n)))
        });
        map(self, |node| {
            if let Inner::Number(inner) = &mut node.inner {
                inner.precision = Some(places);
            }
            node.push_rule(rule);
        })
    }

    /// A multiple of `base`, which must be positive.
    pub fn multiple(self, base: impl Into<f64>) -> Result<Self, SchemaError> {
        let base = base.into();
        if !(base > 0.0 && base.is_finite()) {
            return Err(SchemaError::invalid_argument("multiple", "base must be a positive number"));
        }
        Ok(self.multiple_limit(Limit::Value(base)))
    }

    pub fn multiple_ref(self, reference: impl Into<Ref>) -> Self {
        self.multiple_limit(Limit::Ref(reference.into()))
    }

    fn multiple_limit(self, limit: Limit<f64>) -> Self {
        let reference = match &limit {
            Limit::Ref(reference) => Some(reference.clone()),
            Limit::Value(_) => None,
        };
        let rule = Rule::test("multiple", Some(limit.describe()), move |value, cx| {
            let base = limit.resolve(cx, "number")?;
            let n = value.as_f64().unwrap_or_default();
            if base != 0.0 && n % base == 0.0 {
                return Ok(());
            }
            Err(cx.error("number.multiple", context!("multiple" => base, "value" => n)))
        });
        map(self, |node| {
            if let Some(reference) = &reference {
                node.add_ref(reference);
            }
            node.push_rule(rule);
        })
    }

    pub fn positive(self) -> Self {
        let rule = predicate_rule("positive", "number.positive", None, |value, _| {
            value.as_f64().is_some_and(|n| n > 0.0)
        });
        map(self, |node| node.push_rule(rule))
    }

    pub fn negative(self) -> Self {
        let rule = predicate_rule("negative", "number.negative", None, |value, _| {
            value.as_f64().is_some_and(|n| n < 0.0)
        });
        map(self, |node| node.push_rule(rule))
    }

    /// An integer in `0..=65535`.
    pub fn port(self) -> Self {
        let rule = predicate_rule("port", "number.port", None, |value, _| {
            value
                .as_f64()
                .and_then(as_safe_integer)
                .is_some_and(|n| (0..=65_535).contains(&n))
        });
        map(self, |node| node.push_rule(rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn code(outcome: &Outcome) -> Option<String> {
        outcome.error.as_ref().map(|e| e.details()[0].code.clone())
    }

    #[rstest]
    #[case(1.0, 0)]
    #[case(1.5, 1)]
    #[case(123.45, 2)]
    #[case(0.001, 3)]
    #[case(1e21, 0)]
    fn counts_decimal_places(#[case] n: f64, #[case] expected: u32) {
        assert_eq!(decimal_places(n), expected);
    }

    #[test]
    fn converts_numeric_strings() {
        assert_eq!(number().validate(" 5 ").value, Some(Value::from(5)));
        assert_eq!(code(&number().validate("five")).as_deref(), Some("number.base"));
        assert_eq!(code(&number().validate("Infinity")).as_deref(), Some("number.base"));

        let strict = ValidationOptions::default().with_convert(false);
        assert_eq!(code(&number().validate_with("5", &strict)).as_deref(), Some("number.base"));
    }

    #[test]
    fn max_reports_limit_in_context() {
        let error = number().max(3).validate(10).error.unwrap();
        let detail = &error.details()[0];
        assert_eq!(detail.code, "number.max");
        assert_eq!(detail.context.get("limit"), Some(&Value::from(3)));
        assert_eq!(error.message(), "\"value\" must be less than or equal to 3");
    }

    #[test]
    fn precision_rounds_when_converting() {
        assert_eq!(number().precision(2).validate(1.236).value, Some(Value::from(1.24)));
        let strict = ValidationOptions::default().with_convert(false);
        assert_eq!(
            code(&number().precision(2).validate_with(1.236, &strict)).as_deref(),
            Some("number.precision")
        );
    }

    #[test]
    fn multiple_rejects_non_positive_base() {
        assert!(number().multiple(0).is_err());
        let schema = number().multiple(3).unwrap();
        assert!(schema.validate(9).is_ok());
        assert_eq!(code(&schema.validate(10)).as_deref(), Some("number.multiple"));
    }

    #[rstest]
    #[case(number().integer(), 1.5, "number.integer")]
    #[case(number().positive(), 0.0, "number.positive")]
    #[case(number().negative(), 0.0, "number.negative")]
    #[case(number().port(), 70000.0, "number.port")]
    #[case(number().greater(1), 1.0, "number.greater")]
    #[case(number().less(1), 1.0, "number.less")]
    fn sign_and_shape_rules(#[case] schema: NumberSchema, #[case] input: f64, #[case] expected: &str) {
        assert_eq!(code(&schema.validate(input)).as_deref(), Some(expected));
    }
}
