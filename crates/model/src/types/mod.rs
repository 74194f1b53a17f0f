//! Typed schema builders
//!
//! One builder per base type. Each wraps a [`Schema`](crate::schema::Schema),
//! implements [`SchemaBuilder`](crate::schema::SchemaBuilder) for the shared
//! surface and adds the methods only its type understands, so calling a
//! string rule on a number schema does not compile.
//!
//! | Builder                | Accepts                                         |
//! |------------------------|-------------------------------------------------|
//! | [`AnySchema`]          | anything                                        |
//! | [`StringSchema`]       | strings                                         |
//! | [`NumberSchema`]       | numbers, numeric strings when converting        |
//! | [`BooleanSchema`]      | booleans, `"true"`/`"false"`, truthy/falsy sets |
//! | [`DateSchema`]         | dates, timestamps and date strings              |
//! | [`BinarySchema`]       | bytes, encoded strings                          |
//! | [`FuncSchema`]         | functions                                       |
//! | [`ObjectSchema`]       | objects, JSON object strings                    |
//! | [`ArraySchema`]        | arrays, JSON array strings                      |
//! | [`AlternativesSchema`] | whatever one of its candidates accepts          |
//! | [`LazySchema`]         | whatever its generated schema accepts           |

pub mod alternatives;
pub mod any;
pub mod array;
pub mod binary;
pub mod boolean;
pub mod date;
pub mod func;
pub mod lazy;
pub mod number;
pub mod object;
pub mod string;

pub use alternatives::AlternativesSchema;
pub use any::AnySchema;
pub use array::ArraySchema;
pub use binary::{BinarySchema, Encoding};
pub use boolean::BooleanSchema;
pub use date::{DateBound, DateSchema, TimestampUnit};
pub use func::FuncSchema;
pub use lazy::LazySchema;
pub use number::NumberSchema;
pub use object::{ObjectSchema, RenameOptions};
pub use string::{PatternOptions, StringSchema};

use crate::schema::Node;
use crate::schema::rule::{Limit, NodeContext, Rule, context};
use crate::value::Value;

// ============================================================================
// SIZE RULES
// ============================================================================

/// Comparison a size or number rule applies against its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bound {
    Min,
    Max,
    Length,
    Greater,
    Less,
}

impl Bound {
    const fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Length => "length",
            Self::Greater => "greater",
            Self::Less => "less",
        }
    }

    fn holds<T: PartialOrd>(self, actual: T, limit: T) -> bool {
        match self {
            Self::Min => actual >= limit,
            Self::Max => actual <= limit,
            Self::Length => actual == limit,
            Self::Greater => actual > limit,
            Self::Less => actual < limit,
        }
    }
}

/// Adds a `<kind>.<bound>` rule over the value's length (characters, bytes,
/// items or keys).
pub(crate) fn push_size_rule(node: &mut Node, kind: &'static str, bound: Bound, limit: Limit<usize>) {
    if let Limit::Ref(reference) = &limit {
        node.add_ref(reference);
    }
    let rule = Rule::test(bound.name(), Some(limit.describe()), move |value, cx| {
        let limit = limit.resolve(cx, kind)?;
        let size = value.len().unwrap_or_default();
        if bound.holds(size, limit) {
            return Ok(());
        }
        Err(cx.error(
            format!("{kind}.{}", bound.name()),
            context!("limit" => limit, "value" => value.clone()),
        ))
    });
    node.push_rule(rule);
}

/// Adds a `number.<bound>` rule.
pub(crate) fn push_number_rule(node: &mut Node, bound: Bound, limit: Limit<f64>) {
    if let Limit::Ref(reference) = &limit {
        node.add_ref(reference);
    }
    let rule = Rule::test(bound.name(), Some(limit.describe()), move |value, cx| {
        let limit = limit.resolve(cx, "number")?;
        let n = value.as_f64().unwrap_or(f64::NAN);
        if bound.holds(n, limit) {
            return Ok(());
        }
        Err(cx.error(
            format!("number.{}", bound.name()),
            context!("limit" => limit, "value" => value.clone()),
        ))
    });
    node.push_rule(rule);
}

/// A rule that fails with `code` when `test` rejects the value.
pub(crate) fn predicate_rule(
    name: &'static str,
    code: &'static str,
    arg: Option<Value>,
    test: impl Fn(&Value, &NodeContext<'_>) -> bool + Send + Sync + 'static,
) -> Rule {
    Rule::test(name, arg, move |value, cx| {
        if test(value, cx) {
            Ok(())
        } else {
            Err(cx.error(code, context!("value" => value.clone())))
        }
    })
}

/// Parses a JSON string into a value when it yields the wanted shape.
pub(crate) fn parse_json(value: &Value, wanted: fn(&Value) -> bool) -> Option<Value> {
    let text = value.as_str()?;
    let parsed: serde_json::Value = serde_json::from_str(text).ok()?;
    let parsed = Value::from(parsed);
    wanted(&parsed).then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_compare_inclusively_or_strictly() {
        assert!(Bound::Min.holds(3, 3));
        assert!(Bound::Max.holds(3, 3));
        assert!(!Bound::Greater.holds(3.0, 3.0));
        assert!(Bound::Less.holds(2.0, 3.0));
        assert!(!Bound::Length.holds(2, 3));
    }

    #[test]
    fn parses_json_of_the_wanted_shape_only() {
        let text = Value::from(r#"{"a":1}"#);
        assert!(parse_json(&text, Value::is_object).is_some());
        assert!(parse_json(&text, Value::is_array).is_none());
        assert!(parse_json(&Value::from("{"), Value::is_object).is_none());
    }
}
