//! Literal to schema promotion.
//!
//! Anywhere a schema is expected, a [`SchemaLike`] is accepted: a built
//! schema passes through, a literal becomes a schema accepting exactly that
//! literal, a key list becomes an object schema, a list becomes alternatives
//! and a regex becomes a string pattern.

use regex::Regex;

use super::Schema;
use super::builder::SchemaBuilder;
use crate::factory::Model;
use crate::foundation::{Ref, SchemaError};
use crate::value::{Func, Value};

/// Something that compiles into a [`Schema`].
#[derive(Debug, Clone)]
pub enum SchemaLike {
    /// An already built schema.
    Schema(Schema),
    /// A literal accepted as the only valid value. Objects and arrays are
    /// compiled entry by entry.
    Value(Value),
    /// A pattern strings must match.
    Regex(Regex),
    /// A reference whose value is the only valid one.
    Ref(Ref),
    /// Object keys.
    Object(Vec<(String, SchemaLike)>),
    /// Alternatives, tried in order.
    Alternatives(Vec<SchemaLike>),
    /// Nothing: never compiles.
    Undefined,
}

impl SchemaLike {
    /// `true` for references.
    pub const fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    /// `true` for anything that is not already a schema or a reference.
    pub(crate) const fn is_literal(&self) -> bool {
        !matches!(self, Self::Schema(_) | Self::Ref(_))
    }
}

impl From<Schema> for SchemaLike {
    fn from(schema: Schema) -> Self {
        Self::Schema(schema)
    }
}

impl From<&Schema> for SchemaLike {
    fn from(schema: &Schema) -> Self {
        Self::Schema(schema.clone())
    }
}

impl From<Value> for SchemaLike {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<serde_json::Value> for SchemaLike {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<Regex> for SchemaLike {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

impl From<Ref> for SchemaLike {
    fn from(reference: Ref) -> Self {
        Self::Ref(reference)
    }
}

impl From<Func> for SchemaLike {
    fn from(func: Func) -> Self {
        Self::Value(Value::Function(func))
    }
}

macro_rules! impl_from_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SchemaLike {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_from_literal!(bool, i32, i64, u32, u64, usize, f64, &str, String);

impl<T: Into<Self>> From<Vec<T>> for SchemaLike {
    fn from(items: Vec<T>) -> Self {
        Self::Alternatives(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for SchemaLike {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

impl<K: Into<String>, V: Into<Self>> FromIterator<(K, V)> for SchemaLike {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ============================================================================
// COMPILE
// ============================================================================

/// Compiles `like` with the factories of `model`.
pub(crate) fn compile(model: &Model, like: SchemaLike) -> Result<Schema, SchemaError> {
    let schema = match like {
        SchemaLike::Schema(schema) => return Ok(schema),
        SchemaLike::Value(value) => compile_value(model, value)?,
        SchemaLike::Regex(regex) => model.string().regex(regex).into(),
        SchemaLike::Ref(reference) => model.any().valid_ref(reference).into(),
        SchemaLike::Object(entries) => model.object().keys(entries)?.into(),
        SchemaLike::Alternatives(items) => model.alternatives().try_(items)?.into(),
        SchemaLike::Undefined => return Err(SchemaError::InvalidContent { path: None }),
    };
    tracing::trace!(schema = %schema.type_name(), "compiled literal");
    Ok(schema)
}

fn compile_value(model: &Model, value: Value) -> Result<Schema, SchemaError> {
    Ok(match value {
        Value::Null => model.any().valid([Value::Null]).into(),
        Value::Bool(b) => model.boolean().valid([b]).into(),
        Value::Number(n) => model.number().valid([n]).into(),
        Value::String(s) => model.string().valid([s]).into(),
        Value::Date(d) => model.date().valid([d]).into(),
        Value::Binary(b) => model.binary().valid([Value::Binary(b)]).into(),
        Value::Function(_) => return Err(SchemaError::InvalidContent { path: None }),
        Value::Array(items) => model
            .alternatives()
            .try_(items.into_iter().map(SchemaLike::Value))?
            .into(),
        Value::Object(map) => model
            .object()
            .keys(map.into_iter().map(|(k, v)| (k, SchemaLike::Value(v))))?
            .into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use serde_json::json;

    #[test]
    fn literals_compile_to_their_type() {
        let root = Model::root();
        for (literal, expected) in [
            (SchemaLike::from("a"), "string"),
            (SchemaLike::from(1), "number"),
            (SchemaLike::from(true), "boolean"),
            (SchemaLike::from(Value::Null), "any"),
            (SchemaLike::from(json!({ "a": 1 })), "object"),
            (SchemaLike::from(json!([1, "a"])), "alternatives"),
            (SchemaLike::from(Regex::new("^a").unwrap()), "string"),
        ] {
            assert_eq!(compile(&root, literal).unwrap().type_name(), expected);
        }
    }

    #[test]
    fn compiled_literal_accepts_only_itself() {
        let schema = compile(&Model::root(), SchemaLike::from(json!({ "a": "x" }))).unwrap();
        assert!(schema.validate(json!({ "a": "x" })).is_ok());
        assert!(!schema.validate(json!({ "a": "y" })).is_ok());
    }

    #[test]
    fn nested_failures_carry_the_path() {
        let like = SchemaLike::Object(vec![(
            "a".to_owned(),
            SchemaLike::Object(vec![("b".to_owned(), SchemaLike::Undefined)]),
        )]);
        let err = compile(&Model::root(), like).unwrap_err();
        assert_eq!(err.to_string(), "Invalid schema content: (a.b)");
    }

    #[test]
    fn functions_do_not_compile() {
        let like = SchemaLike::from(Func::new(0, |_| Value::Null));
        assert_eq!(
            compile(&Model::root(), like).unwrap_err(),
            SchemaError::InvalidContent { path: None }
        );
    }

    #[test]
    fn schemas_pass_through() {
        let schema: Schema = number().into();
        let compiled = compile(&Model::root(), SchemaLike::from(&schema)).unwrap();
        assert!(compiled.ptr_eq(&schema));
    }
}
