//! The `boolean` type.

use crate::schema::rule::NodeContext;
use crate::schema::{Description, Evaluate, Inner, Schema, map, typed_schema};
use crate::value::Value;

typed_schema!(
    /// Booleans. `"true"` and `"false"` convert in convert mode; values in
    /// the truthy and falsy sets are accepted and mapped in any mode.
    ///
    /// ```rust,ignore
    /// let consent = boolean().truthy(["Y", "yes"]).falsy(["N", "no"]);
    /// ```
    BooleanSchema,
    "boolean"
);

#[derive(Debug, Clone)]
pub(crate) struct BooleanInner {
    truthy: Vec<Value>,
    falsy: Vec<Value>,
    insensitive: bool,
}

impl Default for BooleanInner {
    fn default() -> Self {
        Self {
            truthy: Vec::new(),
            falsy: Vec::new(),
            insensitive: true,
        }
    }
}

impl BooleanInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        self.truthy.extend(other.truthy.iter().cloned());
        self.falsy.extend(other.falsy.iter().cloned());
        self.insensitive = other.insensitive;
    }

    fn contains(&self, set: &[Value], value: &Value) -> bool {
        set.iter().any(|item| {
            if self.insensitive {
                value.eq_insensitive(item)
            } else {
                value == item
            }
        })
    }

    fn map(&self, value: &Value) -> Option<bool> {
        if let Some(b) = value.as_bool() {
            return Some(b);
        }
        if self.contains(&self.truthy, value) {
            return Some(true);
        }
        if self.contains(&self.falsy, value) {
            return Some(false);
        }
        None
    }
}

impl Evaluate for BooleanInner {
    fn coerce(&self, value: &Value, _cx: &NodeContext<'_>) -> Option<Value> {
        let text = value.as_str()?;
        let matches = |word: &str| {
            if self.insensitive {
                text.eq_ignore_ascii_case(word)
            } else {
                text == word
            }
        };
        if matches("true") {
            Some(Value::Bool(true))
        } else if matches("false") {
            Some(Value::Bool(false))
        } else {
            None
        }
    }

    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        self.map(value).is_some()
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "boolean.base"
    }

    fn cast(&self, value: Value, _cx: &NodeContext<'_>, _errors: &mut Vec<crate::foundation::Report>) -> Value {
        self.map(&value).map_or(value, Value::Bool)
    }

    fn describe(&self, description: &mut Description) {
        description.flag("insensitive", self.insensitive);
        description.truthy.clone_from(&self.truthy);
        description.falsy.clone_from(&self.falsy);
    }
}

fn inner(node: &mut crate::schema::Node) -> Option<&mut BooleanInner> {
    match &mut node.inner {
        Inner::Boolean(inner) => Some(inner),
        _ => None,
    }
}

impl BooleanSchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Boolean(BooleanInner::default())))
    }

    /// Values accepted as `true`.
    pub fn truthy<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.truthy.extend(values.into_iter().map(Into::into));
            }
        })
    }

    /// Values accepted as `false`.
    pub fn falsy<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.falsy.extend(values.into_iter().map(Into::into));
            }
        })
    }

    /// Whether string conversion and the truthy/falsy sets ignore case.
    /// On by default.
    pub fn insensitive(self, enabled: bool) -> Self {
        if matches!(&self.0.0.inner, Inner::Boolean(inner) if inner.insensitive == enabled) {
            return self;
        }
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.insensitive = enabled;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_words() {
        assert_eq!(boolean().validate("TRUE").value, Some(Value::from(true)));
        assert_eq!(boolean().validate("false").value, Some(Value::from(false)));
        assert!(!boolean().insensitive(false).validate("TRUE").is_ok());
        assert!(!boolean().validate("yes").is_ok());
    }

    #[test]
    fn maps_truthy_and_falsy_sets() {
        let schema = boolean().truthy(["Y", "1"]).falsy(["N"]);
        assert_eq!(schema.validate("y").value, Some(Value::from(true)));
        assert_eq!(schema.validate("N").value, Some(Value::from(false)));

        let strict = ValidationOptions::default().with_convert(false);
        assert_eq!(schema.validate_with("Y", &strict).value, Some(Value::from(true)));
        assert_eq!(
            boolean().validate(1).error.unwrap().details()[0].code,
            "boolean.base"
        );
    }

    #[test]
    fn insensitive_setter_is_identity_when_unchanged() {
        let schema = boolean();
        let same = schema.clone().insensitive(true);
        assert!(schema.as_schema().ptr_eq(same.as_schema()));
    }
}
