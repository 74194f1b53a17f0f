//! Literal macros.

// ============================================================================
// OBJECT MACRO
// ============================================================================

/// Builds an object schema from `key => schema` pairs.
///
/// Values may be anything that converts into a
/// [`SchemaLike`](crate::schema::SchemaLike): built schemas, literals,
/// references or regexes. Expands to
/// `Result<ObjectSchema, SchemaError>`, failing when a value does not
/// compile or sibling references form a cycle.
///
/// ```rust,ignore
/// use nebula_model::prelude::*;
///
/// let user = object! {
///     "name" => string().required(),
///     "age" => number().integer().min(0),
///     "role" => "admin",
/// }?;
/// ```
#[macro_export]
macro_rules! object {
    () => {
        $crate::object().keys(::std::iter::empty::<(::std::string::String, $crate::schema::SchemaLike)>())
    };
    ($($key:expr => $schema:expr),+ $(,)?) => {
        $crate::object().keys([
            $( (::std::string::String::from($key), $crate::schema::SchemaLike::from($schema)) ),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use serde_json::json;

    #[test]
    fn builds_keys_in_order() {
        let schema = object! {
            "b" => number(),
            "a" => "fixed",
        }
        .unwrap();
        let children = schema.describe().children.unwrap();
        assert_eq!(children.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert!(schema.validate(json!({ "a": "fixed", "b": 1 })).is_ok());
    }

    #[test]
    fn empty_object_declares_no_keys() {
        let schema = object! {}.unwrap();
        assert!(schema.validate(json!({})).is_ok());
        assert_eq!(
            schema.validate(json!({ "a": 1 })).error.unwrap().details()[0].code,
            "object.allowUnknown"
        );
    }
}
