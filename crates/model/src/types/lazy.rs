//! The `lazy` type: a schema produced on demand.
//!
//! The generator runs on every evaluation, which is what lets a schema refer
//! to itself without a cyclic node graph:
//!
//! ```rust,ignore
//! fn tree() -> Result<ObjectSchema, SchemaError> {
//!     object! {
//!         "name" => string().required(),
//!         "children" => array().items([lazy(tree)])?,
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::foundation::{Report, SchemaError};
use crate::schema::rule::{NodeContext, context};
use crate::schema::{Evaluate, Inner, Schema, SchemaLike, compile, evaluate, typed_schema};
use crate::value::Value;

typed_schema!(
    /// Whatever the generated schema accepts.
    LazySchema,
    "lazy"
);

type Generator = Arc<dyn Fn() -> Result<SchemaLike, SchemaError> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct LazyInner {
    generate: Generator,
}

impl fmt::Debug for LazyInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyInner").finish_non_exhaustive()
    }
}

impl LazyInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        self.generate = Arc::clone(&other.generate);
    }
}

impl Evaluate for LazyInner {
    fn check_base(&self, _value: &Value, _cx: &NodeContext<'_>) -> bool {
        true
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "lazy.base"
    }

    fn children(&self, value: Option<Value>, cx: &NodeContext<'_>, errors: &mut Vec<Report>) -> Option<Value> {
        let model = cx.node.model.clone().unwrap_or_else(crate::factory::Model::root);
        let schema = match (self.generate)().and_then(|like| compile(&model, like)) {
            Ok(schema) => schema,
            Err(err) => {
                tracing::debug!(error = %err, "lazy schema generation failed");
                errors.push(cx.error("lazy.schema", context!("error" => err.to_string())));
                return value;
            }
        };
        let result = evaluate(&schema, value, cx.state, cx.options);
        if result.is_ok() {
            return result.kept();
        }
        errors.extend(result.errors);
        result.value
    }
}

impl LazySchema {
    pub(crate) fn new<F, S>(generate: F) -> Self
    where
        F: Fn() -> Result<S, SchemaError> + Send + Sync + 'static,
        S: Into<SchemaLike>,
    {
        let generate: Generator = Arc::new(move || generate().map(Into::into));
        Self(Schema::new(Inner::Lazy(LazyInner { generate })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree() -> Result<ObjectSchema, SchemaError> {
        object! {
            "name" => string().required(),
            "children" => array().items([lazy(tree)])?,
        }
    }

    #[test]
    fn recursive_schemas_validate_every_level() {
        let schema = tree().unwrap();
        let input = json!({ "name": "root", "children": [{ "name": "a", "children": [{ "name": "b" }] }] });
        assert!(schema.validate(input).is_ok());

        let error = schema
            .validate(json!({ "name": "root", "children": [{ "children": [{}] }] }))
            .error
            .unwrap();
        assert_eq!(error.details()[0].code, "any.required");
        assert_eq!(
            error.details()[0].path,
            vec![PathSegment::from("children"), PathSegment::Index(0), PathSegment::from("name")]
        );
    }

    #[test]
    fn generator_failures_report_lazy_schema() {
        let broken = lazy(|| Err::<Schema, _>(SchemaError::InvalidContent { path: None }));
        assert_eq!(broken.validate(1).error.unwrap().details()[0].code, "lazy.schema");
    }

    #[test]
    fn generated_values_are_returned() {
        let schema = lazy(|| Ok(number()));
        assert_eq!(schema.validate("4").value, Some(Value::from(4)));
    }
}
