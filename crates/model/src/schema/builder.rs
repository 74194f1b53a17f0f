//! The builder surface shared by every schema type.

use std::error::Error as StdError;
use std::sync::Arc;

use super::compile::{SchemaLike, compile};
use super::describe::{Description, describe};
use super::evaluate::{DEFAULT_OPTIONS, Outcome, validate_root};
use super::flags::{DefaultValue, Entry, ErrorOverride, GeneratorError};
use super::{Node, Schema};
use crate::foundation::{Presence, Ref, Report, SchemaError, Settings, ValidationOptions};
use crate::types::AlternativesSchema;
use crate::value::Value;

/// Applies `f` to a private copy of the builder's node.
pub(crate) fn map<S: SchemaBuilder>(builder: S, f: impl FnOnce(&mut Node)) -> S {
    S::from_schema(builder.into().map(f))
}

/// Like [`map`], for changes that can be rejected.
pub(crate) fn try_map<S: SchemaBuilder>(
    builder: S,
    f: impl FnOnce(&mut Node) -> Result<(), SchemaError>,
) -> Result<S, SchemaError> {
    let mut schema: Schema = builder.into();
    f(Arc::make_mut(&mut schema.0))?;
    Ok(S::from_schema(schema))
}

fn set_presence<S: SchemaBuilder>(builder: S, presence: Presence) -> S {
    if builder.as_ref().0.flags.presence == Some(presence) {
        return builder;
    }
    map(builder, |node| node.flags.presence = Some(presence))
}

// ============================================================================
// SCHEMA BUILDER
// ============================================================================

/// Methods available on every schema type.
///
/// All methods consume the builder and return a new one; the original node is
/// never modified once shared. Setters that would change nothing return the
/// same node.
///
/// # Examples
///
/// ```rust,ignore
/// use nebula_model::prelude::*;
///
/// let color = string().valid(["red", "green"]).label("color").required();
/// assert!(color.validate("red").error.is_none());
/// ```
pub trait SchemaBuilder: Sized + Clone + AsRef<Schema> + Into<Schema> {
    #[doc(hidden)]
    fn from_schema(schema: Schema) -> Self;

    /// The underlying node.
    fn as_schema(&self) -> &Schema {
        self.as_ref()
    }

    /// Converts into the untyped node.
    fn into_schema(self) -> Schema {
        self.into()
    }

    // ------------------------------------------------------------------------
    // Allowed and denied values
    // ------------------------------------------------------------------------

    /// Accepts `values` in addition to whatever the type accepts.
    #[must_use = "builder methods must be chained or built"]
    fn allow<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        map(self, |node| {
            for value in values {
                let entry = Entry::Value(value.into());
                node.invalids.remove(&entry);
                node.valids.add(entry);
            }
        })
    }

    /// Accepts only `values`.
    #[must_use = "builder methods must be chained or built"]
    fn valid<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        map(self.allow(values), |node| node.flags.allow_only = true)
    }

    /// Alias of [`valid`](Self::valid).
    #[must_use = "builder methods must be chained or built"]
    fn only<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.valid(values)
    }

    /// Alias of [`valid`](Self::valid).
    #[must_use = "builder methods must be chained or built"]
    fn equal<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.valid(values)
    }

    /// Accepts only the value `reference` resolves to, or any element of it
    /// when it resolves to an array.
    #[must_use = "builder methods must be chained or built"]
    fn valid_ref(self, reference: impl Into<Ref>) -> Self {
        let reference = reference.into();
        map(self, |node| {
            node.add_ref(&reference);
            let entry = Entry::Ref(reference);
            node.invalids.remove(&entry);
            node.valids.add(entry);
            node.flags.allow_only = true;
        })
    }

    /// Rejects `values` with `any.invalid` (`any.empty` for `""`).
    #[must_use = "builder methods must be chained or built"]
    fn invalid<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        map(self, |node| {
            for value in values {
                let entry = Entry::Value(value.into());
                node.valids.remove(&entry);
                node.invalids.add(entry);
            }
        })
    }

    /// Alias of [`invalid`](Self::invalid).
    #[must_use = "builder methods must be chained or built"]
    fn disallow<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.invalid(values)
    }

    /// Alias of [`invalid`](Self::invalid).
    #[must_use = "builder methods must be chained or built"]
    fn not<I>(self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.invalid(values)
    }

    /// Rejects the value `reference` resolves to.
    #[must_use = "builder methods must be chained or built"]
    fn invalid_ref(self, reference: impl Into<Ref>) -> Self {
        let reference = reference.into();
        map(self, |node| {
            node.add_ref(&reference);
            let entry = Entry::Ref(reference);
            node.valids.remove(&entry);
            node.invalids.add(entry);
        })
    }

    // ------------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------------

    /// Absence fails with `any.required`.
    #[must_use = "builder methods must be chained or built"]
    fn required(self) -> Self {
        set_presence(self, Presence::Required)
    }

    /// Alias of [`required`](Self::required).
    #[must_use = "builder methods must be chained or built"]
    fn exist(self) -> Self {
        self.required()
    }

    /// Absence is accepted.
    #[must_use = "builder methods must be chained or built"]
    fn optional(self) -> Self {
        set_presence(self, Presence::Optional)
    }

    /// Presence fails with `any.unknown`.
    #[must_use = "builder methods must be chained or built"]
    fn forbidden(self) -> Self {
        set_presence(self, Presence::Forbidden)
    }

    /// Removes the value from its parent once validated.
    #[must_use = "builder methods must be chained or built"]
    fn strip(self) -> Self {
        if self.as_ref().0.flags.strip {
            return self;
        }
        map(self, |node| node.flags.strip = true)
    }

    /// Returns the input as given instead of the converted value.
    #[must_use = "builder methods must be chained or built"]
    fn raw(self) -> Self {
        if self.as_ref().0.flags.raw {
            return self;
        }
        map(self, |node| node.flags.raw = true)
    }

    // ------------------------------------------------------------------------
    // Defaults and emptiness
    // ------------------------------------------------------------------------

    /// Substitutes `value` when absent. The default is validated like input.
    #[must_use = "builder methods must be chained or built"]
    fn default(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        map(self, |node| node.flags.default = Some(DefaultValue::Value(value)))
    }

    /// Substitutes the value `reference` resolves to when absent.
    #[must_use = "builder methods must be chained or built"]
    fn default_ref(self, reference: impl Into<Ref>) -> Self {
        let reference = reference.into();
        map(self, |node| {
            node.add_ref(&reference);
            node.flags.default = Some(DefaultValue::Ref(reference));
        })
    }

    /// Substitutes the result of `generate` when absent. The generator
    /// receives the parent container; an error fails with `any.default`.
    #[must_use = "builder methods must be chained or built"]
    fn default_fn<F>(self, description: impl Into<String>, generate: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<Value, GeneratorError> + Send + Sync + 'static,
    {
        let description = description.into();
        map(self, |node| {
            node.flags.default = Some(DefaultValue::Generator {
                description,
                generate: Arc::new(generate),
            });
        })
    }

    /// Values matching `schema` are treated as absent.
    fn empty(self, schema: impl Into<SchemaLike>) -> Result<Self, SchemaError> {
        let empty = compile(&self.as_ref().model(), schema.into())?;
        Ok(map(self, |node| node.flags.empty = Some(empty)))
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Name used for the value in messages.
    #[must_use = "builder methods must be chained or built"]
    fn label(self, label: impl Into<String>) -> Self {
        let label = label.into();
        map(self, |node| node.flags.label = Some(label))
    }

    #[must_use = "builder methods must be chained or built"]
    fn description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        map(self, |node| node.meta.description = Some(description))
    }

    #[must_use = "builder methods must be chained or built"]
    fn notes<I>(self, notes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        map(self, |node| node.meta.notes.extend(notes.into_iter().map(Into::into)))
    }

    #[must_use = "builder methods must be chained or built"]
    fn tags<I>(self, tags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        map(self, |node| node.meta.tags.extend(tags.into_iter().map(Into::into)))
    }

    #[must_use = "builder methods must be chained or built"]
    fn meta(self, meta: impl Into<Value>) -> Self {
        let meta = meta.into();
        map(self, |node| node.meta.meta.push(meta))
    }

    #[must_use = "builder methods must be chained or built"]
    fn example(self, example: impl Into<Value>) -> Self {
        let example = example.into();
        map(self, |node| node.meta.examples.push(example))
    }

    #[must_use = "builder methods must be chained or built"]
    fn unit(self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        map(self, |node| node.meta.unit = Some(unit))
    }

    // ------------------------------------------------------------------------
    // Options and errors
    // ------------------------------------------------------------------------

    /// Overrides validation options for this node and its subtree.
    #[must_use = "builder methods must be chained or built"]
    fn options(self, settings: Settings) -> Self {
        map(self, |node| {
            node.settings
                .get_or_insert_with(Settings::default)
                .merge(&settings);
        })
    }

    /// Disables conversion for this subtree when `strict`.
    #[must_use = "builder methods must be chained or built"]
    fn strict(self, strict: bool) -> Self {
        self.options(Settings::new().convert(!strict))
    }

    /// Replaces every failure of this subtree with `error`.
    #[must_use = "builder methods must be chained or built"]
    fn error<E>(self, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let error: Arc<dyn StdError + Send + Sync> = Arc::new(error);
        map(self, |node| node.flags.error = Some(ErrorOverride::Fixed(error)))
    }

    /// Replaces the message of this subtree's failures with the result of
    /// `remap`. The original reports stay available as details.
    #[must_use = "builder methods must be chained or built"]
    fn error_with<F>(self, remap: F) -> Self
    where
        F: Fn(&[Report]) -> String + Send + Sync + 'static,
    {
        map(self, |node| node.flags.error = Some(ErrorOverride::Remap(Arc::new(remap))))
    }

    // ------------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------------

    /// Merges the rules, values and flags of `other` into this schema.
    fn concat(self, other: impl AsRef<Schema>) -> Result<Self, SchemaError> {
        let merged = self.into().merge(other.as_ref())?;
        Ok(Self::from_schema(merged))
    }

    /// Turns this schema into a conditional: `then` or `otherwise` is merged
    /// into it depending on `condition`.
    fn when(self, condition: impl Into<Condition>, when: When) -> Result<AlternativesSchema, SchemaError> {
        crate::types::alternatives::when(self.into(), condition.into(), when)
    }

    /// Applies the extension rule `name` with positional `args`.
    fn rule<I>(self, name: &str, args: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let args = args.into_iter().map(Into::into).collect();
        crate::factory::apply_rule(self.into(), name, args).map(Self::from_schema)
    }

    // ------------------------------------------------------------------------
    // Use
    // ------------------------------------------------------------------------

    /// Plain-data description of this schema.
    fn describe(&self) -> Description {
        describe(self.as_ref())
    }

    /// Validates `value` with default options.
    fn validate(&self, value: impl Into<Value>) -> Outcome {
        validate_root(self.as_ref(), Some(value.into()), &DEFAULT_OPTIONS)
    }

    /// Validates `value` with `options`.
    fn validate_with(&self, value: impl Into<Value>, options: &ValidationOptions) -> Outcome {
        validate_root(self.as_ref(), Some(value.into()), options)
    }

    /// Validates a possibly absent value.
    fn validate_value(&self, value: Option<Value>, options: &ValidationOptions) -> Outcome {
        validate_root(self.as_ref(), value, options)
    }
}

impl SchemaBuilder for Schema {
    fn from_schema(schema: Schema) -> Self {
        schema
    }
}

// ============================================================================
// CONDITIONS
// ============================================================================

/// What a conditional tests.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Test the referenced value against `is`.
    Ref(Ref),
    /// Test the value itself against this schema.
    Peek(Schema),
}

impl From<Ref> for Condition {
    fn from(reference: Ref) -> Self {
        Self::Ref(reference)
    }
}

impl From<&str> for Condition {
    fn from(key: &str) -> Self {
        Self::Ref(Ref::new(key))
    }
}

impl From<String> for Condition {
    fn from(key: String) -> Self {
        Self::Ref(Ref::new(key))
    }
}

impl From<Schema> for Condition {
    fn from(schema: Schema) -> Self {
        Self::Peek(schema)
    }
}

/// Branches of a conditional.
///
/// ```rust,ignore
/// let b = number().when("a", When::new().is(true).then(number().min(10)))?;
/// ```
#[derive(Debug, Clone, Default)]
#[must_use = "builder methods must be chained or built"]
pub struct When {
    pub(crate) is: Option<SchemaLike>,
    pub(crate) then: Option<SchemaLike>,
    pub(crate) otherwise: Option<SchemaLike>,
}

impl When {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the referenced value must match. A literal must also be present.
    pub fn is(mut self, is: impl Into<SchemaLike>) -> Self {
        self.is = Some(is.into());
        self
    }

    /// Applied when the condition holds.
    pub fn then(mut self, then: impl Into<SchemaLike>) -> Self {
        self.then = Some(then.into());
        self
    }

    /// Applied when it does not.
    pub fn otherwise(mut self, otherwise: impl Into<SchemaLike>) -> Self {
        self.otherwise = Some(otherwise.into());
        self
    }
}

// ============================================================================
// TYPED WRAPPERS
// ============================================================================

/// Declares a typed builder over [`Schema`] with its conversions.
macro_rules! typed_schema {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        #[must_use = "builder methods must be chained or built"]
        pub struct $name(pub(crate) $crate::schema::Schema);

        impl AsRef<$crate::schema::Schema> for $name {
            fn as_ref(&self) -> &$crate::schema::Schema {
                &self.0
            }
        }

        impl From<$name> for $crate::schema::Schema {
            fn from(schema: $name) -> Self {
                schema.0
            }
        }

        impl TryFrom<$crate::schema::Schema> for $name {
            type Error = $crate::foundation::SchemaError;

            fn try_from(schema: $crate::schema::Schema) -> Result<Self, Self::Error> {
                if schema.kind() == $kind {
                    Ok(Self(schema))
                } else {
                    Err($crate::foundation::SchemaError::invalid_argument(
                        "try_from",
                        format!("expected a {} schema, got {}", $kind, schema.type_name()),
                    ))
                }
            }
        }

        impl $crate::schema::SchemaBuilder for $name {
            fn from_schema(schema: $crate::schema::Schema) -> Self {
                Self(schema)
            }
        }

        impl From<$name> for $crate::schema::SchemaLike {
            fn from(schema: $name) -> Self {
                Self::Schema(schema.0)
            }
        }

        impl From<$name> for $crate::schema::Condition {
            fn from(schema: $name) -> Self {
                Self::Peek(schema.0)
            }
        }
    };
}

pub(crate) use typed_schema;
