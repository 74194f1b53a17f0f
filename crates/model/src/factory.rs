//! Schema factories, extensions and the root operations.
//!
//! A [`Model`] builds schemas. The root model backs the free functions of
//! this crate ([`string`], [`object`], [`validate`], ...). A customised model
//! comes from [`Model::extend`], which registers new types derived from a
//! base schema, or from [`Model::defaults`], which passes every schema the
//! model builds through a function. Schemas remember the model that built
//! them, so literals compiled further down (object keys, array items,
//! alternatives) pick up the same types and defaults.
//!
//! ```rust,ignore
//! let model = Model::root().extend([Extension::new("amount")
//!     .base(number())
//!     .coerce(|value, _| Ok(parse_suffix(value)))
//!     .message("round", "must be a round amount")
//!     .rule(ExtensionRule::new("round").validate(|_, value, cx| {
//!         if value.as_f64().is_some_and(|n| n.fract() == 0.0) {
//!             Ok(value.clone())
//!         } else {
//!             Err(cx.error("amount.round", Context::new()))
//!         }
//!     }))])?;
//!
//! let price = model.custom("amount")?.rule("round", Vec::<Value>::new())?;
//! ```

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;

use crate::foundation::{AssertError, Language, Ref, Report, SchemaError, Settings, ValidationOptions};
use crate::schema::rule::Rule;
use crate::schema::{
    self, DEFAULT_OPTIONS, DescribeHook, Description, Hook, Inner, NodeContext, Outcome, Schema, SchemaBuilder, SchemaLike,
};
use crate::types::{
    AlternativesSchema, AnySchema, ArraySchema, BinarySchema, BooleanSchema, DateSchema, FuncSchema, LazySchema,
    NumberSchema, ObjectSchema, StringSchema,
};
use crate::value::Value;

const BUILT_IN: [&str; 11] = [
    "any",
    "string",
    "number",
    "boolean",
    "date",
    "binary",
    "func",
    "object",
    "array",
    "alternatives",
    "lazy",
];

// ============================================================================
// MODEL
// ============================================================================

type DefaultsFn = Arc<dyn Fn(Schema) -> Schema + Send + Sync>;

struct ModelInner {
    /// Extension templates by type name. Templates never point back at the
    /// model that holds them.
    types: IndexMap<String, Schema>,
    defaults: Option<DefaultsFn>,
}

static ROOT: LazyLock<Model> = LazyLock::new(|| {
    Model(Arc::new(ModelInner {
        types: IndexMap::new(),
        defaults: None,
    }))
});

/// A schema factory.
///
/// Cloning is cheap. Customising never changes the model it starts from:
/// [`extend`](Self::extend) and [`defaults`](Self::defaults) return a new
/// one.
#[derive(Clone)]
pub struct Model(Arc<ModelInner>);

impl Model {
    /// The factory behind the free functions of this crate.
    pub fn root() -> Self {
        ROOT.clone()
    }

    fn is_root(&self) -> bool {
        Arc::ptr_eq(&self.0, &ROOT.0)
    }

    /// Records this model on a node built by it.
    fn stamp(&self, schema: Schema) -> Schema {
        if self.is_root() {
            return schema;
        }
        schema.map(|node| node.model = Some(self.clone()))
    }

    /// Builds a schema of base type `kind`: the registered template of that
    /// name if any, else `fresh`, with the defaults function applied.
    fn produce<S: SchemaBuilder>(&self, kind: &str, fresh: impl FnOnce() -> S) -> S {
        let base = self
            .0
            .types
            .get(kind)
            .cloned()
            .unwrap_or_else(|| fresh().into());
        let stamped = self.stamp(base);
        let Some(defaults) = &self.0.defaults else {
            return S::from_schema(stamped);
        };
        let defaulted = defaults(stamped.clone());
        if defaulted.kind() == stamped.kind() {
            S::from_schema(defaulted)
        } else {
            tracing::warn!(expected = %kind, found = %defaulted.type_name(), "defaults changed the schema type");
            S::from_schema(stamped)
        }
    }

    pub fn any(&self) -> AnySchema {
        self.produce("any", AnySchema::new)
    }

    pub fn string(&self) -> StringSchema {
        self.produce("string", StringSchema::new)
    }

    pub fn number(&self) -> NumberSchema {
        self.produce("number", NumberSchema::new)
    }

    pub fn boolean(&self) -> BooleanSchema {
        self.produce("boolean", BooleanSchema::new)
    }

    /// Alias of [`boolean`](Self::boolean).
    pub fn bool(&self) -> BooleanSchema {
        self.boolean()
    }

    pub fn date(&self) -> DateSchema {
        self.produce("date", DateSchema::new)
    }

    pub fn binary(&self) -> BinarySchema {
        self.produce("binary", BinarySchema::new)
    }

    pub fn func(&self) -> FuncSchema {
        self.produce("func", FuncSchema::new)
    }

    pub fn object(&self) -> ObjectSchema {
        self.produce("object", ObjectSchema::new)
    }

    pub fn array(&self) -> ArraySchema {
        self.produce("array", ArraySchema::new)
    }

    pub fn alternatives(&self) -> AlternativesSchema {
        self.produce("alternatives", AlternativesSchema::new)
    }

    /// Alias of [`alternatives`](Self::alternatives).
    pub fn alt(&self) -> AlternativesSchema {
        self.alternatives()
    }

    /// A schema generated by `generate` on every evaluation.
    pub fn lazy<F, S>(&self, generate: F) -> LazySchema
    where
        F: Fn() -> Result<S, SchemaError> + Send + Sync + 'static,
        S: Into<SchemaLike>,
    {
        self.produce("lazy", || LazySchema::new(generate))
    }

    /// A schema of the registered type `name`, built-in or extension.
    pub fn custom(&self, name: &str) -> Result<Schema, SchemaError> {
        match name {
            "any" => Ok(self.any().into()),
            "string" => Ok(self.string().into()),
            "number" => Ok(self.number().into()),
            "boolean" => Ok(self.boolean().into()),
            "date" => Ok(self.date().into()),
            "binary" => Ok(self.binary().into()),
            "func" => Ok(self.func().into()),
            "object" => Ok(self.object().into()),
            "array" => Ok(self.array().into()),
            "alternatives" => Ok(self.alternatives().into()),
            _ if self.0.types.contains_key(name) => Ok(self.produce(name, AnySchema::new).into()),
            _ => Err(SchemaError::UnknownType { name: name.to_owned() }),
        }
    }

    /// Names of the extension types this model registered.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.0.types.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------------
    // Root operations
    // ------------------------------------------------------------------------

    /// Turns a literal into a schema built by this model.
    pub fn compile(&self, like: impl Into<SchemaLike>) -> Result<Schema, SchemaError> {
        schema::compile(self, like.into())
    }

    /// Describes a schema or a literal.
    pub fn describe(&self, like: impl Into<SchemaLike>) -> Result<Description, SchemaError> {
        self.compile(like).map(|schema| schema::describe(&schema))
    }

    /// Validates `value` against a schema or a literal with default options.
    pub fn validate(&self, value: impl Into<Value>, like: impl Into<SchemaLike>) -> Result<Outcome, SchemaError> {
        self.validate_with(value, like, &DEFAULT_OPTIONS)
    }

    /// Validates `value` with `options`.
    pub fn validate_with(
        &self,
        value: impl Into<Value>,
        like: impl Into<SchemaLike>,
        options: &ValidationOptions,
    ) -> Result<Outcome, SchemaError> {
        let schema = self.compile(like)?;
        Ok(schema::validate_root(&schema, Some(value.into()), options))
    }

    /// Fails unless `value` is valid. See [`attempt`](Self::attempt).
    pub fn assert(
        &self,
        value: impl Into<Value>,
        like: impl Into<SchemaLike>,
        message: Option<AssertMessage>,
    ) -> Result<(), AssertError> {
        self.attempt(value, like, message).map(drop)
    }

    /// Returns the accepted value, or fails.
    ///
    /// Without `message` the error message is the annotated input. A prefix
    /// is put in front of it; a replacement error is returned as is.
    pub fn attempt(
        &self,
        value: impl Into<Value>,
        like: impl Into<SchemaLike>,
        message: Option<AssertMessage>,
    ) -> Result<Option<Value>, AssertError> {
        let outcome = self.validate(value, like)?;
        let Some(error) = outcome.error else {
            return Ok(outcome.value);
        };
        let annotated = error.annotate(true);
        Err(match message {
            None => AssertError::Invalid(error.with_message(annotated)),
            Some(AssertMessage::Prefix(prefix)) => AssertError::Invalid(error.with_message(format!("{prefix} {annotated}"))),
            Some(AssertMessage::Error(replacement)) => AssertError::Custom(replacement),
        })
    }

    // ------------------------------------------------------------------------
    // Customisation
    // ------------------------------------------------------------------------

    /// A model that also builds the types defined by `extensions`.
    ///
    /// Extensions of the same name given in one call are combined when they
    /// share a base, either the same node or one built the same way: rules
    /// accumulate and a later rule replaces an earlier one of the same name. A different base replaces the earlier extension
    /// entirely. An extension named after a built-in type replaces that type
    /// and must keep its base type.
    pub fn extend<I>(&self, extensions: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = Extension>,
    {
        let mut combined: IndexMap<String, Extension> = IndexMap::new();
        for extension in extensions {
            extension.check()?;
            match combined.get_mut(&extension.name) {
                Some(previous) if previous.same_base(&extension) => previous.absorb(extension),
                _ => {
                    combined.insert(extension.name.clone(), extension);
                }
            }
        }

        let mut types = self.0.types.clone();
        let mut added = Vec::with_capacity(combined.len());
        for (name, extension) in combined {
            let template = extension.register(self)?;
            tracing::debug!(name = %name, base = %template.kind(), "extension type registered");
            types.insert(name.clone(), template);
            added.push(name);
        }

        let bare = Self(Arc::new(ModelInner { types, defaults: None }));
        if let Some(defaults) = &self.0.defaults {
            bare.check_defaults(defaults, added.iter().map(String::as_str))?;
        }
        Ok(Self(Arc::new(ModelInner {
            types: bare.0.types.clone(),
            defaults: self.0.defaults.clone(),
        })))
    }

    /// A model that passes every schema it builds through `defaults`, after
    /// any defaults this model already applies.
    ///
    /// `defaults` must keep the base type of the schema it receives; this is
    /// checked against every type the model builds.
    pub fn defaults<F>(&self, defaults: F) -> Result<Self, SchemaError>
    where
        F: Fn(Schema) -> Schema + Send + Sync + 'static,
    {
        let composed: DefaultsFn = match self.0.defaults.clone() {
            Some(previous) => Arc::new(move |schema| defaults(previous(schema))),
            None => Arc::new(defaults),
        };

        let model = Self(Arc::new(ModelInner {
            types: self.0.types.clone(),
            defaults: None,
        }));
        model.check_defaults(&composed, BUILT_IN.iter().copied().chain(model.0.types.keys().map(String::as_str)))?;

        tracing::debug!(types = model.0.types.len(), "defaults function installed");
        Ok(Self(Arc::new(ModelInner {
            types: model.0.types.clone(),
            defaults: Some(composed),
        })))
    }
}

impl Model {
    /// Fails unless `defaults` keeps the base type of each of `kinds` as
    /// built by this model, which must carry no defaults of its own.
    fn check_defaults<'a>(
        &self,
        defaults: &DefaultsFn,
        kinds: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), SchemaError> {
        for kind in kinds {
            let plain: Schema = match kind {
                "lazy" => self.lazy(|| Ok(AnySchema::new())).into(),
                _ => self.custom(kind)?,
            };
            let found = defaults(plain.clone());
            if found.kind() != plain.kind() {
                return Err(SchemaError::DefaultsChangedType {
                    expected: plain.type_name().to_owned(),
                    found: found.type_name().to_owned(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("types", &self.0.types.keys().collect::<Vec<_>>())
            .field("defaults", &self.0.defaults.is_some())
            .finish()
    }
}

/// How [`attempt`](Model::attempt) reports a failure.
#[derive(Debug, Clone)]
pub enum AssertMessage {
    /// Put in front of the annotated input.
    Prefix(String),
    /// Returned instead of the validation error.
    Error(Arc<dyn StdError + Send + Sync>),
}

impl AssertMessage {
    pub fn error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Error(Arc::new(error))
    }
}

impl From<&str> for AssertMessage {
    fn from(prefix: &str) -> Self {
        Self::Prefix(prefix.to_owned())
    }
}

impl From<String> for AssertMessage {
    fn from(prefix: String) -> Self {
        Self::Prefix(prefix)
    }
}

// ============================================================================
// EXTENSIONS
// ============================================================================

/// Definition of a type derived from a base schema.
///
/// The new type keeps everything its base does. Its `coerce` hook runs after
/// the base's hooks and before the base type's own conversion; its `pre`
/// hook runs after the base's, once the value has its base type. Message
/// codes given to [`message`](Self::message) are namespaced by the type name.
#[derive(Clone)]
#[must_use = "builder methods must be chained or built"]
pub struct Extension {
    name: String,
    base: Option<Schema>,
    coerce: Option<Hook>,
    pre: Option<Hook>,
    describe: Option<DescribeHook>,
    messages: Vec<(String, String)>,
    rules: Vec<ExtensionRule>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            coerce: None,
            pre: None,
            describe: None,
            messages: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// The schema the type derives from, `any` when unset.
    pub fn base(mut self, base: impl Into<Schema>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Converts raw input, only when converting.
    pub fn coerce<F>(mut self, coerce: F) -> Self
    where
        F: Fn(&Value, &NodeContext<'_>) -> Result<Value, Report> + Send + Sync + 'static,
    {
        self.coerce = Some(Arc::new(coerce));
        self
    }

    /// Transforms a value that passed the base type check.
    pub fn pre<F>(mut self, pre: F) -> Self
    where
        F: Fn(&Value, &NodeContext<'_>) -> Result<Value, Report> + Send + Sync + 'static,
    {
        self.pre = Some(Arc::new(pre));
        self
    }

    /// Adjusts descriptions of schemas of this type.
    pub fn describe<F>(mut self, describe: F) -> Self
    where
        F: Fn(Description) -> Description + Send + Sync + 'static,
    {
        self.describe = Some(Arc::new(describe));
        self
    }

    /// Message template for `<name>.<code>`.
    pub fn message(mut self, code: impl Into<String>, template: impl Into<String>) -> Self {
        self.messages.push((code.into(), template.into()));
        self
    }

    pub fn rule(mut self, rule: ExtensionRule) -> Self {
        self.rules.push(rule);
        self
    }

    fn invalid(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidExtension {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn check(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(self.invalid("name must not be empty"));
        }
        if let Some(base) = &self.base
            && BUILT_IN.contains(&self.name.as_str())
            && base.kind() != self.name
        {
            return Err(self.invalid(format!("a {} base cannot replace the built-in type", base.kind())));
        }
        for rule in &self.rules {
            if rule.name.is_empty() {
                return Err(self.invalid("rule name must not be empty"));
            }
            if rule.setup.is_none() && rule.validate.is_none() {
                return Err(self.invalid(format!("rule `{}` needs setup or validate", rule.name)));
            }
            for (index, (param, _)) in rule.params.iter().enumerate() {
                if rule.params[..index].iter().any(|(earlier, _)| earlier == param) {
                    return Err(self.invalid(format!("rule `{}` declares `{param}` twice", rule.name)));
                }
            }
        }
        Ok(())
    }

    /// Bases match when they are one node, or when they derive from the same
    /// extension type and describe the same.
    fn same_base(&self, other: &Self) -> bool {
        match (&self.base, &other.base) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b) || (same_lineage(a, b) && schema::describe(a) == schema::describe(b)),
            _ => false,
        }
    }

    /// Takes the rules, hooks and messages of a later definition.
    fn absorb(&mut self, later: Self) {
        for rule in later.rules {
            match self.rules.iter_mut().find(|existing| existing.name == rule.name) {
                Some(existing) => *existing = rule,
                None => self.rules.push(rule),
            }
        }
        self.coerce = later.coerce.or_else(|| self.coerce.take());
        self.pre = later.pre.or_else(|| self.pre.take());
        self.describe = later.describe.or_else(|| self.describe.take());
        self.messages.extend(later.messages);
    }

    /// Builds the template schema of this type.
    fn register(self, model: &Model) -> Result<Schema, SchemaError> {
        let base: Schema = match self.base {
            Some(base) => base,
            None => model.any().into(),
        };
        if BUILT_IN.contains(&self.name.as_str()) && base.kind() != self.name {
            return Err(SchemaError::InvalidExtension {
                name: self.name,
                reason: format!("a {} base cannot replace the built-in type", base.kind()),
            });
        }

        let language = self
            .messages
            .iter()
            .fold(Language::new(), |language, (code, template)| {
                language.with_message(format!("{}.{code}", self.name), template.as_str())
            });
        let rules: IndexMap<String, ExtensionRule> = self
            .rules
            .into_iter()
            .map(|rule| (rule.name.clone(), rule))
            .collect();
        let name = self.name;
        let (coerce, pre, describe) = (self.coerce, self.pre, self.describe);

        Ok(base.map(|node| {
            node.type_name = Cow::Owned(name.clone());
            node.hooks.coerce.extend(coerce);
            node.hooks.pre.extend(pre);
            node.hooks.describe.extend(describe);
            if !language.is_empty() {
                node.settings
                    .get_or_insert_with(Settings::default)
                    .merge(&Settings::new().language(language));
            }
            let parent = node.extension.take();
            node.extension = Some(Arc::new(ExtensionType { name, rules, parent }));
        }))
    }
}

fn same_lineage(a: &Schema, b: &Schema) -> bool {
    match (&a.0.extension, &b.0.extension) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(Schema::type_name))
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

type Setup = Arc<dyn Fn(&Schema, &Value) -> Result<Option<Schema>, SchemaError> + Send + Sync>;
type Validate = Arc<dyn Fn(&Value, &Value, &NodeContext<'_>) -> Result<Value, Report> + Send + Sync>;

/// A rule an extension type adds, applied with
/// [`SchemaBuilder::rule`].
///
/// Positional arguments are collected into an object keyed by the declared
/// parameter names and validated against the parameter schemas. `validate`
/// receives that object, the value and the node context; `setup` receives
/// the schema the rule was added to and may return a replacement.
#[derive(Clone)]
#[must_use = "builder methods must be chained or built"]
pub struct ExtensionRule {
    name: String,
    params: Vec<(String, SchemaLike)>,
    setup: Option<Setup>,
    validate: Option<Validate>,
    description: Option<String>,
}

impl ExtensionRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            setup: None,
            validate: None,
            description: None,
        }
    }

    /// Declares the next positional parameter.
    pub fn param(mut self, name: impl Into<String>, schema: impl Into<SchemaLike>) -> Self {
        self.params.push((name.into(), schema.into()));
        self
    }

    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&Schema, &Value) -> Result<Option<Schema>, SchemaError> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value, &Value, &NodeContext<'_>) -> Result<Value, Report> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Collects and validates the arguments of one application.
    fn arguments(&self, model: &Model, args: Vec<Value>) -> Result<Value, SchemaError> {
        if args.len() > self.params.len() {
            return Err(SchemaError::UnexpectedArguments {
                rule: self.name.clone(),
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let given: Value = self
            .params
            .iter()
            .map(|(name, _)| name.clone())
            .zip(args)
            .collect();
        if self.params.is_empty() {
            return Ok(given);
        }

        let schema = model.object().keys(self.params.iter().cloned())?;
        schema
            .validate(given)
            .into_result()
            .map(|value| value.unwrap_or_else(Value::object))
            .map_err(|error| SchemaError::InvalidRuleParams {
                rule: self.name.clone(),
                message: error.message().to_owned(),
            })
    }
}

impl fmt::Debug for ExtensionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRule")
            .field("name", &self.name)
            .field("params", &self.params.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// The rules of a registered extension type, chained to those of the
/// extension it derives from.
pub(crate) struct ExtensionType {
    name: String,
    rules: IndexMap<String, ExtensionRule>,
    parent: Option<Arc<ExtensionType>>,
}

impl ExtensionType {
    fn find(&self, rule: &str) -> Option<&ExtensionRule> {
        self.rules
            .get(rule)
            .or_else(|| self.parent.as_deref()?.find(rule))
    }
}

impl fmt::Debug for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionType")
            .field("name", &self.name)
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Applies the extension rule `name` to `schema`.
pub(crate) fn apply_rule(schema: Schema, name: &str, args: Vec<Value>) -> Result<Schema, SchemaError> {
    let rule = schema
        .0
        .extension
        .as_deref()
        .and_then(|extension| extension.find(name))
        .cloned()
        .ok_or_else(|| SchemaError::UnknownRule {
            type_name: schema.type_name().to_owned(),
            rule: name.to_owned(),
        })?;
    let params = rule.arguments(&schema.model(), args)?;

    let schema = match &rule.setup {
        Some(setup) => setup(&schema, &params)?.unwrap_or(schema),
        None => schema,
    };

    match &rule.validate {
        Some(validate) => {
            let validate = Arc::clone(validate);
            let arg = params.clone();
            let check = Rule::transform(rule.name.clone(), Some(params), move |value, cx| {
                validate(&arg, value, cx).map(Some)
            })
            .with_description(rule.description.clone());
            Ok(schema.map(|node| node.push_rule(check)))
        }
        None => Ok(schema),
    }
}

// ============================================================================
// REACH
// ============================================================================

/// The schema of the nested key at the dotted `path`; `""` is `schema`
/// itself.
pub fn reach(schema: &Schema, path: &str) -> Option<Schema> {
    if path.is_empty() {
        return Some(schema.clone());
    }
    reach_path(schema, &path.split('.').collect::<Vec<_>>())
}

/// Like [`reach`], with the path given as segments.
pub fn reach_path<S: AsRef<str>>(schema: &Schema, path: &[S]) -> Option<Schema> {
    path.iter().try_fold(schema.clone(), |current, key| match &current.0.inner {
        Inner::Object(inner) => inner.child(key.as_ref()).cloned(),
        _ => None,
    })
}

// ============================================================================
// ROOT FUNCTIONS
// ============================================================================

pub fn any() -> AnySchema {
    ROOT.any()
}

pub fn string() -> StringSchema {
    ROOT.string()
}

pub fn number() -> NumberSchema {
    ROOT.number()
}

pub fn boolean() -> BooleanSchema {
    ROOT.boolean()
}

/// Alias of [`boolean`].
pub fn bool() -> BooleanSchema {
    ROOT.boolean()
}

pub fn date() -> DateSchema {
    ROOT.date()
}

pub fn binary() -> BinarySchema {
    ROOT.binary()
}

pub fn func() -> FuncSchema {
    ROOT.func()
}

pub fn object() -> ObjectSchema {
    ROOT.object()
}

pub fn array() -> ArraySchema {
    ROOT.array()
}

pub fn alternatives() -> AlternativesSchema {
    ROOT.alternatives()
}

/// Alias of [`alternatives`].
pub fn alt() -> AlternativesSchema {
    ROOT.alternatives()
}

/// See [`Model::lazy`].
pub fn lazy<F, S>(generate: F) -> LazySchema
where
    F: Fn() -> Result<S, SchemaError> + Send + Sync + 'static,
    S: Into<SchemaLike>,
{
    ROOT.lazy(generate)
}

/// A reference to another value. See [`Ref`].
pub fn reference(key: impl Into<String>) -> Ref {
    Ref::new(key)
}

/// `true` when `like` is a reference.
pub fn is_ref(like: &SchemaLike) -> bool {
    like.is_ref()
}

/// See [`Model::compile`].
pub fn compile(like: impl Into<SchemaLike>) -> Result<Schema, SchemaError> {
    ROOT.compile(like)
}

/// See [`Model::describe`].
pub fn describe(like: impl Into<SchemaLike>) -> Result<Description, SchemaError> {
    ROOT.describe(like)
}

/// See [`Model::validate`].
pub fn validate(value: impl Into<Value>, like: impl Into<SchemaLike>) -> Result<Outcome, SchemaError> {
    ROOT.validate(value, like)
}

/// See [`Model::validate_with`].
pub fn validate_with(
    value: impl Into<Value>,
    like: impl Into<SchemaLike>,
    options: &ValidationOptions,
) -> Result<Outcome, SchemaError> {
    ROOT.validate_with(value, like, options)
}

/// See [`Model::assert`].
pub fn assert(
    value: impl Into<Value>,
    like: impl Into<SchemaLike>,
    message: Option<AssertMessage>,
) -> Result<(), AssertError> {
    ROOT.assert(value, like, message)
}

/// See [`Model::attempt`].
pub fn attempt(
    value: impl Into<Value>,
    like: impl Into<SchemaLike>,
    message: Option<AssertMessage>,
) -> Result<Option<Value>, AssertError> {
    ROOT.attempt(value, like, message)
}

/// See [`Model::extend`].
pub fn extend<I>(extensions: I) -> Result<Model, SchemaError>
where
    I: IntoIterator<Item = Extension>,
{
    ROOT.extend(extensions)
}

/// See [`Model::defaults`].
pub fn defaults<F>(defaults: F) -> Result<Model, SchemaError>
where
    F: Fn(Schema) -> Schema + Send + Sync + 'static,
{
    ROOT.defaults(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Context;
    use crate::object;
    use crate::schema::SchemaBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn round() -> ExtensionRule {
        ExtensionRule::new("round").validate(|_, value, cx| {
            if value.as_f64().is_some_and(|n| n.fract() == 0.0) {
                Ok(value.clone())
            } else {
                Err(cx.error("amount.round", Context::new()))
            }
        })
    }

    fn suffixed(value: &Value, _cx: &NodeContext<'_>) -> Result<Value, Report> {
        let parsed = value
            .as_str()
            .and_then(|text| text.strip_suffix('k'))
            .and_then(|digits| digits.parse::<f64>().ok());
        Ok(parsed.map_or_else(|| value.clone(), |n| Value::from(n * 1000.0)))
    }

    fn amounts() -> Model {
        Model::root()
            .extend([Extension::new("amount")
                .base(number())
                .coerce(suffixed)
                .message("round", "must be a round amount")
                .rule(round())])
            .unwrap()
    }

    #[test]
    fn extension_coerce_runs_before_the_base_conversion() {
        let amount = amounts().custom("amount").unwrap();
        assert_eq!(amount.type_name(), "amount");
        assert_eq!(amount.validate("2k").value, Some(Value::from(2000)));
        assert_eq!(amount.validate("12").value, Some(Value::from(12)));
        assert_eq!(
            amount.validate("x").error.unwrap().details()[0].code,
            "number.base"
        );
    }

    #[test]
    fn extension_rules_render_namespaced_messages() {
        let amount = amounts()
            .custom("amount")
            .unwrap()
            .rule("round", Vec::<Value>::new())
            .unwrap();
        let error = amount.validate(1.5).error.unwrap();
        assert_eq!(error.details()[0].code, "amount.round");
        assert_eq!(error.message(), "\"value\" must be a round amount");
        assert!(amount.validate("3k").is_ok());
    }

    #[test]
    fn base_rules_remain_available() {
        let amount: NumberSchema = amounts().custom("amount").unwrap().try_into().unwrap();
        let error = amount.max(10).validate(11).error.unwrap();
        assert_eq!(error.details()[0].code, "number.max");
    }

    #[test]
    fn unknown_rules_and_types_are_rejected() {
        let err = number().into_schema().rule("round", Vec::<Value>::new()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownRule {
                type_name: "number".to_owned(),
                rule: "round".to_owned()
            }
        );
        assert_eq!(Model::root().custom("amount").unwrap_err().code(), "SCHEMA_UNKNOWN_TYPE");
    }

    #[test]
    fn rule_arguments_are_counted_and_validated() {
        let model = Model::root()
            .extend([Extension::new("padded").base(string()).rule(
                ExtensionRule::new("width")
                    .param("size", number().integer().min(1).required())
                    .validate(|params, value, cx| {
                        let size = params.get("size").and_then(Value::as_f64);
                        let length = value.len().and_then(|n| u32::try_from(n).ok()).map(f64::from);
                        if length == size {
                            Ok(value.clone())
                        } else {
                            Err(cx.error("padded.width", Context::new()))
                        }
                    }),
            )])
            .unwrap();
        let padded = model.custom("padded").unwrap();

        assert_eq!(
            padded.clone().rule("width", [1, 2]).unwrap_err().code(),
            "SCHEMA_RULE_ARITY"
        );
        assert_eq!(
            padded.clone().rule("width", [0]).unwrap_err().code(),
            "SCHEMA_RULE_PARAMS"
        );

        let width = padded.rule("width", [3]).unwrap();
        assert!(width.validate("abc").is_ok());
        assert_eq!(width.validate("ab").error.unwrap().details()[0].code, "padded.width");
        assert_eq!(width.describe().rules[0].arg, Some(Value::from_iter([("size", 3)])));
    }

    #[test]
    fn setup_may_replace_the_schema() {
        let model = Model::root()
            .extend([Extension::new("tag").base(string()).rule(
                ExtensionRule::new("short").setup(|schema, _| {
                    let short: StringSchema = schema.clone().try_into()?;
                    Ok(Some(short.max(3).into()))
                }),
            )])
            .unwrap();
        let short = model.custom("tag").unwrap().rule("short", Vec::<Value>::new()).unwrap();
        assert_eq!(short.validate("abcd").error.unwrap().details()[0].code, "string.max");
    }

    #[test]
    fn validate_applies_to_the_schema_setup_returns() {
        let model = Model::root()
            .extend([Extension::new("t").base(number()).rule(
                ExtensionRule::new("odd")
                    .setup(|_, _| Ok(Some(number().into())))
                    .validate(|_, value, cx| {
                        if value.as_f64().is_some_and(|n| n % 2.0 != 0.0) {
                            Ok(value.clone())
                        } else {
                            Err(cx.error("t.odd", Context::new()))
                        }
                    }),
            )])
            .unwrap();
        let odd = model.custom("t").unwrap().rule("odd", Vec::<Value>::new()).unwrap();
        assert_eq!(odd.validate(2).error.unwrap().details()[0].code, "t.odd");
        assert!(odd.validate(3).is_ok());
    }

    #[test]
    fn bases_built_the_same_way_merge() {
        let half = ExtensionRule::new("half").setup(|_, _| Ok(None));
        let merged = Model::root()
            .extend([
                Extension::new("t").base(number()).rule(round()),
                Extension::new("t").base(number()).rule(half.clone()),
            ])
            .unwrap();
        let t = merged.custom("t").unwrap();
        assert!(t.clone().rule("round", Vec::<Value>::new()).is_ok());
        assert!(t.rule("half", Vec::<Value>::new()).is_ok());

        let replaced = Model::root()
            .extend([
                Extension::new("t").base(number()).rule(round()),
                Extension::new("t").base(number().min(1)).rule(half),
            ])
            .unwrap();
        let t = replaced.custom("t").unwrap();
        assert!(t.clone().rule("round", Vec::<Value>::new()).is_err());
        assert!(t.rule("half", Vec::<Value>::new()).is_ok());
    }

    #[test]
    fn same_name_merges_rules_unless_the_base_changes() {
        let base: Schema = number().into();
        let first = Extension::new("n").base(base.clone()).rule(round());
        let second = Extension::new("n")
            .base(base)
            .rule(ExtensionRule::new("half").setup(|_, _| Ok(None)));
        let merged = Model::root().extend([first.clone(), second]).unwrap();
        let n = merged.custom("n").unwrap();
        assert!(n.clone().rule("round", Vec::<Value>::new()).is_ok());
        assert!(n.rule("half", Vec::<Value>::new()).is_ok());

        let replaced = Model::root()
            .extend([first, Extension::new("n").base(string())])
            .unwrap();
        let n = replaced.custom("n").unwrap();
        assert_eq!(n.kind(), "string");
        assert!(n.rule("round", Vec::<Value>::new()).is_err());
    }

    #[test]
    fn built_in_names_keep_their_type() {
        let err = Model::root()
            .extend([Extension::new("string").base(number())])
            .unwrap_err();
        assert_eq!(err.code(), "SCHEMA_EXTENSION");

        let model = Model::root()
            .extend([Extension::new("string").base(string()).pre(|value, _| {
                Ok(value.as_str().map_or_else(|| value.clone(), |s| Value::from(s.to_uppercase())))
            })])
            .unwrap();
        assert_eq!(model.string().validate("abc").value, Some(Value::from("ABC")));
    }

    #[test]
    fn nested_literals_use_the_extended_model() {
        let model = Model::root()
            .extend([Extension::new("number").base(number()).coerce(suffixed)])
            .unwrap();
        let schema = model.compile(json!({ "a": 1000 })).unwrap();
        assert!(schema.validate(json!({ "a": "1k" })).is_ok());
        assert!(!Model::root().compile(json!({ "a": 1000 })).unwrap().validate(json!({ "a": "1k" })).is_ok());
    }

    #[test]
    fn extensions_derive_from_extensions() {
        let money = amounts()
            .extend([Extension::new("money").base(amounts().custom("amount").unwrap())])
            .unwrap();
        let schema = money.custom("money").unwrap();
        assert_eq!(schema.validate("1k").value, Some(Value::from(1000)));
        assert!(schema.rule("round", Vec::<Value>::new()).is_ok());
    }

    #[test]
    fn describe_hooks_adjust_the_description() {
        let model = Model::root()
            .extend([Extension::new("color").base(string()).describe(|mut description| {
                description.notes.push("css color".to_owned());
                description
            })])
            .unwrap();
        let description = model.custom("color").unwrap().describe();
        assert_eq!(description.type_name, "color");
        assert_eq!(description.notes, ["css color"]);
    }

    #[test]
    fn defaults_apply_to_every_schema_the_model_builds() {
        let model = defaults(|schema| schema.required()).unwrap();
        let schema = model.object().keys([("a", model.number())]).unwrap();
        let error = schema.validate(json!({})).error.unwrap();
        assert_eq!(error.details()[0].code, "any.required");

        let literal = model.compile(json!({ "b": "x" })).unwrap();
        assert_eq!(
            literal.validate(json!({})).error.unwrap().details()[0].code,
            "any.required"
        );
    }

    #[test]
    fn defaults_compose_in_order() {
        let model = defaults(|schema| schema.label("first"))
            .unwrap()
            .defaults(|schema| schema.description("second"))
            .unwrap();
        let description = model.string().describe();
        assert_eq!(description.label.as_deref(), Some("first"));
        assert_eq!(description.description.as_deref(), Some("second"));
    }

    #[test]
    fn defaults_must_keep_the_type() {
        let err = defaults(|_| string().into()).unwrap_err();
        assert_eq!(err.code(), "SCHEMA_DEFAULTS");
    }

    #[test]
    fn extending_a_defaulted_model_checks_the_new_types() {
        let model = defaults(|schema| {
            if schema.type_name() == "amount" {
                string().into()
            } else {
                schema
            }
        })
        .unwrap();
        let err = model
            .extend([Extension::new("amount").base(number())])
            .unwrap_err();
        assert_eq!(err.code(), "SCHEMA_DEFAULTS");
        assert!(model.extend([Extension::new("price").base(number())]).is_ok());
    }

    #[test]
    fn attempt_returns_the_value_or_an_annotated_error() {
        assert_eq!(attempt("4", number(), None).unwrap(), Some(Value::from(4)));

        let err = attempt(json!({ "a": "x" }), object! { "a" => number() }.unwrap(), None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("\"a\" [1]: \"x\""), "{message}");
        assert!(message.contains("[1] \"a\" must be a number"), "{message}");
        assert!(err.validation().is_some());

        let err = assert(1, string(), Some("bad input".into())).unwrap_err();
        assert!(err.to_string().starts_with("bad input "));
    }

    #[test]
    fn assert_can_replace_the_error() {
        #[derive(Debug, thiserror::Error)]
        #[error("not a string")]
        struct NotString;

        let err = assert(1, string(), Some(AssertMessage::error(NotString))).unwrap_err();
        assert_eq!(err.to_string(), "not a string");
        assert!(err.validation().is_none());
    }

    #[test]
    fn reach_follows_object_children() {
        let schema: Schema = object! {
            "a" => object! { "b" => number() }.unwrap(),
        }
        .unwrap()
        .into();
        assert_eq!(reach(&schema, "a.b").unwrap().type_name(), "number");
        assert!(reach(&schema, "").unwrap().ptr_eq(&schema));
        assert!(reach_path(&schema, &["a", "c"]).is_none());
        assert!(reach_path::<&str>(&schema, &[]).unwrap().ptr_eq(&schema));
        assert!(reach(&number().into(), "a").is_none());
    }

    #[test]
    fn root_validate_compiles_literals() {
        assert!(validate("a", "a").unwrap().is_ok());
        assert!(!validate("b", "a").unwrap().is_ok());
        assert_eq!(
            validate(1, SchemaLike::Undefined).unwrap_err().code(),
            "SCHEMA_INVALID_CONTENT"
        );
        assert!(is_ref(&reference("a").into()));
        assert!(!is_ref(&SchemaLike::from(1)));
    }
}
