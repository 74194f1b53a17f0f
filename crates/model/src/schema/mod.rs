//! Schema nodes
//!
//! A [`Schema`] is an immutable, reference-counted node: a base type, flags,
//! allowed and denied values, an ordered rule list and type-specific inner
//! state (object children, array items, alternatives, ...). Builder methods
//! take the schema by value and copy the node only when it is shared, so a
//! schema that was published (cloned, stored, compiled into a parent) never
//! changes under its holders.
//!
//! Every base type plugs into the evaluation algorithm through the internal
//! [`Evaluate`] trait; the typed builders in [`crate::types`] are thin
//! wrappers over a `Schema`.

mod builder;
mod compile;
mod describe;
mod evaluate;
pub(crate) mod flags;
pub(crate) mod rule;

pub use builder::{Condition, SchemaBuilder, When};
pub(crate) use builder::{map, try_map, typed_schema};
pub use compile::SchemaLike;
pub(crate) use compile::compile;
pub use describe::{
    AlternativeDescription, DependencyDescription, Description, PatternDescription, RenameDescription,
    RuleDescription,
};
pub(crate) use describe::describe;
pub(crate) use evaluate::{DEFAULT_OPTIONS, Evaluated, evaluate, validate_root};
pub use evaluate::Outcome;
pub use flags::GeneratorError;
pub use rule::NodeContext;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::factory::{ExtensionType, Model};
use crate::foundation::{Ref, Report, SchemaError, Settings};
use crate::types::alternatives::AlternativesInner;
use crate::types::any::AnyInner;
use crate::types::array::ArrayInner;
use crate::types::binary::BinaryInner;
use crate::types::boolean::BooleanInner;
use crate::types::date::DateInner;
use crate::types::func::FuncInner;
use crate::types::lazy::LazyInner;
use crate::types::number::NumberInner;
use crate::types::object::ObjectInner;
use crate::types::string::StringInner;
use crate::value::Value;
use flags::{Flags, Meta, ValueSet};
use rule::Rule;

// ============================================================================
// SCHEMA
// ============================================================================

/// An immutable schema node of any type.
///
/// Cloning is cheap and yields the same node: [`ptr_eq`](Self::ptr_eq)
/// holds between clones, and between a schema and the result of a builder
/// call that changed nothing.
#[derive(Clone)]
pub struct Schema(pub(crate) Arc<Node>);

impl Schema {
    pub(crate) fn new(inner: Inner) -> Self {
        Self(Arc::new(Node::new(inner)))
    }

    /// Type name: a base type (`string`, `object`, ...) or an extension name.
    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    /// `true` when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The base type this node evaluates as.
    pub(crate) fn kind(&self) -> &'static str {
        self.0.inner.kind()
    }

    /// Applies `f` to a private copy of the node.
    pub(crate) fn map(mut self, f: impl FnOnce(&mut Node)) -> Self {
        f(Arc::make_mut(&mut self.0));
        self
    }

    /// The factory this node was built by.
    pub(crate) fn model(&self) -> Model {
        self.0.model.clone().unwrap_or_else(Model::root)
    }

    /// Merges `other` into a copy of this schema.
    ///
    /// Types must match unless one side is `any`; an `any` receiving a typed
    /// schema takes over its type. Rules, values and metadata accumulate,
    /// flags and settings of `other` win.
    pub(crate) fn merge(self, other: &Self) -> Result<Self, SchemaError> {
        let left = &self.0;
        let right = &other.0;
        if left.type_name != "any" && right.type_name != "any" && left.type_name != right.type_name {
            return Err(SchemaError::IncompatibleConcat {
                left: left.type_name.to_string(),
                right: right.type_name.to_string(),
            });
        }

        let mut node = (*self.0).clone();
        if node.type_name == "any" && right.type_name != "any" {
            node.type_name.clone_from(&right.type_name);
            node.inner = right.inner.clone();
            node.hooks = right.hooks.clone();
            node.extension.clone_from(&right.extension);
        } else {
            node.inner.concat(&right.inner)?;
        }

        if let Some(settings) = &right.settings {
            node.settings
                .get_or_insert_with(Settings::default)
                .merge(settings);
        }
        node.valids.merge(&right.valids, &right.invalids);
        node.invalids.merge(&right.invalids, &right.valids);
        node.rules.extend(right.rules.iter().cloned());
        for reference in &right.refs {
            node.add_ref(reference);
        }
        node.flags.merge(&right.flags);
        node.meta.merge(&right.meta);
        if node.model.is_none() {
            node.model.clone_from(&right.model);
        }
        Ok(Self(Arc::new(node)))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type", &self.0.type_name)
            .field("rules", &self.0.rules.len())
            .finish_non_exhaustive()
    }
}

impl AsRef<Self> for Schema {
    fn as_ref(&self) -> &Self {
        self
    }
}

// ============================================================================
// NODE
// ============================================================================

pub(crate) type Hook = Arc<dyn Fn(&Value, &NodeContext<'_>) -> Result<Value, Report> + Send + Sync>;
pub(crate) type DescribeHook = Arc<dyn Fn(Description) -> Description + Send + Sync>;

/// Extension hooks, outermost last.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) coerce: Vec<Hook>,
    pub(crate) pre: Vec<Hook>,
    pub(crate) describe: Vec<DescribeHook>,
}

#[derive(Clone)]
pub(crate) struct Node {
    pub(crate) type_name: Cow<'static, str>,
    pub(crate) flags: Flags,
    pub(crate) meta: Meta,
    pub(crate) valids: ValueSet,
    pub(crate) invalids: ValueSet,
    pub(crate) rules: Vec<Rule>,
    /// References this node resolves, used to order sibling keys.
    pub(crate) refs: Vec<Ref>,
    pub(crate) settings: Option<Settings>,
    pub(crate) inner: Inner,
    pub(crate) hooks: Hooks,
    pub(crate) extension: Option<Arc<ExtensionType>>,
    pub(crate) model: Option<Model>,
}

impl Node {
    fn new(inner: Inner) -> Self {
        Self {
            type_name: Cow::Borrowed(inner.kind()),
            flags: Flags::default(),
            meta: Meta::default(),
            valids: ValueSet::default(),
            invalids: ValueSet::default(),
            rules: Vec::new(),
            refs: Vec::new(),
            settings: None,
            inner,
            hooks: Hooks::default(),
            extension: None,
            model: None,
        }
    }

    pub(crate) fn add_ref(&mut self, reference: &Ref) {
        if !self.refs.contains(reference) {
            self.refs.push(reference.clone());
        }
    }

    pub(crate) fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Sibling keys this node depends on.
    pub(crate) fn siblings(&self) -> impl Iterator<Item = &str> {
        self.refs.iter().filter_map(Ref::sibling)
    }
}

// ============================================================================
// INNER STATE
// ============================================================================

#[derive(Clone)]
pub(crate) enum Inner {
    Any,
    String(StringInner),
    Number(NumberInner),
    Boolean(BooleanInner),
    Date(DateInner),
    Binary(BinaryInner),
    Func,
    Object(ObjectInner),
    Array(ArrayInner),
    Alternatives(AlternativesInner),
    Lazy(LazyInner),
}

impl Inner {
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Binary(_) => "binary",
            Self::Func => "func",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Alternatives(_) => "alternatives",
            Self::Lazy(_) => "lazy",
        }
    }

    pub(crate) fn evaluator(&self) -> &dyn Evaluate {
        match self {
            Self::Any => &AnyInner,
            Self::String(inner) => inner,
            Self::Number(inner) => inner,
            Self::Boolean(inner) => inner,
            Self::Date(inner) => inner,
            Self::Binary(inner) => inner,
            Self::Func => &FuncInner,
            Self::Object(inner) => inner,
            Self::Array(inner) => inner,
            Self::Alternatives(inner) => inner,
            Self::Lazy(inner) => inner,
        }
    }

    fn concat(&mut self, other: &Self) -> Result<(), SchemaError> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a.concat(b),
            (Self::Number(a), Self::Number(b)) => a.concat(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.concat(b),
            (Self::Date(a), Self::Date(b)) => a.concat(b),
            (Self::Binary(a), Self::Binary(b)) => a.concat(b),
            (Self::Object(a), Self::Object(b)) => a.concat(b)?,
            (Self::Array(a), Self::Array(b)) => a.concat(b),
            (Self::Alternatives(a), Self::Alternatives(b)) => a.concat(b),
            (Self::Lazy(a), Self::Lazy(b)) => a.concat(b),
            _ => {}
        }
        Ok(())
    }
}

/// How a base type takes part in evaluation.
///
/// The algorithm in `evaluate` calls these in a fixed order: `coerce` (only
/// when converting), `check_base`, `cast`, then the node's rules, then
/// `children`.
pub(crate) trait Evaluate {
    /// Converts a raw value towards this type. `None` leaves it unchanged.
    fn coerce(&self, _value: &Value, _cx: &NodeContext<'_>) -> Option<Value> {
        None
    }

    /// Whether the value has this type's shape.
    fn check_base(&self, value: &Value, cx: &NodeContext<'_>) -> bool;

    /// Code reported when `check_base` fails.
    fn base_code(&self, cx: &NodeContext<'_>) -> &'static str;

    /// Post-base transformation.
    fn cast(&self, value: Value, _cx: &NodeContext<'_>, _errors: &mut Vec<Report>) -> Value {
        value
    }

    /// Evaluates nested values. Receives `None` only for nodes that delegate
    /// absence (conditional alternatives).
    fn children(&self, value: Option<Value>, _cx: &NodeContext<'_>, _errors: &mut Vec<Report>) -> Option<Value> {
        value
    }

    /// Adds type-specific entries to a description.
    fn describe(&self, _description: &mut Description) {}
}
