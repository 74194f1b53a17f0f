//! Rules and the context they run in.

use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use super::Node;
use crate::foundation::error::Context;
use crate::foundation::state::{Path, PathSegment, State};
use crate::foundation::{Ref, Report, ValidationOptions};
use crate::value::{Value, as_safe_integer};

pub(crate) type Check = Arc<dyn Fn(&Value, &NodeContext<'_>) -> Result<Option<Value>, Report> + Send + Sync>;

/// A named check or transform attached to a node.
///
/// `check` returns `Ok(None)` to keep the value, `Ok(Some(v))` to replace it
/// for the rules that follow.
#[derive(Clone)]
pub(crate) struct Rule {
    pub(crate) name: Cow<'static, str>,
    pub(crate) arg: Option<Value>,
    pub(crate) description: Option<String>,
    pub(crate) check: Check,
}

impl Rule {
    pub(crate) fn transform(
        name: impl Into<Cow<'static, str>>,
        arg: Option<Value>,
        check: impl Fn(&Value, &NodeContext<'_>) -> Result<Option<Value>, Report> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arg,
            description: None,
            check: Arc::new(check),
        }
    }

    /// A rule that only accepts or rejects.
    pub(crate) fn test(
        name: impl Into<Cow<'static, str>>,
        arg: Option<Value>,
        test: impl Fn(&Value, &NodeContext<'_>) -> Result<(), Report> + Send + Sync + 'static,
    ) -> Self {
        Self::transform(name, arg, move |value, cx| test(value, cx).map(|()| None))
    }

    #[must_use]
    pub(crate) fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("arg", &self.arg)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// LIMITS
// ============================================================================

/// A rule parameter given literally or by reference.
#[derive(Debug, Clone)]
pub(crate) enum Limit<T> {
    Value(T),
    Ref(Ref),
}

impl<T: Clone + Into<Value>> Limit<T> {
    pub(crate) fn describe(&self) -> Value {
        match self {
            Self::Value(value) => value.clone().into(),
            Self::Ref(reference) => Value::String(reference.to_string()),
        }
    }
}

impl Limit<usize> {
    /// The limit as a length. A reference must resolve to a non-negative
    /// integer, otherwise `<kind>.ref` is reported.
    pub(crate) fn resolve(&self, cx: &NodeContext<'_>, kind: &str) -> Result<usize, Report> {
        match self {
            Self::Value(limit) => Ok(*limit),
            Self::Ref(reference) => cx
                .resolve(reference)
                .and_then(|value| value.as_f64())
                .and_then(as_safe_integer)
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| cx.ref_error(kind, reference)),
        }
    }
}

impl Limit<f64> {
    /// The limit as a number; `<kind>.ref` when a reference is not one.
    pub(crate) fn resolve(&self, cx: &NodeContext<'_>, kind: &str) -> Result<f64, Report> {
        match self {
            Self::Value(limit) => Ok(*limit),
            Self::Ref(reference) => cx
                .resolve(reference)
                .and_then(|value| value.as_f64())
                .ok_or_else(|| cx.ref_error(kind, reference)),
        }
    }
}

// ============================================================================
// NODE CONTEXT
// ============================================================================

/// What a rule, hook or extension sees of the node being evaluated.
///
/// Provides the node's label and location, the effective options, reference
/// resolution and error construction. Messages are rendered when the report
/// is built, in the node's language.
pub struct NodeContext<'a> {
    pub(crate) node: &'a Node,
    pub(crate) state: &'a State<'a>,
    pub(crate) options: &'a ValidationOptions,
    pub(crate) wrapped: Cell<bool>,
}

impl<'a> NodeContext<'a> {
    pub(crate) const fn new(node: &'a Node, state: &'a State<'a>, options: &'a ValidationOptions) -> Self {
        Self {
            node,
            state,
            options,
            wrapped: Cell::new(false),
        }
    }

    /// The key of the value inside its parent, `None` at the root.
    pub fn key(&self) -> Option<&PathSegment> {
        self.state.key.as_ref()
    }

    /// Location of the value.
    pub fn path(&self) -> &[PathSegment] {
        &self.state.path
    }

    /// The node label, else the key, else the language's root label.
    pub fn label(&self) -> Value {
        if let Some(label) = &self.node.flags.label {
            return Value::String(label.clone());
        }
        self.key()
            .map_or_else(|| Value::from(self.options.language.root()), Value::from)
    }

    /// Options in effect at this node.
    pub fn options(&self) -> &ValidationOptions {
        self.options
    }

    /// Resolves a reference against the ancestors and the context option.
    pub fn resolve(&self, reference: &Ref) -> Option<Value> {
        self.resolve_with(reference, None)
    }

    pub(crate) fn resolve_with(&self, reference: &Ref, current: Option<&Value>) -> Option<Value> {
        reference.resolve(current, self.state.parent, self.options.context.as_ref())
    }

    /// Builds a report for `code` at this node.
    pub fn error(&self, code: impl Into<Cow<'static, str>>, context: Context) -> Report {
        self.build(code.into(), context, self.key().cloned(), self.label(), self.state.path.clone(), Vec::new())
    }

    /// A report at `path` summarising `reasons`, labelled like this node.
    pub(crate) fn error_with(
        &self,
        code: &'static str,
        context: Context,
        path: Path,
        reasons: Vec<Report>,
    ) -> Report {
        self.build(Cow::Borrowed(code), context, self.key().cloned(), self.label(), path, reasons)
    }

    /// A report about the entry `key` of this container, labelled by the key.
    pub(crate) fn error_for_key(
        &self,
        code: &'static str,
        context: Context,
        key: PathSegment,
        reasons: Vec<Report>,
    ) -> Report {
        let path = self.state.path_to(key.clone());
        let label = Value::from(&key);
        self.build(Cow::Borrowed(code), context, Some(key), label, path, reasons)
    }

    /// A report at an arbitrary `path`, labelled by `key`.
    pub(crate) fn error_at(&self, code: &'static str, context: Context, key: PathSegment, path: Path) -> Report {
        let label = Value::from(&key);
        self.build(Cow::Borrowed(code), context, Some(key), label, path, Vec::new())
    }

    pub(crate) fn ref_error(&self, kind: &str, reference: &Ref) -> Report {
        let mut context = Context::new();
        context.insert("ref".to_owned(), Value::from(reference.key()));
        self.error(format!("{kind}.ref"), context)
    }

    fn build(
        &self,
        code: Cow<'static, str>,
        mut context: Context,
        key: Option<PathSegment>,
        label: Value,
        path: Path,
        reasons: Vec<Report>,
    ) -> Report {
        if !reasons.is_empty() && !context.contains_key("reason") {
            let messages = reasons.iter().map(|r| Value::from(r.message())).collect::<Vec<_>>();
            context.insert("reason".to_owned(), Value::Array(messages));
        }
        if let Some(key) = &key {
            context.insert("key".to_owned(), Value::from(key));
        }
        context.insert("label".to_owned(), label);
        let message = self
            .options
            .language
            .render(&code, &context, self.options.escape_html);
        Report {
            code,
            message,
            path,
            context,
            reasons,
            replacement: None,
        }
    }
}

impl fmt::Debug for NodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("type", &self.node.type_name)
            .field("path", &self.state.path)
            .finish_non_exhaustive()
    }
}

/// Shorthand for building a report context.
macro_rules! context {
    () => { $crate::foundation::error::Context::new() };
    ($($key:literal => $value:expr),+ $(,)?) => {{
        let mut context = $crate::foundation::error::Context::new();
        $( context.insert($key.to_owned(), $crate::value::Value::from($value)); )+
        context
    }};
}

pub(crate) use context;
