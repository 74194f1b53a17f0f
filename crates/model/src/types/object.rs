//! The `object` type.
//!
//! Evaluation of an object value, after its own rules:
//!
//! 1. renames, literal keys first, then regex renames
//! 2. declared children, in dependency order (a key referencing a sibling,
//!    directly or from a nested schema, is evaluated after it)
//! 3. undeclared keys: patterns, then `allowUnknown` / `stripUnknown`
//! 4. peer dependencies, against the validated key set
//!
//! Stripped children stay visible to their siblings until step 2 is done.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use super::{Bound, parse_json, push_size_rule};
use crate::foundation::state::{Chain, Path, PathSegment, State};
use crate::foundation::{Presence, Ref, RefScope, Report, SchemaError};
use crate::schema::rule::{Limit, NodeContext, Rule, context};
use crate::schema::{
    DEFAULT_OPTIONS, DependencyDescription, Description, Evaluate, Inner, PatternDescription, RenameDescription,
    Schema, SchemaBuilder, SchemaLike, compile, evaluate, map, try_map, typed_schema,
};
use crate::value::{Map, Value};

typed_schema!(
    /// Objects with declared keys, key patterns, renames and peer
    /// dependencies.
    ///
    /// ```rust,ignore
    /// let login = object()
    ///     .keys([("username", string().into()), ("email", string().email().into())])?
    ///     .xor(["username", "email"]);
    /// ```
    ObjectSchema,
    "object"
);

// ============================================================================
// INNER STATE
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Child {
    pub(crate) key: String,
    pub(crate) schema: Schema,
}

#[derive(Debug, Clone)]
enum KeyMatcher {
    Regex(Regex),
    Schema(Schema),
}

impl KeyMatcher {
    fn matches(&self, key: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(key),
            Self::Schema(schema) => {
                evaluate(schema, Some(Value::from(key)), &State::root(), &DEFAULT_OPTIONS).is_ok()
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    matcher: KeyMatcher,
    schema: Schema,
}

/// How a rename treats the source and target keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameOptions {
    /// Keep the source key as well.
    pub alias: bool,
    /// Allow several renames into the same target.
    pub multiple: bool,
    /// Allow replacing a target that is already present.
    pub override_: bool,
    /// Skip the rename when the source is absent instead of removing the
    /// target.
    pub ignore_undefined: bool,
}

impl RenameOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn alias(mut self, alias: bool) -> Self {
        self.alias = alias;
        self
    }

    #[must_use]
    pub const fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    #[must_use]
    pub const fn override_(mut self, override_: bool) -> Self {
        self.override_ = override_;
        self
    }

    #[must_use]
    pub const fn ignore_undefined(mut self, ignore_undefined: bool) -> Self {
        self.ignore_undefined = ignore_undefined;
        self
    }

    fn describe(self) -> IndexMap<String, Value> {
        [
            ("alias", self.alias),
            ("multiple", self.multiple),
            ("override", self.override_),
            ("ignoreUndefined", self.ignore_undefined),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), Value::Bool(v)))
        .collect()
    }
}

#[derive(Debug, Clone)]
enum RenameFrom {
    Key(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
struct Rename {
    from: RenameFrom,
    to: String,
    options: RenameOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DependencyKind {
    And,
    Nand,
    Or,
    Xor,
    With,
    Without,
}

impl DependencyKind {
    const fn name(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Nand => "nand",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::With => "with",
            Self::Without => "without",
        }
    }
}

#[derive(Debug, Clone)]
struct Dependency {
    kind: DependencyKind,
    key: Option<String>,
    peers: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectInner {
    /// `None` accepts any keys; `Some(vec![])` accepts none.
    pub(crate) children: Option<Vec<Child>>,
    patterns: Vec<Pattern>,
    renames: Vec<Rename>,
    dependencies: Vec<Dependency>,
}

impl ObjectInner {
    pub(crate) fn concat(&mut self, other: &Self) -> Result<(), SchemaError> {
        if let Some(children) = &other.children {
            self.add_children(children.clone())?;
        }
        self.patterns.extend(other.patterns.iter().cloned());
        self.renames.extend(other.renames.iter().cloned());
        self.dependencies.extend(other.dependencies.iter().cloned());
        Ok(())
    }

    /// The declared child `key`.
    pub(crate) fn child(&self, key: &str) -> Option<&Schema> {
        self.children
            .as_ref()?
            .iter()
            .find(|child| child.key == key)
            .map(|child| &child.schema)
    }

    /// Adds children, replacing same-named ones, and restores dependency
    /// order.
    fn add_children(&mut self, added: Vec<Child>) -> Result<(), SchemaError> {
        let mut children = self.children.take().unwrap_or_default();
        children.retain(|child| !added.iter().any(|new| new.key == child.key));
        children.extend(added);
        self.children = Some(sort_children(children)?);
        Ok(())
    }

    fn label_of(&self, key: &str) -> Value {
        self.child(key)
            .and_then(|schema| schema.0.flags.label.clone())
            .map_or_else(|| Value::from(key), Value::String)
    }

    fn labels_of(&self, keys: &[String]) -> Value {
        Value::Array(keys.iter().map(|key| self.label_of(key)).collect())
    }
}

/// Orders children so that every key comes after the siblings it or any of
/// its descendants reference. Among keys free to go, declaration order is
/// kept.
fn sort_children(children: Vec<Child>) -> Result<Vec<Child>, SchemaError> {
    let count = children.len();
    let after: Vec<Vec<usize>> = children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            child
                .schema
                .0
                .siblings()
                .filter_map(|sibling| children.iter().position(|c| c.key == sibling))
                .filter(|&position| position != index)
                .collect()
        })
        .collect();

    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);
    while order.len() < count {
        let next = (0..count).find(|&i| !placed[i] && after[i].iter().all(|&dep| placed[dep]));
        let Some(next) = next else {
            let stuck = (0..count).find(|&i| !placed[i]).map_or_else(String::new, |i| children[i].key.clone());
            return Err(SchemaError::ReferenceCycle { key: stuck });
        };
        placed[next] = true;
        order.push(next);
    }

    let mut slots: Vec<Option<Child>> = children.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

// ============================================================================
// EVALUATION
// ============================================================================

fn present(map: &Map, key: &str) -> bool {
    map.contains_key(key)
}

fn child_error(cx: &NodeContext<'_>, key: &str, schema: &Schema, reasons: Vec<Report>) -> Report {
    let label = schema
        .0
        .flags
        .label
        .clone()
        .map_or_else(|| Value::from(key), Value::String);
    cx.error_for_key("object.child", context!("child" => label), PathSegment::from(key), reasons)
}

/// Evaluates `map[key]` against `schema` with the object as parent.
fn evaluate_entry(
    value: &mut Value,
    key: &str,
    schema: &Schema,
    cx: &NodeContext<'_>,
) -> crate::schema::Evaluated {
    let item = value.as_object().and_then(|map| map.get(key)).cloned();
    let link = Chain {
        value: &*value,
        up: cx.state.parent,
    };
    let state = cx.state.child(PathSegment::from(key), &link);
    evaluate(schema, item, &state, cx.options)
}

fn store(value: &mut Value, key: &str, item: Option<Value>) {
    if let Some(map) = value.as_object_mut() {
        match item {
            Some(item) => {
                map.insert(key.to_owned(), item);
            }
            None => {
                map.shift_remove(key);
            }
        }
    }
}

impl ObjectInner {
    fn rename(&self, map: &mut Map, cx: &NodeContext<'_>, errors: &mut Vec<Report>) {
        let mut renamed = HashSet::new();
        let literal = self.renames.iter().filter(|r| matches!(r.from, RenameFrom::Key(_)));
        let regex = self.renames.iter().filter(|r| matches!(r.from, RenameFrom::Regex(_)));

        for rename in literal.chain(regex) {
            let options = rename.options;
            let (sources, from, prefix) = match &rename.from {
                RenameFrom::Key(key) => {
                    let sources: Vec<String> = map.contains_key(key).then(|| key.clone()).into_iter().collect();
                    (sources, Value::from(key.as_str()), "object.rename")
                }
                RenameFrom::Regex(regex) => {
                    let sources: Vec<String> = map.keys().filter(|k| regex.is_match(k)).cloned().collect();
                    let from = Value::Array(sources.iter().map(Value::from).collect());
                    (sources, from, "object.rename.regex")
                }
            };

            if options.ignore_undefined && sources.is_empty() {
                continue;
            }

            let conflict = if !options.multiple && renamed.contains(&rename.to) {
                Some("multiple")
            } else if map.contains_key(&rename.to) && !options.override_ && !renamed.contains(&rename.to) {
                Some("override")
            } else {
                None
            };
            if let Some(conflict) = conflict {
                errors.push(cx.error(
                    format!("{prefix}.{conflict}"),
                    context!("from" => from, "to" => rename.to.as_str()),
                ));
                if cx.options.abort_early {
                    return;
                }
                continue;
            }

            match sources.last().and_then(|source| map.get(source)).cloned() {
                Some(item) => {
                    map.insert(rename.to.clone(), item);
                }
                None => {
                    map.shift_remove(&rename.to);
                }
            }
            renamed.insert(rename.to.clone());

            if !options.alias {
                for source in sources.iter().filter(|source| **source != rename.to) {
                    map.shift_remove(source);
                }
            }
        }
    }

    fn dependency_error(&self, dependency: &Dependency, map: &Map, cx: &NodeContext<'_>) -> Option<Report> {
        let peers = &dependency.peers;
        let present_peers: Vec<String> = peers.iter().filter(|peer| present(map, peer)).cloned().collect();

        match dependency.kind {
            DependencyKind::With | DependencyKind::Without => {
                let main = dependency.key.as_deref()?;
                if !present(map, main) {
                    return None;
                }
                let (code, failing) = if dependency.kind == DependencyKind::With {
                    ("object.with", peers.iter().find(|peer| !present(map, peer)))
                } else {
                    ("object.without", peers.iter().find(|peer| present(map, peer)))
                };
                let peer = failing?;
                Some(cx.error_for_key(
                    code,
                    context!(
                        "main" => main,
                        "mainWithLabel" => self.label_of(main),
                        "peer" => peer.as_str(),
                        "peerWithLabel" => self.label_of(peer)
                    ),
                    PathSegment::from(main),
                    Vec::new(),
                ))
            }
            DependencyKind::Or | DependencyKind::Xor => {
                let code = match (dependency.kind, present_peers.len()) {
                    (_, 0) => "object.missing",
                    (DependencyKind::Xor, 1) | (DependencyKind::Or, _) => return None,
                    _ => "object.xor",
                };
                Some(cx.error(
                    code,
                    context!("peers" => peers.clone(), "peersWithLabels" => self.labels_of(peers)),
                ))
            }
            DependencyKind::And => {
                if present_peers.is_empty() || present_peers.len() == peers.len() {
                    return None;
                }
                let missing: Vec<String> = peers.iter().filter(|peer| !present(map, peer)).cloned().collect();
                Some(cx.error(
                    "object.and",
                    context!(
                        "present" => present_peers.clone(),
                        "presentWithLabels" => self.labels_of(&present_peers),
                        "missing" => missing.clone(),
                        "missingWithLabels" => self.labels_of(&missing)
                    ),
                ))
            }
            DependencyKind::Nand => {
                if present_peers.len() != peers.len() {
                    return None;
                }
                let (main, rest) = peers.split_first()?;
                Some(cx.error(
                    "object.nand",
                    context!(
                        "main" => main.as_str(),
                        "mainWithLabel" => self.label_of(main),
                        "peers" => rest.to_vec(),
                        "peersWithLabels" => self.labels_of(rest)
                    ),
                ))
            }
        }
    }
}

impl Evaluate for ObjectInner {
    fn coerce(&self, value: &Value, _cx: &NodeContext<'_>) -> Option<Value> {
        parse_json(value, Value::is_object)
    }

    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        value.is_object()
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "object.base"
    }

    fn cast(&self, mut value: Value, cx: &NodeContext<'_>, errors: &mut Vec<Report>) -> Value {
        if !self.renames.is_empty()
            && let Some(map) = value.as_object_mut()
        {
            self.rename(map, cx, errors);
        }
        value
    }

    #[allow(clippy::too_many_lines)]
    fn children(&self, value: Option<Value>, cx: &NodeContext<'_>, errors: &mut Vec<Report>) -> Option<Value> {
        let mut value = value?;
        if self.children.is_none() && self.patterns.is_empty() && self.dependencies.is_empty() {
            return Some(value);
        }
        let Some(keys) = value.as_object().map(|map| map.keys().cloned().collect::<IndexSet<_>>()) else {
            return Some(value);
        };
        let mut unprocessed = keys;

        if let Some(children) = &self.children {
            let mut stripped = Vec::new();
            for child in children {
                unprocessed.shift_remove(&child.key);
                let result = evaluate_entry(&mut value, &child.key, &child.schema, cx);
                let ok = result.is_ok();
                if ok && result.strip {
                    stripped.push(child.key.as_str());
                }
                store(&mut value, &child.key, result.value);
                if !ok {
                    errors.push(child_error(cx, &child.key, &child.schema, result.errors));
                    if cx.options.abort_early {
                        return Some(value);
                    }
                }
            }
            for key in stripped {
                store(&mut value, key, None);
            }
        }

        if !unprocessed.is_empty() && !self.patterns.is_empty() {
            for key in unprocessed.clone() {
                let mut matched = false;
                for pattern in self.patterns.iter().filter(|pattern| pattern.matcher.matches(&key)) {
                    matched = true;
                    let result = evaluate_entry(&mut value, &key, &pattern.schema, cx);
                    let ok = result.is_ok();
                    let reasons = result.errors.clone();
                    store(&mut value, &key, result.kept());
                    if !ok {
                        errors.push(child_error(cx, &key, &pattern.schema, reasons));
                        if cx.options.abort_early {
                            return Some(value);
                        }
                    }
                }
                if matched {
                    unprocessed.shift_remove(&key);
                }
            }
        }

        if !unprocessed.is_empty() && (self.children.is_some() || !self.patterns.is_empty()) {
            let flag = cx.node.flags.allow_unknown;
            let strip = cx.options.strip_unknown.objects() && flag != Some(true);
            if strip || cx.options.skip_functions {
                unprocessed.retain(|key| {
                    if strip {
                        store(&mut value, key, None);
                        return false;
                    }
                    !value.get(key).is_some_and(Value::is_function)
                });
            }

            if !flag.unwrap_or(cx.options.allow_unknown) {
                for key in &unprocessed {
                    errors.push(cx.error_for_key(
                        "object.allowUnknown",
                        context!("child" => key.as_str()),
                        PathSegment::from(key.as_str()),
                        Vec::new(),
                    ));
                    if cx.options.abort_early {
                        return Some(value);
                    }
                }
            }
        }

        if let Some(map) = value.as_object() {
            for dependency in &self.dependencies {
                if let Some(report) = self.dependency_error(dependency, map, cx) {
                    errors.push(report);
                    if cx.options.abort_early {
                        break;
                    }
                }
            }
        }

        Some(value)
    }

    fn describe(&self, description: &mut Description) {
        if let Some(children) = &self.children {
            description.children = Some(
                children
                    .iter()
                    .map(|child| (child.key.clone(), crate::schema::describe(&child.schema)))
                    .collect(),
            );
        }
        description.patterns = self
            .patterns
            .iter()
            .map(|pattern| {
                let (regex, schema) = match &pattern.matcher {
                    KeyMatcher::Regex(regex) => (Some(regex.as_str().to_owned()), None),
                    KeyMatcher::Schema(schema) => (None, Some(Box::new(crate::schema::describe(schema)))),
                };
                PatternDescription {
                    regex,
                    schema,
                    rule: Box::new(crate::schema::describe(&pattern.schema)),
                }
            })
            .collect();
        description.renames = self
            .renames
            .iter()
            .map(|rename| {
                let (from, is_regex) = match &rename.from {
                    RenameFrom::Key(key) => (key.clone(), false),
                    RenameFrom::Regex(regex) => (regex.as_str().to_owned(), true),
                };
                RenameDescription {
                    from,
                    to: rename.to.clone(),
                    is_regex,
                    options: rename.options.describe(),
                }
            })
            .collect();
        description.dependencies = self
            .dependencies
            .iter()
            .map(|dependency| DependencyDescription {
                kind: dependency.kind.name().to_owned(),
                key: dependency.key.clone(),
                peers: dependency.peers.clone(),
            })
            .collect();
    }
}

// ============================================================================
// BUILDER
// ============================================================================

fn inner(node: &mut crate::schema::Node) -> Result<&mut ObjectInner, SchemaError> {
    match &mut node.inner {
        Inner::Object(inner) => Ok(inner),
        _ => Err(SchemaError::invalid_argument("object", "not an object schema")),
    }
}

fn object_inner(schema: &Schema) -> Option<&ObjectInner> {
    match &schema.0.inner {
        Inner::Object(inner) => Some(inner),
        _ => None,
    }
}

fn set_presence(schema: Schema, presence: Presence) -> Schema {
    match presence {
        Presence::Required => schema.required(),
        Presence::Optional => schema.optional(),
        Presence::Forbidden => schema.forbidden(),
        Presence::Ignore => schema.map(|node| node.flags.presence = Some(Presence::Ignore)),
    }
}

/// Applies `presence` to the children named by dotted `paths`.
fn apply_to_children(schema: Schema, paths: Vec<String>, presence: Presence) -> Result<Schema, SchemaError> {
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for path in paths {
        let (head, rest) = path.split_once('.').unwrap_or((path.as_str(), ""));
        groups.entry(head.to_owned()).or_default().push(rest.to_owned());
    }

    let mut schema = if groups.shift_remove("").is_some() {
        set_presence(schema, presence)
    } else {
        schema
    };

    let declared = object_inner(&schema).and_then(|inner| inner.children.as_ref());
    let touched = declared.is_some_and(|children| children.iter().any(|child| groups.contains_key(&child.key)));
    if touched {
        let node = std::sync::Arc::make_mut(&mut schema.0);
        if let Inner::Object(ObjectInner {
            children: Some(children),
            ..
        }) = &mut node.inner
        {
            for child in children.iter_mut() {
                if let Some(group) = groups.shift_remove(&child.key) {
                    child.schema = apply_to_children(child.schema.clone(), group, presence)?;
                }
            }
        }
    }

    if groups.is_empty() {
        Ok(schema)
    } else {
        Err(SchemaError::UnknownKeys {
            keys: groups.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }
}

impl ObjectSchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Object(ObjectInner::default())))
    }

    /// Declares keys. Existing keys of the same name are replaced; a value
    /// that is not a schema is compiled. An empty list allows no keys at all.
    pub fn keys<I, K, V>(self, keys: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SchemaLike>,
    {
        let model = self.0.model();
        let added = keys
            .into_iter()
            .map(|(key, like)| {
                let key = key.into();
                let schema = compile(&model, like.into()).map_err(|err| err.within(&key))?;
                Ok(Child { key, schema })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        let outer: Vec<Ref> = added
            .iter()
            .flat_map(|child| child.schema.0.refs.iter().filter_map(Ref::climbed))
            .collect();
        try_map(self, |node| {
            // Descendants reaching past this object order its own siblings.
            for reference in &outer {
                node.add_ref(reference);
            }
            inner(node)?.add_children(added)
        })
    }

    /// Like [`keys`](Self::keys), but an empty list changes nothing.
    pub fn append<I, K, V>(self, keys: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SchemaLike>,
    {
        let mut keys = keys.into_iter().peekable();
        if keys.peek().is_none() {
            return Ok(self);
        }
        self.keys(keys)
    }

    /// Forgets declared keys: any key is accepted again.
    pub fn any_keys(self) -> Self {
        if object_inner(&self.0).is_some_and(|inner| inner.children.is_none()) {
            return self;
        }
        map(self, |node| {
            if let Inner::Object(inner) = &mut node.inner {
                inner.children = None;
            }
        })
    }

    /// Whether undeclared keys are allowed, regardless of options.
    pub fn unknown(self, allow: bool) -> Self {
        if self.0.0.flags.allow_unknown == Some(allow) {
            return self;
        }
        map(self, |node| node.flags.allow_unknown = Some(allow))
    }

    /// At least `limit` keys.
    pub fn min(self, limit: usize) -> Self {
        map(self, |node| push_size_rule(node, "object", Bound::Min, Limit::Value(limit)))
    }

    /// At most `limit` keys.
    pub fn max(self, limit: usize) -> Self {
        map(self, |node| push_size_rule(node, "object", Bound::Max, Limit::Value(limit)))
    }

    /// Exactly `limit` keys.
    pub fn length(self, limit: usize) -> Self {
        map(self, |node| push_size_rule(node, "object", Bound::Length, Limit::Value(limit)))
    }

    /// Validates undeclared keys matching `key` against `schema`.
    pub fn pattern(self, key: Regex, schema: impl Into<SchemaLike>) -> Result<Self, SchemaError> {
        self.add_pattern(KeyMatcher::Regex(key), schema.into())
    }

    /// Validates undeclared keys accepted by `key` against `schema`.
    pub fn pattern_match(self, key: impl Into<SchemaLike>, schema: impl Into<SchemaLike>) -> Result<Self, SchemaError> {
        let matcher = compile(&self.0.model(), key.into())?;
        self.add_pattern(KeyMatcher::Schema(matcher), schema.into())
    }

    fn add_pattern(self, matcher: KeyMatcher, schema: SchemaLike) -> Result<Self, SchemaError> {
        let schema = compile(&self.0.model(), schema)?;
        try_map(self, |node| {
            inner(node)?.patterns.push(Pattern { matcher, schema });
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Dependencies
    // ------------------------------------------------------------------------

    fn dependency<I>(self, kind: DependencyKind, key: Option<String>, peers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let peers = peers.into_iter().map(Into::into).collect();
        map(self, |node| {
            if let Inner::Object(inner) = &mut node.inner {
                inner.dependencies.push(Dependency { kind, key, peers });
            }
        })
    }

    /// All of `peers` or none of them.
    pub fn and<I>(self, peers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dependency(DependencyKind::And, None, peers)
    }

    /// Not all of `peers` together.
    pub fn nand<I>(self, peers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dependency(DependencyKind::Nand, None, peers)
    }

    /// At least one of `peers`.
    pub fn or<I>(self, peers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dependency(DependencyKind::Or, None, peers)
    }

    /// Exactly one of `peers`.
    pub fn xor<I>(self, peers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dependency(DependencyKind::Xor, None, peers)
    }

    /// When `key` is present, all of `peers` must be.
    pub fn with<I>(self, key: impl Into<String>, peers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dependency(DependencyKind::With, Some(key.into()), peers)
    }

    /// When `key` is present, none of `peers` may be.
    pub fn without<I>(self, key: impl Into<String>, peers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dependency(DependencyKind::Without, Some(key.into()), peers)
    }

    // ------------------------------------------------------------------------
    // Renames
    // ------------------------------------------------------------------------

    /// Moves the key `from` to `to` before children are validated.
    pub fn rename(self, from: impl Into<String>, to: impl Into<String>, options: RenameOptions) -> Result<Self, SchemaError> {
        let from = from.into();
        let to = to.into();
        if from == to {
            return Err(SchemaError::RenameToSelf { key: from });
        }
        self.add_rename(RenameFrom::Key(from), to, options)
    }

    /// Moves every key matching `from` to `to`; the last match wins.
    pub fn rename_matching(self, from: Regex, to: impl Into<String>, options: RenameOptions) -> Result<Self, SchemaError> {
        self.add_rename(RenameFrom::Regex(from), to.into(), options)
    }

    fn add_rename(self, from: RenameFrom, to: String, options: RenameOptions) -> Result<Self, SchemaError> {
        try_map(self, |node| {
            let inner = inner(node)?;
            let duplicate = inner.renames.iter().any(|existing| match (&existing.from, &from) {
                (RenameFrom::Key(a), RenameFrom::Key(b)) => a == b,
                (RenameFrom::Regex(a), RenameFrom::Regex(b)) => a.as_str() == b.as_str(),
                _ => false,
            });
            if duplicate {
                let key = match &from {
                    RenameFrom::Key(key) => key.clone(),
                    RenameFrom::Regex(regex) => regex.as_str().to_owned(),
                };
                return Err(SchemaError::DuplicateRename { key });
            }
            inner.renames.push(Rename { from, to, options });
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Assertions and key presence
    // ------------------------------------------------------------------------

    /// Requires the value `reference` points at (inside this object, or in
    /// the context) to match `schema`. Fails with `object.assert`, reported
    /// at the referenced path.
    pub fn assert(
        self,
        reference: impl Into<Ref>,
        schema: impl Into<SchemaLike>,
        message: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let reference = reference.into();
        if reference.scope() == RefScope::Ancestor(1) && reference.path().len() < 2 {
            return Err(SchemaError::invalid_argument(
                "assert",
                "Cannot use assertions for root level references - use direct key rules instead",
            ));
        }
        let schema = compile(&self.0.model(), schema.into())?;
        let message = message.unwrap_or("pass the assertion test").to_owned();
        let dotted = reference.path().join(".");
        let key = reference.path().last().cloned().unwrap_or_default();
        let path: Path = reference.path().iter().map(|segment| PathSegment::from(segment.as_str())).collect();

        let arg: Value = [
            ("ref", Value::from(reference.to_string())),
            (
                "schema",
                serde_json::to_value(crate::schema::describe(&schema))
                    .map(Value::from)
                    .unwrap_or_default(),
            ),
        ]
        .into_iter()
        .collect();

        let rule = Rule::test("assert", Some(arg), move |value, cx| {
            let link = Chain {
                value,
                up: cx.state.parent,
            };
            let target = reference.resolve(None, Some(&link), cx.options.context.as_ref());
            let state = State::detached(Some(&link));
            if evaluate(&schema, target, &state, cx.options).is_ok() {
                return Ok(());
            }
            Err(cx.error_at(
                "object.assert",
                context!("ref" => dotted.as_str(), "message" => message.as_str()),
                PathSegment::from(key.as_str()),
                path.clone(),
            ))
        });
        Ok(map(self, |node| node.push_rule(rule)))
    }

    /// Marks the children at dotted `paths` as required.
    pub fn required_keys<I>(self, paths: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.keys_presence(paths, Presence::Required)
    }

    /// Marks the children at dotted `paths` as optional.
    pub fn optional_keys<I>(self, paths: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.keys_presence(paths, Presence::Optional)
    }

    /// Marks the children at dotted `paths` as forbidden.
    pub fn forbidden_keys<I>(self, paths: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.keys_presence(paths, Presence::Forbidden)
    }

    fn keys_presence<I>(self, paths: I, presence: Presence) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(SchemaError::invalid_argument("keys", "expected at least one children"));
        }
        if paths.iter().any(String::is_empty) {
            return Err(SchemaError::UnknownKeys { keys: String::new() });
        }
        apply_to_children(self.0, paths, presence).map(Self)
    }
}
