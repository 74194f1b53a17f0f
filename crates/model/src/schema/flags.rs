//! Node flags, metadata and allowed/denied value sets.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use super::Schema;
use super::rule::NodeContext;
use crate::foundation::{Presence, Ref, Report};
use crate::value::Value;

/// Error returned by a default generator.
pub type GeneratorError = Box<dyn StdError + Send + Sync>;

pub(crate) type Generate = Arc<dyn Fn(Option<&Value>) -> Result<Value, GeneratorError> + Send + Sync>;
pub(crate) type Remap = Arc<dyn Fn(&[Report]) -> String + Send + Sync>;

/// Value substituted for an absent one.
#[derive(Clone)]
pub(crate) enum DefaultValue {
    Value(Value),
    Ref(Ref),
    Generator { description: String, generate: Generate },
}

impl DefaultValue {
    /// Produces the default for the node `cx` evaluates. The generator
    /// receives the parent container.
    pub(crate) fn produce(&self, cx: &NodeContext<'_>) -> Result<Option<Value>, String> {
        match self {
            Self::Value(value) => Ok(Some(value.clone())),
            Self::Ref(reference) => Ok(cx.resolve(reference)),
            Self::Generator { generate, .. } => generate(cx.state.parent.map(|chain| chain.value))
                .map(Some)
                .map_err(|err| err.to_string()),
        }
    }

    pub(crate) fn describe(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Ref(reference) => Value::String(reference.to_string()),
            Self::Generator { description, .. } => Value::String(description.clone()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Ref(reference) => f.debug_tuple("Ref").field(reference).finish(),
            Self::Generator { description, .. } => f.debug_tuple("Generator").field(description).finish(),
        }
    }
}

/// A user-installed replacement for the errors of a subtree.
#[derive(Clone)]
pub(crate) enum ErrorOverride {
    Fixed(Arc<dyn StdError + Send + Sync>),
    Remap(Remap),
}

impl ErrorOverride {
    pub(crate) fn describe(&self) -> Value {
        match self {
            Self::Fixed(err) => Value::String(err.to_string()),
            Self::Remap(_) => Value::String("[Function]".to_owned()),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct Flags {
    pub(crate) presence: Option<Presence>,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) allow_only: bool,
    pub(crate) strip: bool,
    pub(crate) insensitive: bool,
    pub(crate) raw: bool,
    pub(crate) single: bool,
    pub(crate) allow_unknown: Option<bool>,
    pub(crate) empty: Option<Schema>,
    pub(crate) error: Option<ErrorOverride>,
    pub(crate) label: Option<String>,
}

impl Flags {
    /// Layers `other` on top: set options win, booleans accumulate.
    pub(crate) fn merge(&mut self, other: &Self) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(
                    if other.$field.is_some() {
                        self.$field.clone_from(&other.$field);
                    }
                )*
            };
        }
        take!(presence, default, allow_unknown, empty, error, label);
        self.allow_only |= other.allow_only;
        self.strip |= other.strip;
        self.insensitive |= other.insensitive;
        self.raw |= other.raw;
        self.single |= other.single;
    }
}

#[derive(Clone, Default)]
pub(crate) struct Meta {
    pub(crate) description: Option<String>,
    pub(crate) notes: Vec<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) examples: Vec<Value>,
    pub(crate) meta: Vec<Value>,
    pub(crate) unit: Option<String>,
}

impl Meta {
    pub(crate) fn merge(&mut self, other: &Self) {
        if other.description.is_some() {
            self.description.clone_from(&other.description);
        }
        if other.unit.is_some() {
            self.unit.clone_from(&other.unit);
        }
        self.notes.extend(other.notes.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
        self.examples.extend(other.examples.iter().cloned());
        self.meta.extend(other.meta.iter().cloned());
    }
}

// ============================================================================
// VALUE SETS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Entry {
    Value(Value),
    Ref(Ref),
}

impl Entry {
    fn describe(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Ref(reference) => Value::String(reference.to_string()),
        }
    }
}

/// Ordered set of literals and references, for `valid` and `invalid`.
#[derive(Debug, Clone, Default)]
pub(crate) struct ValueSet {
    entries: Vec<Entry>,
}

impl ValueSet {
    pub(crate) fn add(&mut self, entry: Entry) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    pub(crate) fn remove(&mut self, entry: &Entry) {
        self.entries.retain(|existing| existing != entry);
    }

    /// Adds every entry of `add`, then drops every entry of `remove`.
    pub(crate) fn merge(&mut self, add: &Self, remove: &Self) {
        for entry in &add.entries {
            self.add(entry.clone());
        }
        for entry in &remove.entries {
            self.remove(entry);
        }
    }

    /// Whether `value` matches an entry. A reference resolving to an array
    /// matches any of its elements.
    pub(crate) fn has(&self, value: &Value, cx: &NodeContext<'_>, insensitive: bool) -> bool {
        let equals = |item: &Value| {
            if insensitive {
                value.eq_insensitive(item)
            } else {
                value == item
            }
        };
        self.entries.iter().any(|entry| match entry {
            Entry::Value(item) => equals(item),
            Entry::Ref(reference) => match cx.resolve_with(reference, Some(value)) {
                Some(Value::Array(items)) => items.iter().any(equals),
                Some(item) => equals(&item),
                None => false,
            },
        })
    }

    /// Entries as shown in messages and descriptions.
    pub(crate) fn describe(&self) -> Vec<Value> {
        self.entries.iter().map(Entry::describe).collect()
    }
}
