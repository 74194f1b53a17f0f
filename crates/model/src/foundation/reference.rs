//! References
//!
//! A [`Ref`] is a lazy pointer to another value, resolved while validating.
//! The key syntax selects where resolution starts:
//!
//! | Key        | Starts at                                   |
//! |------------|---------------------------------------------|
//! | `a.b`      | the parent container (a sibling key)        |
//! | `.a`       | the value itself                            |
//! | `..a`      | the parent container (same as `a`)          |
//! | `...a`     | the grandparent, one more `.` per level up  |
//! | `/a`       | the root value                              |
//! | `$a.b`     | the external `context` option               |
//!
//! Resolution never coerces or validates the target; it returns the current
//! value or `None`.
//!
//! # Examples
//!
//! ```rust,ignore
//! use nebula_model::prelude::*;
//!
//! let schema = object().keys([
//!     ("a", number().into()),
//!     ("b", number().max_ref("a").into()),
//! ])?;
//! ```

use std::fmt;

use super::state::Chain;
use crate::value::Value;

const CONTEXT_PREFIX: char = '$';
const ROOT_PREFIX: char = '/';
const DEFAULT_SEPARATOR: char = '.';

/// Where a reference starts resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefScope {
    /// The external `context` option.
    Context,
    /// The root value under validation.
    Root,
    /// `Ancestor(0)` is the value itself, `Ancestor(1)` its parent container,
    /// and so on.
    Ancestor(usize),
}

/// A lazy pointer to another value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    key: String,
    path: Vec<String>,
    scope: RefScope,
    separator: char,
}

impl Ref {
    /// Parses `key` with the default `.` separator.
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_separator(key, DEFAULT_SEPARATOR)
    }

    /// Parses `key` with a custom path separator.
    pub fn with_separator(key: impl Into<String>, separator: char) -> Self {
        let key = key.into();
        let (scope, rest) = if let Some(rest) = key.strip_prefix(CONTEXT_PREFIX) {
            (RefScope::Context, rest)
        } else if let Some(rest) = key.strip_prefix(ROOT_PREFIX) {
            (RefScope::Root, rest)
        } else {
            let trimmed = key.trim_start_matches(separator);
            let leading = key.chars().count() - trimmed.chars().count();
            let depth = if leading == 0 { 1 } else { leading - 1 };
            (RefScope::Ancestor(depth), trimmed)
        };

        let path = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(separator).map(str::to_owned).collect()
        };

        Self {
            key: rest.to_owned(),
            path,
            scope,
            separator,
        }
    }

    /// The key without its scope prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path segments after the scope prefix.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Where resolution starts.
    pub const fn scope(&self) -> RefScope {
        self.scope
    }

    /// Path separator this reference was parsed with.
    pub const fn separator(&self) -> char {
        self.separator
    }

    /// `true` for `$`-prefixed references.
    pub const fn is_context(&self) -> bool {
        matches!(self.scope, RefScope::Context)
    }

    /// The sibling key this reference depends on, if it points at one.
    pub fn sibling(&self) -> Option<&str> {
        match self.scope {
            RefScope::Ancestor(1) => self.path.first().map(String::as_str),
            _ => None,
        }
    }

    /// The same reference as seen from the enclosing container, or `None`
    /// when it does not reach past it.
    pub(crate) fn climbed(&self) -> Option<Self> {
        match self.scope {
            RefScope::Ancestor(n) if n >= 2 => Some(Self {
                scope: RefScope::Ancestor(n - 1),
                ..self.clone()
            }),
            _ => None,
        }
    }

    /// Resolves against the value itself, its ancestors and the context.
    pub(crate) fn resolve(
        &self,
        current: Option<&Value>,
        parent: Option<&Chain<'_>>,
        context: Option<&Value>,
    ) -> Option<Value> {
        let start = match self.scope {
            RefScope::Context => context,
            RefScope::Root => parent.map(Chain::root).or(current),
            RefScope::Ancestor(0) => current,
            RefScope::Ancestor(n) => parent.and_then(|chain| chain.nth(n - 1)),
        }?;
        start.reach(self.path.as_slice()).cloned()
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            RefScope::Context => write!(f, "context:{}", self.key),
            _ => write!(f, "ref:{}", self.key),
        }
    }
}

impl From<&str> for Ref {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Ref {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}
