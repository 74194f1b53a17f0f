//! Evaluation state: where a value sits in the tree being validated.

use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

use crate::value::Value;

/// One step of a path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&PathSegment> for Value {
    fn from(segment: &PathSegment) -> Self {
        match segment {
            PathSegment::Key(key) => Self::String(key.clone()),
            PathSegment::Index(index) => Self::from(*index),
        }
    }
}

pub(crate) type Path = SmallVec<[PathSegment; 4]>;

/// Ancestor values of the node being evaluated, innermost first.
///
/// Each link borrows a container that the enclosing frame is still building,
/// so references see siblings validated earlier in the same pass.
#[derive(Clone, Copy)]
pub(crate) struct Chain<'a> {
    pub(crate) value: &'a Value,
    pub(crate) up: Option<&'a Chain<'a>>,
}

impl<'a> Chain<'a> {
    /// `nth(0)` is the immediate parent.
    pub(crate) fn nth(&self, n: usize) -> Option<&'a Value> {
        let mut link = self;
        for _ in 0..n {
            link = link.up?;
        }
        Some(link.value)
    }

    /// The outermost container.
    pub(crate) fn root(&self) -> &'a Value {
        let mut link = self;
        while let Some(up) = link.up {
            link = up;
        }
        link.value
    }
}

/// Location of the node being evaluated.
#[derive(Clone, Default)]
pub(crate) struct State<'a> {
    pub(crate) key: Option<PathSegment>,
    pub(crate) path: Path,
    pub(crate) parent: Option<&'a Chain<'a>>,
}

impl<'a> State<'a> {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    /// A root state that still resolves references against `parent`.
    pub(crate) fn detached(parent: Option<&'a Chain<'a>>) -> Self {
        Self {
            key: None,
            path: Path::new(),
            parent,
        }
    }

    /// State of the entry `key` inside the container `parent`.
    pub(crate) fn child(&self, key: PathSegment, parent: &'a Chain<'a>) -> Self {
        let mut path = self.path.clone();
        path.push(key.clone());
        Self {
            key: Some(key),
            path,
            parent: Some(parent),
        }
    }

    /// Path of the entry `key` below this state.
    pub(crate) fn path_to(&self, key: PathSegment) -> Path {
        let mut path = self.path.clone();
        path.push(key);
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chain_walks_upwards() {
        let root = Value::from(json!({ "a": { "b": 1 } }));
        let inner = Value::from(json!({ "b": 1 }));
        let outer = Chain { value: &root, up: None };
        let chain = Chain { value: &inner, up: Some(&outer) };

        assert_eq!(chain.nth(0), Some(&inner));
        assert_eq!(chain.nth(1), Some(&root));
        assert_eq!(chain.nth(2), None);
        assert_eq!(chain.root(), &root);
    }

    #[test]
    fn child_state_extends_path() {
        let value = Value::object();
        let chain = Chain { value: &value, up: None };
        let state = State::root()
            .child(PathSegment::from("a"), &chain)
            .child(PathSegment::Index(0), &chain);
        assert_eq!(state.path.as_slice(), &[PathSegment::from("a"), PathSegment::Index(0)]);
        assert_eq!(state.key, Some(PathSegment::Index(0)));
    }

    #[test]
    fn segments_serialize_untagged() {
        let path = vec![PathSegment::from("a"), PathSegment::Index(2)];
        assert_eq!(serde_json::to_value(&path).unwrap(), json!(["a", 2]));
    }
}
