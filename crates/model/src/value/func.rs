use std::fmt;
use std::sync::Arc;

use super::Value;

type Callable = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A callable value with a declared arity.
///
/// Two `Func`s are equal only when they share the same underlying closure.
#[derive(Clone)]
pub struct Func {
    name: Option<String>,
    arity: usize,
    call: Arc<Callable>,
}

impl Func {
    /// Creates an anonymous function taking `arity` arguments.
    pub fn new(arity: usize, call: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self {
            name: None,
            arity,
            call: Arc::new(call),
        }
    }

    /// Creates a named function taking `arity` arguments.
    pub fn named(
        name: impl Into<String>,
        arity: usize,
        call: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(arity, call)
        }
    }

    /// Declared number of arguments.
    pub const fn arity(&self) -> usize {
        self.arity
    }

    /// Function name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invokes the function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.call)(args)
    }

    /// `true` when both handles point at the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "[Function: {name}]"),
            None => f.write_str("[Function]"),
        }
    }
}
