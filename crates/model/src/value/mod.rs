//! Dynamic values
//!
//! [`Value`] is the data tree every schema validates. It covers the shapes a
//! schema can describe: JSON data plus dates, raw bytes and callables.
//! Absence (a missing key, an unset default) is never a `Value`; the engine
//! models it as `Option<Value>` so objects and arrays only ever hold present
//! entries.
//!
//! # Examples
//!
//! ```rust,ignore
//! use nebula_model::Value;
//! use serde_json::json;
//!
//! let value = Value::from(json!({ "a": [1, 2, 3] }));
//! assert_eq!(value.get("a").and_then(|a| a.get("1")), Some(&Value::from(2)));
//! ```

mod display;
mod func;

pub(crate) use display::{format_number, quote};
pub use func::Func;

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered key/value storage for objects. Insertion order is preserved.
pub type Map = IndexMap<String, Value>;

// ============================================================================
// VALUE
// ============================================================================

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Explicit `null`.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. All numbers are `f64`.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// A point in time.
    Date(DateTime<Utc>),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// A callable with a declared arity.
    Function(Func),
    /// An ordered list.
    Array(Vec<Value>),
    /// An ordered map of string keys.
    Object(Map),
}

/// The shape of a [`Value`], used for type names in descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `null`
    Null,
    /// `boolean`
    Bool,
    /// `number`
    Number,
    /// `string`
    String,
    /// `date`
    Date,
    /// `binary`
    Binary,
    /// `function`
    Function,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl ValueKind {
    /// Returns the lowercase type name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::Binary => "binary",
            Self::Function => "function",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Creates an empty object.
    pub fn object() -> Self {
        Self::Object(Map::new())
    }

    /// Creates a binary value.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Binary(bytes.into())
    }

    /// Creates a date value.
    pub const fn date(date: DateTime<Utc>) -> Self {
        Self::Date(date)
    }

    /// Returns the kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
            Self::Date(_) => ValueKind::Date,
            Self::Binary(_) => ValueKind::Binary,
            Self::Function(_) => ValueKind::Function,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Returns `true` for `null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for strings.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns `true` for numbers.
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Returns `true` for objects.
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns `true` for arrays.
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns `true` for functions.
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a number.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the date if this is a date.
    pub const fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the bytes if this is binary.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the callable if this is a function.
    pub const fn as_func(&self) -> Option<&Func> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the elements if this is an array.
    pub const fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the mutable elements if this is an array.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the entries if this is an object.
    pub const fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the mutable entries if this is an object.
    pub fn as_object_mut(&mut self) -> Option<&mut Map> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up one step: an object key, or an array index written in decimal.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(m) => m.get(key),
            Self::Array(a) => key.parse::<usize>().ok().and_then(|i| a.get(i)),
            _ => None,
        }
    }

    /// Walks a sequence of keys. An empty path returns `self`.
    pub fn reach<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |current, key| current.get(key.as_ref()))
    }

    /// Number of own entries for containers, `None` otherwise.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Array(a) => Some(a.len()),
            Self::Object(m) => Some(m.len()),
            Self::String(s) => Some(s.chars().count()),
            Self::Binary(b) => Some(b.len()),
            _ => None,
        }
    }

    /// `true` for empty containers and strings.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Case-insensitive string comparison, falling back to equality.
    pub(crate) fn eq_insensitive(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => self == other,
        }
    }
}

// ============================================================================
// EQUALITY
// ============================================================================

/// Same-value-zero equality: `NaN` equals `NaN`, `0` equals `-0`. Containers
/// compare structurally, objects without regard to key order, functions by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display::to_json(self))
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_from_number!(f32, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<Func> for Value {
    fn from(value: Func) -> Self {
        Self::Function(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(a) => Self::Array(a.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(m) => {
                Self::Object(m.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        Self::from(value.clone())
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Function(_) => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => number_to_json(n),
            Value::String(s) => Self::String(s),
            Value::Date(d) => Self::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Binary(b) => Self::Array(b.into_iter().map(Self::from).collect()),
            Value::Array(a) => Self::Array(a.into_iter().map(Self::from).collect()),
            Value::Object(m) => Self::Object(m.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// `Some(i)` when `n` is an integer that survives the `f64` round trip.
pub(crate) fn as_safe_integer(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then_some(n as i64)
}

fn number_to_json(n: f64) -> serde_json::Value {
    match as_safe_integer(n) {
        Some(i) => serde_json::Value::from(i),
        None => serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match as_safe_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Binary(b) => serializer.collect_seq(b.iter()),
            Self::Function(f) => serializer.serialize_str(&f.to_string()),
            Self::Array(a) => serializer.collect_seq(a.iter()),
            Self::Object(m) => serializer.collect_map(m.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}
