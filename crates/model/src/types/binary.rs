//! The `binary` type.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::{Bound, push_size_rule};
use crate::foundation::Ref;
use crate::schema::rule::{Limit, NodeContext};
use crate::schema::{Description, Evaluate, Inner, Schema, map, typed_schema};
use crate::value::Value;

typed_schema!(
    /// Byte buffers. Strings convert using the configured encoding.
    ///
    /// ```rust,ignore
    /// let key = binary().encoding(Encoding::Hex).length(32);
    /// ```
    BinarySchema,
    "binary"
);

/// How strings are turned into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Hex,
    Base64,
}

impl Encoding {
    const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Hex => "hex",
            Self::Base64 => "base64",
        }
    }

    fn decode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            Self::Utf8 => Some(text.as_bytes().to_vec()),
            Self::Hex => hex::decode(text).ok(),
            Self::Base64 => STANDARD.decode(text).ok(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BinaryInner {
    encoding: Option<Encoding>,
}

impl BinaryInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        if other.encoding.is_some() {
            self.encoding = other.encoding;
        }
    }
}

impl Evaluate for BinaryInner {
    fn coerce(&self, value: &Value, _cx: &NodeContext<'_>) -> Option<Value> {
        let text = value.as_str()?;
        self.encoding.unwrap_or_default().decode(text).map(Value::Binary)
    }

    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        matches!(value, Value::Binary(_))
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "binary.base"
    }

    fn describe(&self, description: &mut Description) {
        if let Some(encoding) = self.encoding {
            description.flag("encoding", encoding.name());
        }
    }
}

impl BinarySchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Binary(BinaryInner::default())))
    }

    /// Encoding of strings converted to bytes. UTF-8 when unset.
    pub fn encoding(self, encoding: Encoding) -> Self {
        if matches!(&self.0.0.inner, Inner::Binary(inner) if inner.encoding == Some(encoding)) {
            return self;
        }
        map(self, |node| {
            if let Inner::Binary(inner) = &mut node.inner {
                inner.encoding = Some(encoding);
            }
        })
    }

    fn size(self, bound: Bound, limit: Limit<usize>) -> Self {
        map(self, |node| push_size_rule(node, "binary", bound, limit))
    }

    /// At least `limit` bytes.
    pub fn min(self, limit: usize) -> Self {
        self.size(Bound::Min, Limit::Value(limit))
    }

    pub fn min_ref(self, reference: impl Into<Ref>) -> Self {
        self.size(Bound::Min, Limit::Ref(reference.into()))
    }

    /// At most `limit` bytes.
    pub fn max(self, limit: usize) -> Self {
        self.size(Bound::Max, Limit::Value(limit))
    }

    pub fn max_ref(self, reference: impl Into<Ref>) -> Self {
        self.size(Bound::Max, Limit::Ref(reference.into()))
    }

    /// Exactly `limit` bytes.
    pub fn length(self, limit: usize) -> Self {
        self.size(Bound::Length, Limit::Value(limit))
    }

    pub fn length_ref(self, reference: impl Into<Ref>) -> Self {
        self.size(Bound::Length, Limit::Ref(reference.into()))
    }
}
