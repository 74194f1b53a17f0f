//! Error types
//!
//! Two classes of error never mix:
//!
//! - [`SchemaError`]: a schema *definition* is malformed (bad rule argument,
//!   cyclic keys, uncompilable literal, invalid extension). Returned from the
//!   builder call that caused it.
//! - [`ValidationError`]: a value does not satisfy a schema. Produced by
//!   validation, built from a tree of [`Report`]s whose leaves become the
//!   public [`Detail`] list.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use super::state::{Path, PathSegment};
use crate::value::Value;

/// Named values used to render a message (`limit`, `value`, `label`, `key`, ...).
pub type Context = IndexMap<String, Value>;

// ============================================================================
// CONSTRUCTION-TIME ERRORS
// ============================================================================

/// A schema definition is malformed.
///
/// These are programmer errors: they surface from the builder call, compile
/// or extension registration that received the bad input, never from
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// A literal could not be turned into a schema. `path` is the dotted
    /// location of the offending leaf, `None` at the root.
    #[error("Invalid schema content{}", .path.as_ref().map(|p| format!(": ({p})")).unwrap_or_default())]
    InvalidContent { path: Option<String> },

    /// Sibling keys reference each other in a cycle.
    #[error("item added into group {key} created a dependencies error")]
    ReferenceCycle { key: String },

    /// A rename targets the key it renames.
    #[error("Cannot rename key to same name: {key}")]
    RenameToSelf { key: String },

    /// The same source key was renamed twice.
    #[error("Cannot rename the same key multiple times: {key}")]
    DuplicateRename { key: String },

    /// `required_keys` and friends named keys the object does not declare.
    #[error("unknown key(s) {keys}")]
    UnknownKeys { keys: String },

    /// A builder argument is out of its accepted domain.
    #[error("{method}: {reason}")]
    InvalidArgument {
        method: &'static str,
        reason: String,
    },

    /// Two schemas of different base types cannot be concatenated.
    #[error("Cannot merge type {left} with another type: {right}")]
    IncompatibleConcat { left: String, right: String },

    /// A defaults function changed the base type of a schema.
    #[error("defaults() must return a {expected} schema, got {found}")]
    DefaultsChangedType { expected: String, found: String },

    /// An extension definition is malformed.
    #[error("invalid extension `{name}`: {reason}")]
    InvalidExtension { name: String, reason: String },

    /// No extension type with this name is registered.
    #[error("unknown type `{name}`")]
    UnknownType { name: String },

    /// No extension rule with this name exists on the schema's type.
    #[error("unknown rule `{rule}` on type {type_name}")]
    UnknownRule { type_name: String, rule: String },

    /// More rule arguments than declared parameters.
    #[error("Unexpected number of arguments for rule `{rule}`: expected at most {expected}, got {found}")]
    UnexpectedArguments {
        rule: String,
        expected: usize,
        found: usize,
    },

    /// Rule arguments failed their parameter schema.
    #[error("invalid arguments for rule `{rule}`: {message}")]
    InvalidRuleParams { rule: String, message: String },

    /// A regular expression failed to compile.
    #[error("invalid regular expression: {message}")]
    Regex { message: String },
}

impl SchemaError {
    pub(crate) fn invalid_argument(method: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            method,
            reason: reason.into(),
        }
    }

    /// Prefixes the dotted path of an [`InvalidContent`](Self::InvalidContent)
    /// error with `key`. Other variants pass through.
    pub(crate) fn within(self, key: &str) -> Self {
        match self {
            Self::InvalidContent { path } => Self::InvalidContent {
                path: Some(match path {
                    Some(inner) => format!("{key}.{inner}"),
                    None => key.to_owned(),
                }),
            },
            other => other,
        }
    }

    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidContent { .. } => "SCHEMA_INVALID_CONTENT",
            Self::ReferenceCycle { .. } => "SCHEMA_REFERENCE_CYCLE",
            Self::RenameToSelf { .. } => "SCHEMA_RENAME_SELF",
            Self::DuplicateRename { .. } => "SCHEMA_RENAME_DUPLICATE",
            Self::UnknownKeys { .. } => "SCHEMA_UNKNOWN_KEYS",
            Self::InvalidArgument { .. } => "SCHEMA_INVALID_ARGUMENT",
            Self::IncompatibleConcat { .. } => "SCHEMA_CONCAT",
            Self::DefaultsChangedType { .. } => "SCHEMA_DEFAULTS",
            Self::InvalidExtension { .. } => "SCHEMA_EXTENSION",
            Self::UnknownType { .. } => "SCHEMA_UNKNOWN_TYPE",
            Self::UnknownRule { .. } => "SCHEMA_UNKNOWN_RULE",
            Self::UnexpectedArguments { .. } => "SCHEMA_RULE_ARITY",
            Self::InvalidRuleParams { .. } => "SCHEMA_RULE_PARAMS",
            Self::Regex { .. } => "SCHEMA_REGEX",
        }
    }
}

impl From<regex::Error> for SchemaError {
    fn from(err: regex::Error) -> Self {
        Self::Regex {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// One failure produced while evaluating a schema node.
///
/// Reports form a tree: a composite failure such as `object.child` carries
/// the failures of the child in [`reasons`](Self::reasons). Messages are
/// rendered when the report is created, using the language in effect at that
/// node.
#[derive(Debug, Clone)]
pub struct Report {
    pub(crate) code: Cow<'static, str>,
    pub(crate) message: String,
    pub(crate) path: Path,
    pub(crate) context: Context,
    pub(crate) reasons: Vec<Report>,
    pub(crate) replacement: Option<Arc<dyn StdError + Send + Sync>>,
}

impl Report {
    /// Dot-namespaced error code, e.g. `number.max`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Location of the failing value.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Values used to render the message.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Nested failures this report summarises.
    pub fn reasons(&self) -> &[Report] {
        &self.reasons
    }

    /// A report standing in for a user-supplied error.
    pub(crate) fn replaced(error: Arc<dyn StdError + Send + Sync>, path: Path) -> Self {
        Self {
            code: Cow::Borrowed("override"),
            message: error.to_string(),
            path,
            context: Context::new(),
            reasons: Vec::new(),
            replacement: Some(error),
        }
    }

    /// A report carrying a user-supplied message over the original failures.
    pub(crate) fn overridden(message: String, path: Path, reasons: Vec<Report>) -> Self {
        Self {
            code: Cow::Borrowed("override"),
            message,
            path,
            context: Context::new(),
            reasons,
            replacement: None,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// DETAIL
// ============================================================================

/// One leaf failure as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detail {
    /// Rendered message.
    pub message: String,
    /// Location of the failing value.
    pub path: Vec<PathSegment>,
    /// Dot-namespaced error code.
    #[serde(rename = "type")]
    pub code: String,
    /// Values used to render the message.
    pub context: Context,
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// A value failed validation.
///
/// The message joins the top-level failures with `. `; [`details`](Self::details)
/// lists every leaf failure in evaluation order. When a schema installed a
/// replacement error with `.error(...)`, that error is exposed through
/// [`source`](StdError::source) and the details are empty.
#[derive(Debug, Clone)]
pub struct ValidationError {
    message: String,
    details: Vec<Detail>,
    object: Option<Value>,
    custom: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ValidationError {
    /// Flattens a report tree. Returns the user's replacement error instead
    /// when any report on the way carries one.
    pub(crate) fn from_reports(reports: &[Report], object: Option<Value>) -> Self {
        let mut message = String::new();
        let mut details = Vec::new();
        if let Some(custom) = collect(reports, true, &mut message, &mut details) {
            return Self::custom(custom, object);
        }
        Self {
            message,
            details,
            object,
            custom: None,
        }
    }

    pub(crate) fn custom(error: Arc<dyn StdError + Send + Sync>, object: Option<Value>) -> Self {
        Self {
            message: error.to_string(),
            details: Vec::new(),
            object,
            custom: Some(error),
        }
    }

    pub(crate) fn with_message(mut self, message: String) -> Self {
        self.message = message;
        self
    }

    /// The joined top-level message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Every leaf failure, in evaluation order.
    pub fn details(&self) -> &[Detail] {
        &self.details
    }

    /// The input that was validated.
    pub fn object(&self) -> Option<&Value> {
        self.object.as_ref()
    }

    /// `true` when a schema-installed error replaced the generated one.
    pub fn is_custom(&self) -> bool {
        self.custom.is_some()
    }

    /// Renders the input with each failure marked by its index, followed by
    /// the numbered messages. ANSI colours are emitted unless `strip_colors`.
    pub fn annotate(&self, strip_colors: bool) -> String {
        super::annotate::annotate(self, strip_colors)
    }
}

fn collect(
    reports: &[Report],
    top: bool,
    message: &mut String,
    details: &mut Vec<Detail>,
) -> Option<Arc<dyn StdError + Send + Sync>> {
    for report in reports {
        if let Some(custom) = &report.replacement {
            return Some(Arc::clone(custom));
        }
        if top {
            if !message.is_empty() {
                message.push_str(". ");
            }
            message.push_str(&report.message);
        }
        if report.reasons.is_empty() {
            details.push(Detail {
                message: report.message.clone(),
                path: report.path.to_vec(),
                code: report.code.to_string(),
                context: report.context.clone(),
            });
        } else if let Some(custom) = collect(&report.reasons, false, message, details) {
            return Some(custom);
        }
    }
    None
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ValidationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.custom
            .as_deref()
            .map(|custom| custom as &(dyn StdError + 'static))
    }
}

// ============================================================================
// ASSERTION ERROR
// ============================================================================

/// Why [`assert`](crate::assert) or [`attempt`](crate::attempt) rejected a
/// value.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum AssertError {
    /// The schema literal did not compile.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The value failed validation. The message is the annotated input,
    /// preceded by the caller's prefix when one was given.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The caller's replacement error.
    #[error(transparent)]
    Custom(Arc<dyn StdError + Send + Sync>),
}

impl AssertError {
    /// The validation error, unless compilation failed or the caller
    /// replaced it.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Invalid(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn leaf(code: &'static str, message: &str, key: &str) -> Report {
        Report {
            code: Cow::Borrowed(code),
            message: message.to_owned(),
            path: smallvec![PathSegment::from(key)],
            context: Context::new(),
            reasons: Vec::new(),
            replacement: None,
        }
    }

    #[test]
    fn invalid_content_message() {
        let root = SchemaError::InvalidContent { path: None };
        assert_eq!(root.to_string(), "Invalid schema content");
        let nested = root.within("b").within("a");
        assert_eq!(nested.to_string(), "Invalid schema content: (a.b)");
        assert_eq!(nested.code(), "SCHEMA_INVALID_CONTENT");
    }

    #[test]
    fn details_are_leaves_and_message_joins_top_level() {
        let child = leaf("number.base", "\"a\" must be a number", "a");
        let parent = Report {
            code: Cow::Borrowed("object.child"),
            message: "child \"a\" fails because [\"a\" must be a number]".to_owned(),
            path: smallvec![PathSegment::from("a")],
            context: Context::new(),
            reasons: vec![child],
            replacement: None,
        };
        let other = leaf("any.required", "\"b\" is required", "b");

        let err = ValidationError::from_reports(&[parent, other], None);
        assert_eq!(
            err.message(),
            "child \"a\" fails because [\"a\" must be a number]. \"b\" is required"
        );
        let codes: Vec<_> = err.details().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, ["number.base", "any.required"]);
    }

    #[test]
    fn replacement_wins() {
        #[derive(Debug, thiserror::Error)]
        #[error("custom failure")]
        struct Custom;

        let report = Report::replaced(Arc::new(Custom), Path::new());
        let err = ValidationError::from_reports(&[report], None);
        assert!(err.is_custom());
        assert_eq!(err.to_string(), "custom failure");
        assert!(err.details().is_empty());
        assert!(StdError::source(&err).is_some());
    }
}
