//! Message templates
//!
//! Every failure code (`number.max`, `object.child`, ...) maps to a template
//! such as `must be less than or equal to {{limit}}`. Rendering fills
//! `{{name}}` placeholders from the report context and prefixes the result
//! with the key template (`"{{!label}}" `) unless the template starts with
//! `!!` or mentions the label itself.
//!
//! A [`Language`] overrides any subset of the built-in table. It loads from
//! the nested form (`{"number": {"max": "..."}}`) or the flat dotted form
//! (`{"number.max": "..."}`).

use std::sync::LazyLock;

use chrono::SecondsFormat;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::error::Context;
use crate::value::{Value, format_number};

const DEFAULT_ROOT: &str = "value";
const DEFAULT_KEY: &str = "\"{{!label}}\" ";
const WRAP_ARRAYS: &str = "messages.wrapArrays";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(!?)([^}]+)\}\}").expect("hardcoded placeholder pattern is valid"));

/// Message template overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct Language {
    entries: IndexMap<String, String>,
    wrap_arrays: Option<bool>,
}

impl Language {
    /// No overrides: the built-in table applies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the template of `code`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_message(mut self, code: impl Into<String>, template: impl Into<String>) -> Self {
        self.entries.insert(code.into(), template.into());
        self
    }

    /// Overrides the label used for the root value (default `value`).
    #[must_use = "builder methods must be chained or built"]
    pub fn with_root(self, root: impl Into<String>) -> Self {
        self.with_message("root", root)
    }

    /// Overrides the key prefix template (default `"{{!label}}" `).
    #[must_use = "builder methods must be chained or built"]
    pub fn with_key(self, key: impl Into<String>) -> Self {
        self.with_message("key", key)
    }

    /// Whether arrays render wrapped in brackets (default `true`).
    #[must_use = "builder methods must be chained or built"]
    pub const fn with_wrap_arrays(mut self, wrap: bool) -> Self {
        self.wrap_arrays = Some(wrap);
        self
    }

    /// The override for `code`, if any.
    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// `true` when nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.wrap_arrays.is_none()
    }

    /// Layers `other` on top of `self`, entry by entry.
    pub fn merge(&mut self, other: &Self) {
        for (code, template) in &other.entries {
            self.entries.insert(code.clone(), template.clone());
        }
        if other.wrap_arrays.is_some() {
            self.wrap_arrays = other.wrap_arrays;
        }
    }

    /// The label given to the root value.
    pub(crate) fn root(&self) -> &str {
        self.get("root").unwrap_or(DEFAULT_ROOT)
    }

    fn template(&self, code: &str) -> Option<&str> {
        self.get(code).or_else(|| default_template(code))
    }

    /// Renders the message for `code` from `context`.
    pub(crate) fn render(&self, code: &str, context: &Context, escape_html: bool) -> String {
        let Some(template) = self.template(code) else {
            return format!(
                "Error code \"{code}\" is not defined, your custom type is missing the correct language definition"
            );
        };

        let has_label = template.contains("{{label}}") || template.contains("{{!label}}");
        let (template, skip_key) = match template.strip_prefix("!!") {
            Some(rest) => (rest, true),
            None => (template, false),
        };

        let mut format = String::new();
        if !has_label && !skip_key {
            format.push_str(self.get("key").unwrap_or(DEFAULT_KEY));
        }
        format.push_str(template);

        let wrap = self.wrap_arrays.unwrap_or(true);
        PLACEHOLDER
            .replace_all(&format, |caps: &Captures<'_>| {
                let secure = !caps[1].is_empty();
                let rendered = lookup(context, &caps[2]).map_or_else(|| "undefined".to_owned(), |v| stringify(v, wrap));
                if secure && escape_html {
                    self::escape_html(&rendered)
                } else {
                    rendered
                }
            })
            .into_owned()
    }
}

fn lookup<'a>(context: &'a Context, name: &str) -> Option<&'a Value> {
    let mut segments = name.split('.');
    let first = context.get(segments.next()?)?;
    let rest: Vec<&str> = segments.collect();
    first.reach(rest.as_slice())
}

/// Renders a context value the way messages show it.
pub(crate) fn stringify(value: &Value, wrap_arrays: bool) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        Value::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
        Value::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Function(f) => f.to_string(),
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|item| stringify(item, wrap_arrays))
                .collect::<Vec<_>>()
                .join(", ");
            if wrap_arrays {
                format!("[{joined}]")
            } else {
                joined
            }
        }
        Value::Object(_) => value.to_string(),
    }
}

/// Escapes everything outside `[A-Za-z0-9 ,.\-:_]` as an HTML entity.
pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '.' | ',' | '-' | ':' | '_') {
            out.push(ch);
            continue;
        }
        let code = u32::from(ch);
        match code {
            38 => out.push_str("&amp;"),
            60 => out.push_str("&lt;"),
            62 => out.push_str("&gt;"),
            34 => out.push_str("&quot;"),
            160 => out.push_str("&nbsp;"),
            162 => out.push_str("&cent;"),
            163 => out.push_str("&pound;"),
            164 => out.push_str("&curren;"),
            169 => out.push_str("&copy;"),
            174 => out.push_str("&reg;"),
            c if c >= 256 => out.push_str(&format!("&#{c};")),
            c => out.push_str(&format!("&#x{c:02x};")),
        }
    }
    out
}

// ============================================================================
// SERDE
// ============================================================================

impl TryFrom<serde_json::Value> for Language {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        fn flatten(prefix: &str, value: serde_json::Value, language: &mut Language) -> Result<(), String> {
            let serde_json::Value::Object(entries) = value else {
                return Err(format!("language entry `{prefix}` must be an object or a string"));
            };
            for (key, value) in entries {
                let code = if prefix.is_empty() { key } else { format!("{prefix}.{key}") };
                match value {
                    serde_json::Value::String(template) => {
                        language.entries.insert(code, template);
                    }
                    serde_json::Value::Bool(wrap) if code == WRAP_ARRAYS => {
                        language.wrap_arrays = Some(wrap);
                    }
                    nested @ serde_json::Value::Object(_) => flatten(&code, nested, language)?,
                    _ => return Err(format!("language entry `{code}` must be a string")),
                }
            }
            Ok(())
        }

        let mut language = Self::default();
        flatten("", value, &mut language)?;
        Ok(language)
    }
}

impl From<Language> for serde_json::Value {
    fn from(language: Language) -> Self {
        let mut map: serde_json::Map<String, Self> = language
            .entries
            .into_iter()
            .map(|(code, template)| (code, Self::String(template)))
            .collect();
        if let Some(wrap) = language.wrap_arrays {
            map.insert(WRAP_ARRAYS.to_owned(), Self::Bool(wrap));
        }
        Self::Object(map)
    }
}

// ============================================================================
// DEFAULT TABLE
// ============================================================================

/// Built-in template for `code`.
#[allow(clippy::too_many_lines)]
pub(crate) fn default_template(code: &str) -> Option<&'static str> {
    Some(match code {
        "any.unknown" => "is not allowed",
        "any.invalid" => "contains an invalid value",
        "any.empty" => "is not allowed to be empty",
        "any.required" => "is required",
        "any.allowOnly" => "must be one of {{valids}}",
        "any.default" => "threw an error when running default method",

        "alternatives.base" => "not matching any of the allowed alternatives",

        "array.base" => "must be an array",
        "array.includes" => "at position {{pos}} does not match any of the allowed types",
        "array.includesSingle" => "single value of \"{{!label}}\" does not match any of the allowed types",
        "array.includesOne" => "at position {{pos}} fails because {{reason}}",
        "array.includesOneSingle" => "single value of \"{{!label}}\" fails because {{reason}}",
        "array.includesRequiredUnknowns" => "does not contain {{unknownMisses}} required value(s)",
        "array.includesRequiredKnowns" => "does not contain {{knownMisses}}",
        "array.includesRequiredBoth" => {
            "does not contain {{knownMisses}} and {{unknownMisses}} other required value(s)"
        }
        "array.excludes" => "at position {{pos}} contains an excluded value",
        "array.excludesSingle" => "single value of \"{{!label}}\" contains an excluded value",
        "array.min" => "must contain at least {{limit}} items",
        "array.max" => "must contain less than or equal to {{limit}} items",
        "array.length" => "must contain {{limit}} items",
        "array.ordered" => "at position {{pos}} fails because {{reason}}",
        "array.orderedLength" => "at position {{pos}} fails because array must contain at most {{limit}} items",
        "array.ref" => "references \"{{ref}}\" which is not a positive integer",
        "array.sparse" => "must not be a sparse array",
        "array.unique" => "position {{pos}} contains a duplicate value",

        "boolean.base" => "must be a boolean",

        "binary.base" => "must be a buffer or a string",
        "binary.min" => "must be at least {{limit}} bytes",
        "binary.max" => "must be less than or equal to {{limit}} bytes",
        "binary.length" => "must be {{limit}} bytes",
        "binary.ref" => "references \"{{ref}}\" which is not a positive integer",

        "date.base" => "must be a number of milliseconds or valid date string",
        "date.strict" => "must be a valid date",
        "date.min" => "must be larger than or equal to \"{{limit}}\"",
        "date.max" => "must be less than or equal to \"{{limit}}\"",
        "date.isoDate" => "must be a valid ISO 8601 date",
        "date.timestamp.javascript" => "must be a valid timestamp or number of milliseconds",
        "date.timestamp.unix" => "must be a valid timestamp or number of seconds",
        "date.ref" => "references \"{{ref}}\" which is not a date",

        "function.base" => "must be a Function",
        "function.arity" => "must have an arity of {{n}}",
        "function.minArity" => "must have an arity greater or equal to {{n}}",
        "function.maxArity" => "must have an arity lesser or equal to {{n}}",

        "lazy.base" => "!!schema error: lazy schema must be set",
        "lazy.schema" => "!!schema error: lazy schema function must return a schema",

        "object.base" => "must be an object",
        "object.child" => "!!child \"{{!child}}\" fails because {{reason}}",
        "object.min" => "must have at least {{limit}} children",
        "object.max" => "must have less than or equal to {{limit}} children",
        "object.length" => "must have {{limit}} children",
        "object.allowUnknown" => "!!\"{{!child}}\" is not allowed",
        "object.with" => "!!\"{{mainWithLabel}}\" missing required peer \"{{peerWithLabel}}\"",
        "object.without" => "!!\"{{mainWithLabel}}\" conflict with forbidden peer \"{{peerWithLabel}}\"",
        "object.missing" | "object.or" => "must contain at least one of {{peersWithLabels}}",
        "object.xor" => "contains a conflict between exclusive peers {{peersWithLabels}}",
        "object.and" => "contains {{presentWithLabels}} without its required peers {{missingWithLabels}}",
        "object.nand" => "!!\"{{mainWithLabel}}\" must not exist simultaneously with {{peersWithLabels}}",
        "object.assert" => "!!\"{{ref}}\" validation failed because \"{{ref}}\" failed to {{message}}",
        "object.rename.multiple" => {
            "cannot rename child \"{{from}}\" because multiple renames are disabled and another key was already renamed to \"{{to}}\""
        }
        "object.rename.override" => {
            "cannot rename child \"{{from}}\" because override is disabled and target \"{{to}}\" exists"
        }
        "object.rename.regex.multiple" => {
            "cannot rename children {{from}} because multiple renames are disabled and another key was already renamed to \"{{to}}\""
        }
        "object.rename.regex.override" => {
            "cannot rename children {{from}} because override is disabled and target \"{{to}}\" exists"
        }

        "number.base" => "must be a number",
        "number.min" => "must be larger than or equal to {{limit}}",
        "number.max" => "must be less than or equal to {{limit}}",
        "number.less" => "must be less than {{limit}}",
        "number.greater" => "must be greater than {{limit}}",
        "number.integer" => "must be an integer",
        "number.negative" => "must be a negative number",
        "number.positive" => "must be a positive number",
        "number.precision" => "must have no more than {{limit}} decimal places",
        "number.ref" => "references \"{{ref}}\" which is not a number",
        "number.multiple" => "must be a multiple of {{multiple}}",
        "number.port" => "must be a valid port",

        "string.base" => "must be a string",
        "string.min" => "length must be at least {{limit}} characters long",
        "string.max" => "length must be less than or equal to {{limit}} characters long",
        "string.length" => "length must be {{limit}} characters long",
        "string.alphanum" => "must only contain alpha-numeric characters",
        "string.token" => "must only contain alpha-numeric and underscore characters",
        "string.regex.base" => "with value \"{{!value}}\" fails to match the required pattern: {{pattern}}",
        "string.regex.name" => "with value \"{{!value}}\" fails to match the {{name}} pattern",
        "string.regex.invert.base" => "with value \"{{!value}}\" matches the inverted pattern: {{pattern}}",
        "string.regex.invert.name" => "with value \"{{!value}}\" matches the inverted {{name}} pattern",
        "string.email" => "must be a valid email",
        "string.uri" => "must be a valid uri",
        "string.isoDate" => "must be a valid ISO 8601 date",
        "string.guid" => "must be a valid GUID",
        "string.hex" => "must only contain hexadecimal characters",
        "string.base64" => "must be a valid base64 string",
        "string.hostname" => "must be a valid hostname",
        "string.lowercase" => "must only contain lowercase characters",
        "string.uppercase" => "must only contain uppercase characters",
        "string.trim" => "must not have leading or trailing whitespace",
        "string.creditCard" => "must be a credit card",
        "string.ref" => "references \"{{ref}}\" which is not a number",

        _ => return None,
    })
}
