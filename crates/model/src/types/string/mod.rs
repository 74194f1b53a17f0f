//! The `string` type.
//!
//! The empty string is invalid unless explicitly allowed. In convert mode the
//! value is normalized before the base check, in this order: case, trim,
//! replacements, truncation. The matching rules (`lowercase`, `trim`, ...)
//! then only fail in strict mode.

pub(crate) mod formats;

use std::borrow::Cow;

use regex::Regex;

use super::{Bound, predicate_rule, push_size_rule};
use crate::foundation::Ref;
use crate::schema::rule::{Limit, NodeContext, Rule, context};
use crate::schema::{Description, Evaluate, Inner, Schema, SchemaBuilder, map, typed_schema};
use crate::value::Value;

typed_schema!(
    /// Strings.
    ///
    /// ```rust,ignore
    /// let username = string().alphanum().min(3).max(30).required();
    /// let email = string().email().lowercase();
    /// ```
    StringSchema,
    "string"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Case {
    Lower,
    Upper,
}

/// How a pattern is applied and reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Reported in messages instead of the pattern source.
    pub name: Option<String>,
    /// Fail when the pattern matches instead of when it does not.
    pub invert: bool,
}

impl PatternOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            invert: false,
        }
    }

    #[must_use]
    pub const fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StringInner {
    case: Option<Case>,
    trim: bool,
    truncate: bool,
    replacements: Vec<(Regex, String)>,
    max: Option<Limit<usize>>,
}

impl StringInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        if other.case.is_some() {
            self.case = other.case;
        }
        self.trim |= other.trim;
        self.truncate |= other.truncate;
        self.replacements.extend(other.replacements.iter().cloned());
        if other.max.is_some() {
            self.max.clone_from(&other.max);
        }
    }
}

impl Evaluate for StringInner {
    fn coerce(&self, value: &Value, cx: &NodeContext<'_>) -> Option<Value> {
        let input = value.as_str()?;
        let mut out = Cow::Borrowed(input);

        match self.case {
            Some(Case::Lower) => out = Cow::Owned(out.to_lowercase()),
            Some(Case::Upper) => out = Cow::Owned(out.to_uppercase()),
            None => {}
        }
        if self.trim && out.trim() != out {
            out = Cow::Owned(out.trim().to_owned());
        }
        for (pattern, replacement) in &self.replacements {
            let replaced = match pattern.replace_all(&out, replacement.as_str()) {
                Cow::Owned(replaced) => Some(replaced),
                Cow::Borrowed(_) => None,
            };
            if let Some(replaced) = replaced {
                out = Cow::Owned(replaced);
            }
        }
        if self.truncate
            && let Some(limit) = self.max.as_ref().and_then(|max| max.resolve(cx, "string").ok())
            && out.chars().count() > limit
        {
            out = Cow::Owned(out.chars().take(limit).collect());
        }

        (out != input).then(|| Value::String(out.into_owned()))
    }

    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        value.is_string()
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "string.base"
    }

    fn describe(&self, description: &mut Description) {
        if self.truncate {
            description.flag("truncate", true);
        }
    }
}

fn inner(node: &mut crate::schema::Node) -> Option<&mut StringInner> {
    match &mut node.inner {
        Inner::String(inner) => Some(inner),
        _ => None,
    }
}

fn format_rule(
    schema: StringSchema,
    name: &'static str,
    code: &'static str,
    test: fn(&str) -> bool,
) -> StringSchema {
    let rule = predicate_rule(name, code, None, move |value, _| value.as_str().is_some_and(test));
    map(schema, |node| node.push_rule(rule))
}

impl StringSchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::String(StringInner::default()))).invalid([""])
    }

    /// Allowed and denied values compare case-insensitively.
    pub fn insensitive(self) -> Self {
        if self.0.0.flags.insensitive {
            return self;
        }
        map(self, |node| node.flags.insensitive = true)
    }

    // ------------------------------------------------------------------------
    // Length
    // ------------------------------------------------------------------------

    /// At least `limit` characters.
    pub fn min(self, limit: usize) -> Self {
        map(self, |node| push_size_rule(node, "string", Bound::Min, Limit::Value(limit)))
    }

    pub fn min_ref(self, reference: impl Into<Ref>) -> Self {
        let limit = Limit::Ref(reference.into());
        map(self, |node| push_size_rule(node, "string", Bound::Min, limit))
    }

    /// At most `limit` characters. Also the length [`truncate`](Self::truncate)
    /// cuts to.
    pub fn max(self, limit: usize) -> Self {
        self.max_limit(Limit::Value(limit))
    }

    pub fn max_ref(self, reference: impl Into<Ref>) -> Self {
        self.max_limit(Limit::Ref(reference.into()))
    }

    fn max_limit(self, limit: Limit<usize>) -> Self {
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.max = Some(limit.clone());
            }
            push_size_rule(node, "string", Bound::Max, limit);
        })
    }

    /// Exactly `limit` characters.
    pub fn length(self, limit: usize) -> Self {
        map(self, |node| push_size_rule(node, "string", Bound::Length, Limit::Value(limit)))
    }

    pub fn length_ref(self, reference: impl Into<Ref>) -> Self {
        let limit = Limit::Ref(reference.into());
        map(self, |node| push_size_rule(node, "string", Bound::Length, limit))
    }

    // ------------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------------

    /// Must match `pattern`.
    pub fn regex(self, pattern: Regex) -> Self {
        self.regex_with(pattern, PatternOptions::default())
    }

    /// Alias of [`regex`](Self::regex).
    pub fn pattern(self, pattern: Regex) -> Self {
        self.regex(pattern)
    }

    /// Must match `pattern`, or must not when `options.invert`.
    pub fn regex_with(self, pattern: Regex, options: PatternOptions) -> Self {
        let source = pattern.as_str().to_owned();
        let code = match (options.invert, options.name.is_some()) {
            (false, false) => "string.regex.base",
            (false, true) => "string.regex.name",
            (true, false) => "string.regex.invert.base",
            (true, true) => "string.regex.invert.name",
        };
        let name = options.name.clone();
        let invert = options.invert;
        let rule = Rule::test("regex", Some(Value::from(source.as_str())), move |value, cx| {
            let text = value.as_str().unwrap_or_default();
            if pattern.is_match(text) != invert {
                return Ok(());
            }
            let mut context = context!("value" => text, "pattern" => source.as_str());
            if let Some(name) = &name {
                context.insert("name".to_owned(), Value::from(name.as_str()));
            }
            Err(cx.error(code, context))
        });
        map(self, |node| node.push_rule(rule))
    }

    pub fn alphanum(self) -> Self {
        format_rule(self, "alphanum", "string.alphanum", formats::is_alphanum)
    }

    /// Letters, digits and underscores.
    pub fn token(self) -> Self {
        format_rule(self, "token", "string.token", formats::is_token)
    }

    pub fn email(self) -> Self {
        format_rule(self, "email", "string.email", formats::is_email)
    }

    /// An absolute URI.
    pub fn uri(self) -> Self {
        format_rule(self, "uri", "string.uri", formats::is_uri)
    }

    pub fn guid(self) -> Self {
        format_rule(self, "guid", "string.guid", formats::is_guid)
    }

    pub fn hex(self) -> Self {
        format_rule(self, "hex", "string.hex", formats::is_hex)
    }

    pub fn base64(self) -> Self {
        format_rule(self, "base64", "string.base64", formats::is_base64)
    }

    /// A hostname or an IP address.
    pub fn hostname(self) -> Self {
        format_rule(self, "hostname", "string.hostname", formats::is_hostname)
    }

    pub fn iso_date(self) -> Self {
        format_rule(self, "isoDate", "string.isoDate", |s| formats::parse_iso_date(s).is_some())
    }

    /// Digits passing the Luhn check.
    pub fn credit_card(self) -> Self {
        format_rule(self, "creditCard", "string.creditCard", formats::is_credit_card)
    }

    // ------------------------------------------------------------------------
    // Normalization
    // ------------------------------------------------------------------------

    /// Lowercases when converting; rejects uppercase characters otherwise.
    pub fn lowercase(self) -> Self {
        let rule = predicate_rule("lowercase", "string.lowercase", None, |value, _| {
            value.as_str().is_some_and(|s| s.to_lowercase() == s)
        });
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.case = Some(Case::Lower);
            }
            node.push_rule(rule);
        })
    }

    /// Uppercases when converting; rejects lowercase characters otherwise.
    pub fn uppercase(self) -> Self {
        let rule = predicate_rule("uppercase", "string.uppercase", None, |value, _| {
            value.as_str().is_some_and(|s| s.to_uppercase() == s)
        });
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.case = Some(Case::Upper);
            }
            node.push_rule(rule);
        })
    }

    /// Trims when converting; rejects surrounding whitespace otherwise.
    pub fn trim(self) -> Self {
        let rule = predicate_rule("trim", "string.trim", None, |value, _| {
            value.as_str().is_some_and(|s| s.trim() == s)
        });
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.trim = true;
            }
            node.push_rule(rule);
        })
    }

    /// Replaces every match of `pattern` when converting.
    pub fn replace(self, pattern: Regex, replacement: impl Into<String>) -> Self {
        let replacement = replacement.into();
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.replacements.push((pattern, replacement));
            }
        })
    }

    /// Cuts values longer than the `max` limit when converting.
    pub fn truncate(self, enabled: bool) -> Self {
        if matches!(&self.0.0.inner, Inner::String(inner) if inner.truncate == enabled) {
            return self;
        }
        map(self, |node| {
            if let Some(inner) = inner(node) {
                inner.truncate = enabled;
            }
        })
    }
}
