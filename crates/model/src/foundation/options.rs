//! Validation options
//!
//! [`ValidationOptions`] is the per-call configuration. [`Settings`] holds the
//! same fields as optional overrides attached to a schema node with
//! `.options(...)`; the nearest node's settings win over the call's options,
//! which win over the defaults.
//!
//! Both types load from JSON configuration:
//!
//! ```rust,ignore
//! let options: ValidationOptions = serde_json::from_value(json!({
//!     "abortEarly": false,
//!     "stripUnknown": { "objects": true },
//!     "context": { "limit": 3 }
//! }))?;
//! ```

use serde::{Deserialize, Serialize};

use super::language::Language;
use crate::value::Value;

/// How a node treats an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Absence is accepted, and a default substituted when one is set.
    #[default]
    Optional,
    /// Absence fails with `any.required`.
    Required,
    /// Presence fails with `any.unknown`; absence is accepted.
    Forbidden,
    /// The node does not judge absence and hands it to the selected branch.
    /// Used by conditional schemas built with `when`.
    Ignore,
}

/// Which unknown entries to drop instead of rejecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StripUnknown {
    /// `true` strips both unknown object keys and unmatched array items.
    All(bool),
    /// Choose per container kind.
    Only {
        #[serde(default)]
        arrays: bool,
        #[serde(default)]
        objects: bool,
    },
}

impl StripUnknown {
    /// Whether unknown object keys are removed.
    pub const fn objects(self) -> bool {
        match self {
            Self::All(all) => all,
            Self::Only { objects, .. } => objects,
        }
    }

    /// Whether array items matching no item schema are removed.
    pub const fn arrays(self) -> bool {
        match self {
            Self::All(all) => all,
            Self::Only { arrays, .. } => arrays,
        }
    }

    /// Whether anything is stripped at all.
    pub const fn any(self) -> bool {
        self.objects() || self.arrays()
    }
}

impl Default for StripUnknown {
    fn default() -> Self {
        Self::All(false)
    }
}

impl From<bool> for StripUnknown {
    fn from(all: bool) -> Self {
        Self::All(all)
    }
}

// ============================================================================
// VALIDATION OPTIONS
// ============================================================================

/// Per-call configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Stop at the first failure (default `true`).
    pub abort_early: bool,
    /// Allow type coercion (default `true`).
    pub convert: bool,
    /// Accept object keys no schema declares.
    pub allow_unknown: bool,
    /// Ignore unknown keys holding functions.
    pub skip_functions: bool,
    /// Remove unknown entries instead of rejecting them.
    pub strip_unknown: StripUnknown,
    /// Presence applied to nodes without an explicit one.
    pub presence: Presence,
    /// Never substitute defaults.
    pub no_defaults: bool,
    /// HTML-escape `{{!name}}` interpolations in messages.
    pub escape_html: bool,
    /// Target of `$`-prefixed references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Message template overrides.
    pub language: Language,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            abort_early: true,
            convert: true,
            allow_unknown: false,
            skip_functions: false,
            strip_unknown: StripUnknown::default(),
            presence: Presence::Optional,
            no_defaults: false,
            escape_html: false,
            context: None,
            language: Language::default(),
        }
    }
}

impl ValidationOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `abort_early`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = abort_early;
        self
    }

    /// Sets `convert`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    /// Sets `allow_unknown`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_allow_unknown(mut self, allow_unknown: bool) -> Self {
        self.allow_unknown = allow_unknown;
        self
    }

    /// Sets `strip_unknown`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_strip_unknown(mut self, strip_unknown: impl Into<StripUnknown>) -> Self {
        self.strip_unknown = strip_unknown.into();
        self
    }

    /// Sets `presence`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    /// Sets `no_defaults`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_no_defaults(mut self, no_defaults: bool) -> Self {
        self.no_defaults = no_defaults;
        self
    }

    /// Sets the reference context.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets message overrides.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Applies node-level overrides.
    pub(crate) fn merged(&self, settings: &Settings) -> Self {
        let mut merged = self.clone();
        if let Some(v) = settings.abort_early {
            merged.abort_early = v;
        }
        if let Some(v) = settings.convert {
            merged.convert = v;
        }
        if let Some(v) = settings.allow_unknown {
            merged.allow_unknown = v;
        }
        if let Some(v) = settings.skip_functions {
            merged.skip_functions = v;
        }
        if let Some(v) = settings.strip_unknown {
            merged.strip_unknown = v;
        }
        if let Some(v) = settings.presence {
            merged.presence = v;
        }
        if let Some(v) = settings.no_defaults {
            merged.no_defaults = v;
        }
        if let Some(v) = settings.escape_html {
            merged.escape_html = v;
        }
        if let Some(v) = &settings.context {
            merged.context = Some(v.clone());
        }
        if let Some(language) = &settings.language {
            merged.language.merge(language);
        }
        merged
    }
}

// ============================================================================
// NODE SETTINGS
// ============================================================================

/// Option overrides scoped to one schema node and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_early: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_unknown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_functions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_unknown: Option<StripUnknown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_defaults: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escape_html: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

impl Settings {
    /// Empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides `abort_early`.
    #[must_use = "builder methods must be chained or built"]
    pub fn abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = Some(abort_early);
        self
    }

    /// Overrides `convert`.
    #[must_use = "builder methods must be chained or built"]
    pub fn convert(mut self, convert: bool) -> Self {
        self.convert = Some(convert);
        self
    }

    /// Overrides `allow_unknown`.
    #[must_use = "builder methods must be chained or built"]
    pub fn allow_unknown(mut self, allow_unknown: bool) -> Self {
        self.allow_unknown = Some(allow_unknown);
        self
    }

    /// Overrides `strip_unknown`.
    #[must_use = "builder methods must be chained or built"]
    pub fn strip_unknown(mut self, strip_unknown: impl Into<StripUnknown>) -> Self {
        self.strip_unknown = Some(strip_unknown.into());
        self
    }

    /// Overrides `presence`.
    #[must_use = "builder methods must be chained or built"]
    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Overrides `no_defaults`.
    #[must_use = "builder methods must be chained or built"]
    pub fn no_defaults(mut self, no_defaults: bool) -> Self {
        self.no_defaults = Some(no_defaults);
        self
    }

    /// Overrides `escape_html`.
    #[must_use = "builder methods must be chained or built"]
    pub fn escape_html(mut self, escape_html: bool) -> Self {
        self.escape_html = Some(escape_html);
        self
    }

    /// Overrides the reference context.
    #[must_use = "builder methods must be chained or built"]
    pub fn context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Overrides message templates.
    #[must_use = "builder methods must be chained or built"]
    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Layers `other` on top of `self`.
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
        take!(
            abort_early,
            convert,
            allow_unknown,
            skip_functions,
            strip_unknown,
            presence,
            no_defaults,
            escape_html,
            context
        );
        if let Some(language) = &other.language {
            self.language
                .get_or_insert_with(Language::default)
                .merge(language);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let options = ValidationOptions::default();
        assert!(options.abort_early);
        assert!(options.convert);
        assert!(!options.allow_unknown);
        assert_eq!(options.presence, Presence::Optional);
    }

    #[test]
    fn deserializes_camel_case() {
        let options: ValidationOptions = serde_json::from_value(json!({
            "abortEarly": false,
            "stripUnknown": { "objects": true },
            "presence": "required",
            "context": { "limit": 3 }
        }))
        .unwrap();

        assert!(!options.abort_early);
        assert!(options.strip_unknown.objects());
        assert!(!options.strip_unknown.arrays());
        assert_eq!(options.presence, Presence::Required);
        assert_eq!(options.context, Some(Value::from(json!({ "limit": 3 }))));
    }

    #[test]
    fn strip_unknown_accepts_bool() {
        let options: ValidationOptions = serde_json::from_value(json!({ "stripUnknown": true })).unwrap();
        assert!(options.strip_unknown.objects() && options.strip_unknown.arrays());
    }

    #[test]
    fn settings_override_call_options() {
        let options = ValidationOptions::default().with_convert(true);
        let settings = Settings::new().convert(false).presence(Presence::Required);
        let merged = options.merged(&settings);
        assert!(!merged.convert);
        assert_eq!(merged.presence, Presence::Required);
        assert!(merged.abort_early);
    }

    #[test]
    fn settings_merge_keeps_unset_fields() {
        let mut base = Settings::new().convert(false);
        base.merge(&Settings::new().abort_early(false));
        assert_eq!(base.convert, Some(false));
        assert_eq!(base.abort_early, Some(false));
    }
}
