//! Plain-data descriptions of schemas.
//!
//! [`Description`] mirrors a node: its type, flags, options, metadata,
//! allowed and denied values, rules and type-specific parts (children,
//! items, alternatives, ...). Empty parts are left out when serialized, so
//! the JSON form stays close to what a hand-written definition would say.

use indexmap::IndexMap;
use serde::Serialize;

use super::Schema;
use super::flags::Flags;
use crate::foundation::{Presence, Settings};
use crate::value::Value;

/// A schema as plain data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub flags: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Settings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valids: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalids: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<IndexMap<String, Description>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<PatternDescription>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub renames: Vec<RenameDescription>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyDescription>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Description>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ordereds: Vec<Description>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<AlternativeDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Box<Description>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty: Option<Box<Description>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub truthy: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub falsy: Vec<Value>,
}

impl Description {
    /// Sets a flag entry.
    pub fn flag(&mut self, name: &str, value: impl Into<Value>) {
        self.flags.insert(name.to_owned(), value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDescription {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternDescription {
    /// The key regex, when keys are matched by pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// The key schema, when keys are matched by schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Box<Description>>,
    pub rule: Box<Description>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameDescription {
    pub from: String,
    pub to: String,
    pub is_regex: bool,
    pub options: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyDescription {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub peers: Vec<String>,
}

/// One entry of an alternatives list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlternativeDescription {
    /// A candidate schema.
    Schema(Box<Description>),
    /// A conditional branch.
    When {
        #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        peek: Option<Box<Description>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is: Option<Box<Description>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        then: Option<Box<Description>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<Description>>,
    },
}

const fn presence_name(presence: Presence) -> &'static str {
    match presence {
        Presence::Optional => "optional",
        Presence::Required => "required",
        Presence::Forbidden => "forbidden",
        Presence::Ignore => "ignore",
    }
}

fn describe_flags(flags: &Flags, description: &mut Description) {
    if let Some(presence) = flags.presence {
        description.flag("presence", presence_name(presence));
    }
    if flags.allow_only {
        description.flag("allowOnly", true);
    }
    if let Some(default) = &flags.default {
        description.flag("default", default.describe());
    }
    if flags.strip {
        description.flag("strip", true);
    }
    if flags.insensitive {
        description.flag("insensitive", true);
    }
    if flags.raw {
        description.flag("raw", true);
    }
    if let Some(allow_unknown) = flags.allow_unknown {
        description.flag("allowUnknown", allow_unknown);
    }
    if flags.single {
        description.flag("single", true);
    }
    if let Some(error) = &flags.error {
        description.flag("error", error.describe());
    }
}

/// Describes `schema` and everything below it.
pub(crate) fn describe(schema: &Schema) -> Description {
    let node = &*schema.0;
    let mut description = Description {
        type_name: node.type_name.to_string(),
        options: node.settings.clone(),
        label: node.flags.label.clone(),
        description: node.meta.description.clone(),
        notes: node.meta.notes.clone(),
        tags: node.meta.tags.clone(),
        meta: node.meta.meta.clone(),
        examples: node.meta.examples.clone(),
        unit: node.meta.unit.clone(),
        valids: node.valids.describe(),
        invalids: node.invalids.describe(),
        empty: node.flags.empty.as_ref().map(|empty| Box::new(describe(empty))),
        ..Description::default()
    };
    describe_flags(&node.flags, &mut description);

    description.rules = node
        .rules
        .iter()
        .map(|rule| RuleDescription {
            name: rule.name.to_string(),
            arg: rule.arg.clone(),
            description: rule.description.clone(),
        })
        .collect();

    node.inner.evaluator().describe(&mut description);
    node.hooks
        .describe
        .iter()
        .fold(description, |description, hook| hook(description))
}
