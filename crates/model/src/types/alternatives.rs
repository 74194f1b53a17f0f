//! The `alternatives` type.
//!
//! An alternatives node holds an ordered list of matches:
//!
//! - a plain candidate (`try_`): the first candidate the value satisfies wins,
//!   and when none does the errors of every candidate are reported
//! - a conditional (`when`): a guard picks `then` or `otherwise`, and the
//!   picked branch decides alone
//!
//! Calling [`SchemaBuilder::when`] on a typed schema builds a conditional
//! whose branches are merged into that schema, which stays the fallback when
//! the chosen branch is absent.

use crate::foundation::state::State;
use crate::foundation::{Presence, Ref, Report, SchemaError};
use crate::schema::rule::{NodeContext, context};
use crate::schema::{
    AlternativeDescription, Condition, Description, Evaluate, Inner, Schema, SchemaBuilder, SchemaLike, When,
    compile, describe, evaluate, try_map, typed_schema,
};
use crate::value::Value;

typed_schema!(
    /// Values accepted by one of several schemas.
    ///
    /// ```rust,ignore
    /// let id = alternatives().try_([number().into(), string().guid().into()])?;
    /// let port = number().when("secure", When::new().is(true).then(number().valid([443])))?;
    /// ```
    AlternativesSchema,
    "alternatives"
);

// ============================================================================
// INNER STATE
// ============================================================================

#[derive(Debug, Clone)]
enum Guard {
    /// The referenced value must match `is`.
    Ref { reference: Ref, is: Schema },
    /// The value itself must match.
    Peek(Schema),
}

#[derive(Debug, Clone)]
struct Conditional {
    guard: Guard,
    then: Option<Schema>,
    otherwise: Option<Schema>,
}

#[derive(Debug, Clone)]
enum Match {
    Try(Schema),
    When(Conditional),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AlternativesInner {
    matches: Vec<Match>,
    /// The schema `when` was called on.
    base: Option<Schema>,
}

impl AlternativesInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        self.matches.extend(other.matches.iter().cloned());
        if other.base.is_some() {
            self.base.clone_from(&other.base);
        }
    }
}

impl Conditional {
    /// The branch the guard selects, or `None` when that branch is unset.
    fn select(&self, value: Option<&Value>, cx: &NodeContext<'_>) -> Option<&Schema> {
        let state = State::detached(cx.state.parent);
        let holds = match &self.guard {
            Guard::Ref { reference, is } => {
                let target = cx.resolve_with(reference, value);
                evaluate(is, target, &state, cx.options).is_ok()
            }
            Guard::Peek(peek) => evaluate(peek, value.cloned(), &state, cx.options).is_ok(),
        };
        if holds { self.then.as_ref() } else { self.otherwise.as_ref() }
    }
}

impl Evaluate for AlternativesInner {
    fn check_base(&self, _value: &Value, _cx: &NodeContext<'_>) -> bool {
        true
    }

    fn base_code(&self, _cx: &NodeContext<'_>) -> &'static str {
        "alternatives.base"
    }

    fn children(&self, value: Option<Value>, cx: &NodeContext<'_>, errors: &mut Vec<Report>) -> Option<Value> {
        let last = self.matches.len().saturating_sub(1);
        let mut failures = Vec::new();

        for (index, candidate) in self.matches.iter().enumerate() {
            let chosen = match candidate {
                Match::Try(schema) => {
                    let result = evaluate(schema, value.clone(), cx.state, cx.options);
                    if result.is_ok() {
                        return result.kept();
                    }
                    failures.extend(result.errors);
                    continue;
                }
                Match::When(conditional) => match conditional.select(value.as_ref(), cx) {
                    Some(branch) => branch,
                    None if index == last => match &self.base {
                        Some(base) => base,
                        None => continue,
                    },
                    None => continue,
                },
            };
            let result = evaluate(chosen, value, cx.state, cx.options);
            errors.extend(result.errors.iter().cloned());
            return if result.is_ok() { result.kept() } else { result.value };
        }

        if failures.is_empty() {
            errors.push(cx.error("alternatives.base", context!()));
        } else {
            errors.extend(failures);
        }
        value
    }

    fn describe(&self, description: &mut Description) {
        let boxed = |schema: &Schema| Box::new(describe(schema));
        description.alternatives = self
            .matches
            .iter()
            .map(|candidate| match candidate {
                Match::Try(schema) => AlternativeDescription::Schema(boxed(schema)),
                Match::When(conditional) => {
                    let (reference, peek, is) = match &conditional.guard {
                        Guard::Ref { reference, is } => (Some(reference.to_string()), None, Some(boxed(is))),
                        Guard::Peek(peek) => (None, Some(boxed(peek)), None),
                    };
                    AlternativeDescription::When {
                        reference,
                        peek,
                        is,
                        then: conditional.then.as_ref().map(boxed),
                        otherwise: conditional.otherwise.as_ref().map(boxed),
                    }
                }
            })
            .collect();
        description.base = self.base.as_ref().map(boxed);
    }
}

// ============================================================================
// BUILDER
// ============================================================================

fn inner(node: &mut crate::schema::Node) -> Result<&mut AlternativesInner, SchemaError> {
    match &mut node.inner {
        Inner::Alternatives(inner) => Ok(inner),
        _ => Err(SchemaError::invalid_argument("alternatives", "not an alternatives schema")),
    }
}

impl AlternativesSchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Alternatives(AlternativesInner::default())))
    }

    /// Adds candidates, tried in order. Values that are not schemas are
    /// compiled.
    pub fn try_<I>(self, candidates: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<SchemaLike>,
    {
        let model = self.0.model();
        let compiled = candidates
            .into_iter()
            .enumerate()
            .map(|(index, like)| compile(&model, like.into()).map_err(|err| err.within(&index.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        if compiled.is_empty() {
            return Err(SchemaError::invalid_argument("try", "cannot add an empty list of alternatives"));
        }
        try_map(self, |node| {
            inner(node)?.matches.extend(compiled.into_iter().map(Match::Try));
            Ok(())
        })
    }
}

/// `schema.when(condition, branches)` for any schema.
pub(crate) fn when(schema: Schema, condition: Condition, when: When) -> Result<AlternativesSchema, SchemaError> {
    if schema.kind() == "alternatives" {
        return append_when(schema, condition, when).map(AlternativesSchema);
    }
    let node = AlternativesSchema::new()
        .0
        .map(|node| {
            node.model.clone_from(&schema.0.model);
            node.flags.presence = Some(Presence::Ignore);
            if let Inner::Alternatives(inner) = &mut node.inner {
                inner.base = Some(schema.clone());
            }
        });
    append_when(node, condition, when).map(AlternativesSchema)
}

fn append_when(schema: Schema, condition: Condition, when: When) -> Result<Schema, SchemaError> {
    if when.then.is_none() && when.otherwise.is_none() {
        return Err(SchemaError::invalid_argument(
            "when",
            "options must have at least one of \"then\" or \"otherwise\"",
        ));
    }

    let model = schema.model();
    let base = match &schema.0.inner {
        Inner::Alternatives(inner) => inner.base.clone(),
        _ => None,
    };
    let branch = |like: Option<SchemaLike>| -> Result<Option<Schema>, SchemaError> {
        let Some(like) = like else {
            return Ok(None);
        };
        let compiled = compile(&model, like)?;
        match &base {
            Some(base) => base.clone().merge(&compiled).map(Some),
            None => Ok(Some(compiled)),
        }
    };
    let then = branch(when.then)?;
    let otherwise = branch(when.otherwise)?;

    let (guard, refs) = match condition {
        Condition::Peek(peek) => {
            if when.is.is_some() {
                return Err(SchemaError::invalid_argument("when", "\"is\" can not be used with a schema condition"));
            }
            let refs = peek.0.refs.clone();
            (Guard::Peek(peek), refs)
        }
        Condition::Ref(reference) => {
            let is = match when.is {
                None => crate::types::AnySchema::new()
                    .invalid([Value::Null, Value::Bool(false), Value::from(0), Value::from("")])
                    .required()
                    .into_schema(),
                Some(like) if like.is_literal() => compile(&model, like)?.required(),
                Some(like) => compile(&model, like)?,
            };
            let mut refs = vec![reference.clone()];
            refs.extend(is.0.refs.iter().cloned());
            (Guard::Ref { reference, is }, refs)
        }
    };

    let conditional = Conditional {
        guard,
        then,
        otherwise,
    };
    try_map(schema, |node| {
        for reference in &refs {
            node.add_ref(reference);
        }
        inner(node)?.matches.push(Match::When(conditional));
        Ok(())
    })
}

impl AlternativesSchema {
    /// The schema a `when` was called on, if any.
    pub fn base(&self) -> Option<&Schema> {
        match &self.0.0.inner {
            Inner::Alternatives(inner) => inner.base.as_ref(),
            _ => None,
        }
    }
}
