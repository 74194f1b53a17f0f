//! The `date` type.
//!
//! In convert mode numbers are read as milliseconds since the epoch (seconds
//! for [`TimestampUnit::Unix`]) and strings as ISO 8601 dates or numeric
//! timestamps. [`DateSchema::iso`] restricts strings to ISO 8601 and
//! [`DateSchema::timestamp`] restricts input to timestamps.

use chrono::{DateTime, Utc};

use super::string::formats::parse_iso_date;
use crate::foundation::Ref;
use crate::schema::rule::{NodeContext, Rule, context};
use crate::schema::{Description, Evaluate, Inner, Schema, map, typed_schema};
use crate::value::Value;

typed_schema!(
    /// Points in time.
    ///
    /// ```rust,ignore
    /// let start = date().iso().min(DateBound::Now);
    /// let end = date().min(Ref::new("start"));
    /// ```
    DateSchema,
    "date"
);

/// What a number counts since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampUnit {
    /// Milliseconds.
    #[default]
    Javascript,
    /// Seconds.
    Unix,
}

impl TimestampUnit {
    const fn name(self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Unix => "unix",
        }
    }

    const fn millis(self) -> f64 {
        match self {
            Self::Javascript => 1.0,
            Self::Unix => 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateFormat {
    Iso,
    Timestamp(TimestampUnit),
}

/// A `min`/`max` limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateBound {
    /// A fixed instant.
    At(DateTime<Utc>),
    /// The time of validation.
    Now,
    /// A referenced date, timestamp or date string.
    Ref(Ref),
}

impl From<DateTime<Utc>> for DateBound {
    fn from(date: DateTime<Utc>) -> Self {
        Self::At(date)
    }
}

impl From<Ref> for DateBound {
    fn from(reference: Ref) -> Self {
        Self::Ref(reference)
    }
}

impl DateBound {
    fn describe(&self) -> Value {
        match self {
            Self::At(date) => Value::Date(*date),
            Self::Now => Value::from("now"),
            Self::Ref(reference) => Value::String(reference.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DateInner {
    format: Option<DateFormat>,
}

impl DateInner {
    pub(crate) fn concat(&mut self, other: &Self) {
        if other.format.is_some() {
            self.format = other.format;
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn from_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms.round() as i64)
}

fn numeric(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Reads `value` as a date the way convert mode does with no format set.
fn to_date(value: &Value, format: Option<DateFormat>) -> Option<DateTime<Utc>> {
    match (value, format) {
        (Value::Date(date), _) => Some(*date),
        (Value::Number(n), None) => from_millis(*n),
        (Value::Number(n), Some(DateFormat::Timestamp(unit))) => from_millis(n * unit.millis()),
        (Value::String(s), None) => numeric(s).map_or_else(|| parse_iso_date(s.trim()), from_millis),
        (Value::String(s), Some(DateFormat::Timestamp(unit))) => numeric(s).and_then(|n| from_millis(n * unit.millis())),
        (Value::String(s), Some(DateFormat::Iso)) => parse_iso_date(s),
        _ => None,
    }
}

impl Evaluate for DateInner {
    fn coerce(&self, value: &Value, _cx: &NodeContext<'_>) -> Option<Value> {
        if matches!(value, Value::Date(_)) {
            return None;
        }
        to_date(value, self.format).map(Value::Date)
    }

    fn check_base(&self, value: &Value, _cx: &NodeContext<'_>) -> bool {
        matches!(value, Value::Date(_))
    }

    fn base_code(&self, cx: &NodeContext<'_>) -> &'static str {
        match self.format {
            Some(DateFormat::Iso) => "date.isoDate",
            Some(DateFormat::Timestamp(TimestampUnit::Javascript)) => "date.timestamp.javascript",
            Some(DateFormat::Timestamp(TimestampUnit::Unix)) => "date.timestamp.unix",
            None if !cx.options().convert => "date.strict",
            None => "date.base",
        }
    }

    fn describe(&self, description: &mut Description) {
        match self.format {
            Some(DateFormat::Iso) => description.flag("format", "iso"),
            Some(DateFormat::Timestamp(unit)) => description.flag("timestamp", unit.name()),
            None => {}
        }
    }
}

impl DateSchema {
    pub(crate) fn new() -> Self {
        Self(Schema::new(Inner::Date(DateInner::default())))
    }

    fn bound(self, name: &'static str, bound: DateBound) -> Self {
        let reference = match &bound {
            DateBound::Ref(reference) => Some(reference.clone()),
            _ => None,
        };
        let rule = Rule::test(name, Some(bound.describe()), move |value, cx| {
            let limit = match &bound {
                DateBound::At(date) => *date,
                DateBound::Now => Utc::now(),
                DateBound::Ref(reference) => cx
                    .resolve(reference)
                    .and_then(|target| to_date(&target, None))
                    .ok_or_else(|| cx.ref_error("date", reference))?,
            };
            let Some(date) = value.as_date() else {
                return Ok(());
            };
            let holds = if name == "min" { *date >= limit } else { *date <= limit };
            if holds {
                return Ok(());
            }
            Err(cx.error(
                format!("date.{name}"),
                context!("limit" => limit, "value" => value.clone()),
            ))
        });
        map(self, |node| {
            if let Some(reference) = &reference {
                node.add_ref(reference);
            }
            node.push_rule(rule);
        })
    }

    /// On or after `limit`.
    pub fn min(self, limit: impl Into<DateBound>) -> Self {
        self.bound("min", limit.into())
    }

    /// On or before `limit`.
    pub fn max(self, limit: impl Into<DateBound>) -> Self {
        self.bound("max", limit.into())
    }

    fn format(self, format: DateFormat) -> Self {
        if matches!(&self.0.0.inner, Inner::Date(inner) if inner.format == Some(format)) {
            return self;
        }
        map(self, |node| {
            if let Inner::Date(inner) = &mut node.inner {
                inner.format = Some(format);
            }
        })
    }

    /// Only ISO 8601 strings convert.
    pub fn iso(self) -> Self {
        self.format(DateFormat::Iso)
    }

    /// Only timestamps in `unit` convert.
    pub fn timestamp(self, unit: TimestampUnit) -> Self {
        self.format(DateFormat::Timestamp(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn code(outcome: &Outcome) -> Option<String> {
        outcome.error.as_ref().map(|e| e.details()[0].code.clone())
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn converts_numbers_and_strings() {
        assert_eq!(date().validate(0).value, Some(Value::Date(at(1970, 1, 1))));
        assert_eq!(date().validate("2020-01-02").value, Some(Value::Date(at(2020, 1, 2))));
        assert_eq!(date().validate("86400000").value, Some(Value::Date(at(1970, 1, 2))));
        assert_eq!(code(&date().validate("soon")).as_deref(), Some("date.base"));
    }

    #[test]
    fn formats_restrict_conversion() {
        assert_eq!(code(&date().iso().validate(0)).as_deref(), Some("date.isoDate"));
        let unix = date().timestamp(TimestampUnit::Unix);
        assert_eq!(unix.validate(86_400).value, Some(Value::Date(at(1970, 1, 2))));
        assert_eq!(code(&unix.validate("2020-01-01")).as_deref(), Some("date.timestamp.unix"));
    }

    #[test]
    fn strict_mode_reports_date_strict() {
        let strict = ValidationOptions::default().with_convert(false);
        assert_eq!(code(&date().validate_with(0, &strict)).as_deref(), Some("date.strict"));
    }

    #[test]
    fn bounds_from_values_and_references() {
        let schema = date().min(at(2020, 1, 1)).max(DateBound::Now);
        assert!(schema.validate("2021-06-01").is_ok());
        assert_eq!(code(&schema.validate("2019-12-31")).as_deref(), Some("date.min"));
        assert_eq!(code(&schema.validate("2999-01-01")).as_deref(), Some("date.max"));

        let range = object()
            .keys([
                ("from", SchemaLike::from(date())),
                ("to", date().min(Ref::new("from")).into()),
            ])
            .unwrap();
        assert!(range.validate(serde_json::json!({ "from": "2020-01-01", "to": "2020-02-01" })).is_ok());
        let error = range
            .validate(serde_json::json!({ "from": "2020-03-01", "to": "2020-02-01" }))
            .error
            .unwrap();
        assert_eq!(error.details()[0].code, "date.min");
        assert_eq!(error.details()[0].path, vec![PathSegment::from("to")]);
    }

    #[test]
    fn unresolvable_reference_reports_date_ref() {
        let schema = object()
            .keys([("to", SchemaLike::from(date().max(Ref::new("from"))))])
            .unwrap();
        let error = schema.validate(serde_json::json!({ "to": 0 })).error.unwrap();
        assert_eq!(error.details()[0].code, "date.ref");
    }
}
