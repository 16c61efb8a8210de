use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::content::Content;
use crate::schema::CollectionShape;

/// In-memory value of a mapped property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<FixedOffset>),
    Json(Value),
    List(Vec<PropertyValue>),
    /// Numeric value of a choice; flag choices hold the OR of all selected codes.
    Choice(i64),
    Reference(Box<Content>),
    References {
        shape: CollectionShape,
        items: Vec<Content>,
    },
    /// Plain data class, keyed by local field name.
    Record(IndexMap<String, PropertyValue>),
    /// Unexpanded reference, holding its raw wire marker. Reads as null.
    Deferred(Value),
}

impl PropertyValue {
    /// True for null and for unexpanded references.
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null | PropertyValue::Deferred(_))
    }

    /// Follow-up locator of an unexpanded reference.
    pub fn deferred_uri(&self) -> Option<&str> {
        match self {
            PropertyValue::Deferred(marker) => crate::reference::deferred_uri(marker.as_object()?),
            _ => None,
        }
    }

    /// Short label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::Decimal(_) => "decimal",
            PropertyValue::String(_) => "string",
            PropertyValue::DateTime(_) => "datetime",
            PropertyValue::Json(_) => "json",
            PropertyValue::List(_) => "list",
            PropertyValue::Choice(_) => "choice",
            PropertyValue::Reference(_) => "reference",
            PropertyValue::References { .. } => "references",
            PropertyValue::Record(_) => "record",
            PropertyValue::Deferred(_) => "deferred",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            PropertyValue::Decimal(d) => Some(*d),
            PropertyValue::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<i64> {
        match self {
            PropertyValue::Choice(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&Content> {
        match self {
            PropertyValue::Reference(content) => Some(content),
            _ => None,
        }
    }

    pub fn as_contents(&self) -> Option<&[Content]> {
        match self {
            PropertyValue::References { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Descriptor-free JSON rendering, used for dynamic fields.
    ///
    /// Choices render as their number since codes need the descriptor;
    /// references render as their identity only.
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Integer(i) => Value::from(*i),
            PropertyValue::Float(f) => float_to_json(*f),
            PropertyValue::Decimal(d) => decimal_to_json(d),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::DateTime(dt) => Value::String(format_datetime(dt)),
            PropertyValue::Json(v) => v.clone(),
            PropertyValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PropertyValue::Choice(v) => Value::from(*v),
            PropertyValue::Reference(content) => content.identity_json(),
            PropertyValue::References { items, .. } => {
                Value::Array(items.iter().map(Content::identity_json).collect())
            }
            PropertyValue::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            PropertyValue::Deferred(marker) => marker.clone(),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<Decimal> for PropertyValue {
    fn from(d: Decimal) -> Self {
        PropertyValue::Decimal(d)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<DateTime<FixedOffset>> for PropertyValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        PropertyValue::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(dt: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(dt.fixed_offset())
    }
}

impl From<Content> for PropertyValue {
    fn from(content: Content) -> Self {
        PropertyValue::Reference(Box::new(content))
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

/// Parses a wire timestamp into a timezone-aware instant.
///
/// Values without an offset are taken as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Renders a timestamp the way the repository emits it (`Z` for UTC).
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Decimals go out as JSON numbers when the text parses as one.
pub fn decimal_to_json(d: &Decimal) -> Value {
    let text = d.to_string();
    match serde_json::from_str::<Value>(&text) {
        Ok(number @ Value::Number(_)) => number,
        _ => Value::String(text),
    }
}

fn float_to_json(f: f64) -> Value {
    serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_datetime_with_offset() {
        let dt = parse_datetime("2024-03-01T10:15:00+02:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 7200);
        assert_eq!(format_datetime(&dt), "2024-03-01T10:15:00+02:00");
    }

    #[test]
    fn parse_datetime_without_offset_is_utc() {
        let dt = parse_datetime("2024-03-01T10:15:00").unwrap();
        assert_eq!(format_datetime(&dt), "2024-03-01T10:15:00Z");
    }

    #[test]
    fn parse_datetime_rejects_garbage() {
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn decimal_scientific_notation() {
        assert_eq!(parse_decimal("1e-3"), Some(Decimal::new(1, 3)));
    }

    #[test]
    fn decimal_renders_as_number() {
        let d = parse_decimal("12.50").unwrap();
        assert!(decimal_to_json(&d).is_number());
    }

    #[test]
    fn option_into_value() {
        assert_eq!(PropertyValue::from(None::<i64>), PropertyValue::Null);
        assert_eq!(PropertyValue::from(Some(3_i64)), PropertyValue::Integer(3));
    }
}
