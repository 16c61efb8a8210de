//! Reference payload classification and materialization.
//!
//! Reference fields arrive in one of five JSON shapes, told apart by shape
//! alone. Deferred references are never fetched: they materialize to a
//! value that reads as null and writes its original marker back out.

use serde_json::{Map, Value};

use crate::error::ModelResult;
use crate::marshal::ContentMarshaller;
use crate::schema::{CollectionShape, TypeHandle};
use crate::value::PropertyValue;

/// Wrapper key of an unexpanded reference: `{"__deferred": {"uri": ".."}}`.
pub const DEFERRED_MARKER: &str = "__deferred";
const DEFERRED_MARKER_ALT: &str = "__deferred__";

/// Shape of a reference field payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferencePayload<'a> {
    /// The field is not present at all.
    Absent,
    /// Unexpanded reference with a follow-up locator.
    Deferred {
        uri: &'a str,
        marker: &'a Map<String, Value>,
    },
    Null,
    /// Expanded single reference.
    Single(&'a Map<String, Value>),
    /// Expanded multi-reference, in wire order.
    Multi(Vec<&'a Map<String, Value>>),
}

/// How the declared property holds its references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceShape {
    Single,
    Multi(CollectionShape),
}

/// Classifies a reference payload.
///
/// Returns `None` for values that are not reference-shaped at all
/// (scalars, or arrays holding non-objects).
pub fn classify(wire: Option<&Value>) -> Option<ReferencePayload<'_>> {
    let Some(wire) = wire else {
        return Some(ReferencePayload::Absent);
    };
    match wire {
        Value::Null => Some(ReferencePayload::Null),
        Value::Object(map) => Some(match deferred_uri(map) {
            Some(uri) => ReferencePayload::Deferred { uri, marker: map },
            None => ReferencePayload::Single(map),
        }),
        Value::Array(items) => items
            .iter()
            .map(Value::as_object)
            .collect::<Option<Vec<_>>>()
            .map(ReferencePayload::Multi),
        _ => None,
    }
}

pub(crate) fn deferred_uri(map: &Map<String, Value>) -> Option<&str> {
    [DEFERRED_MARKER, DEFERRED_MARKER_ALT]
        .iter()
        .find_map(|marker| map.get(*marker))
        .and_then(Value::as_object)
        .and_then(|deferred| deferred.get("uri"))
        .and_then(Value::as_str)
}

/// Turns a classified payload into a property value.
///
/// `Ok(None)` means the property stays unset (absent payload). A single
/// reference declared as multi becomes a one-element collection; a
/// multi payload declared as single keeps its first element.
pub fn materialize(
    payload: ReferencePayload<'_>,
    shape: ReferenceShape,
    target: Option<&TypeHandle>,
    marshaller: &ContentMarshaller<'_>,
) -> ModelResult<Option<PropertyValue>> {
    let value = match payload {
        ReferencePayload::Absent => return Ok(None),
        ReferencePayload::Deferred { marker, .. } => PropertyValue::Deferred(Value::Object(marker.clone())),
        ReferencePayload::Null => PropertyValue::Null,
        ReferencePayload::Single(object) => {
            let content = marshaller.load_object(object, target)?;
            match shape {
                ReferenceShape::Single => PropertyValue::Reference(Box::new(content)),
                ReferenceShape::Multi(shape) => PropertyValue::References {
                    shape,
                    items: vec![content],
                },
            }
        }
        ReferencePayload::Multi(objects) => {
            let items = objects
                .into_iter()
                .map(|object| marshaller.load_object(object, target))
                .collect::<ModelResult<Vec<_>>>()?;
            match shape {
                ReferenceShape::Single => items
                    .into_iter()
                    .next()
                    .map_or(PropertyValue::Null, |c| PropertyValue::Reference(Box::new(c))),
                ReferenceShape::Multi(shape) => PropertyValue::References { shape, items },
            }
        }
    };
    Ok(Some(value))
}
