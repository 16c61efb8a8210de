//! Per-property conversion between wire JSON and [`PropertyValue`].
//!
//! Load direction, first match wins:
//! 1. the type's [`ContentHandler`] hook, then the property's [`CustomConverter`]
//! 2. scalar coercion (numbers, strings, booleans, timestamps)
//! 3. element-wise array coercion
//! 4. choice coercion
//! 5. reference coercion (see [`crate::reference`])
//! 6. structural population of plain records
//! 7. otherwise the value is left unset
//!
//! The save direction mirrors it. Nothing here logs or performs I/O.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use crate::handler::ContentHandler;
use crate::marshal::ContentMarshaller;
use crate::reference::{self, ReferenceShape};
use crate::schema::{ChoiceType, PropertyDescriptor, PropertyType, RecordType};
use crate::value::{PropertyValue, decimal_to_json, format_datetime, parse_datetime, parse_decimal};

/// Converts property values in both directions.
#[derive(Clone, Copy)]
pub struct PropertyConverter<'a> {
    marshaller: ContentMarshaller<'a>,
}

impl<'a> PropertyConverter<'a> {
    pub fn new(marshaller: ContentMarshaller<'a>) -> Self {
        Self { marshaller }
    }

    /// Wire → property. `Ok(None)` means "leave the property unset".
    pub fn convert_to_property(
        &self,
        handler: Option<&dyn ContentHandler>,
        property: &PropertyDescriptor,
        wire: &Value,
    ) -> ModelResult<Option<PropertyValue>> {
        if let Some(handler) = handler {
            match handler.convert_to_property(property, wire) {
                Ok(Some(value)) => return assign(property, value).map(Some),
                Ok(None) => {}
                Err(source) => return Err(conversion_error(property, source)),
            }
        }
        if let Some(converter) = &property.converter {
            let value = converter
                .to_property(wire)
                .map_err(|source| conversion_error(property, source))?;
            return assign(property, value).map(Some);
        }
        if wire.is_null() && !property.nullable {
            return Ok(None);
        }
        self.coerce(&property.property_type, wire)
    }

    /// Property → wire. `Ok(None)` means "omit the field".
    pub fn convert_from_property(
        &self,
        handler: Option<&dyn ContentHandler>,
        property: &PropertyDescriptor,
        value: &PropertyValue,
    ) -> ModelResult<Option<Value>> {
        if let Some(handler) = handler {
            match handler.convert_from_property(property, value) {
                Ok(Some(wire)) => return Ok(Some(wire)),
                Ok(None) => {}
                Err(source) => return Err(conversion_error(property, source)),
            }
        }
        if let Some(converter) = &property.converter {
            return converter
                .to_wire(value)
                .map(Some)
                .map_err(|source| conversion_error(property, source));
        }
        self.encode(&property.property_type, value)
    }

    fn coerce(&self, property_type: &PropertyType, wire: &Value) -> ModelResult<Option<PropertyValue>> {
        match property_type {
            PropertyType::Reference { target } => {
                self.materialize(wire, ReferenceShape::Single, target.as_ref())
            }
            PropertyType::MultiReference { target, shape } => {
                self.materialize(wire, ReferenceShape::Multi(*shape), target.as_ref())
            }
            _ if wire.is_null() => Ok(Some(PropertyValue::Null)),
            PropertyType::Array { element, .. } => {
                let Some(items) = wire.as_array() else {
                    return Ok(None);
                };
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match self.coerce(element, item)? {
                        Some(value) => values.push(value),
                        None => return Ok(None),
                    }
                }
                Ok(Some(PropertyValue::List(values)))
            }
            PropertyType::Choice(choice) => Ok(coerce_choice(choice, wire)),
            PropertyType::Record(record) => self.coerce_record(record, wire),
            PropertyType::Json | PropertyType::Custom => Ok(Some(PropertyValue::Json(wire.clone()))),
            scalar => Ok(coerce_scalar(scalar, wire)),
        }
    }

    fn materialize(
        &self,
        wire: &Value,
        shape: ReferenceShape,
        target: Option<&crate::schema::TypeHandle>,
    ) -> ModelResult<Option<PropertyValue>> {
        match reference::classify(Some(wire)) {
            Some(payload) => reference::materialize(payload, shape, target, &self.marshaller),
            None => Ok(None),
        }
    }

    fn coerce_record(&self, record: &RecordType, wire: &Value) -> ModelResult<Option<PropertyValue>> {
        let Some(object) = wire.as_object() else {
            return Ok(None);
        };
        let mut fields = IndexMap::new();
        for field in record.fields.iter().filter(|f| f.is_mapped()) {
            let Some(value) = object.get(&field.wire_name) else {
                continue;
            };
            if let Some(converted) = self.convert_to_property(None, field, value)? {
                fields.insert(field.name.clone(), converted);
            }
        }
        Ok(Some(PropertyValue::Record(fields)))
    }

    fn encode(&self, property_type: &PropertyType, value: &PropertyValue) -> ModelResult<Option<Value>> {
        let wire = match (property_type, value) {
            // A null choice is never a request to change the field.
            (PropertyType::Choice(_), PropertyValue::Null) => return Ok(None),
            (_, PropertyValue::Null) => Value::Null,
            (_, PropertyValue::Deferred(marker)) => marker.clone(),
            (PropertyType::Choice(choice), PropertyValue::Choice(v)) => {
                Value::Array(choice.codes_for(*v).into_iter().map(Value::String).collect())
            }
            (_, PropertyValue::Reference(content)) => self.marshaller.to_wire_object(content)?,
            (_, PropertyValue::References { items, .. }) => Value::Array(
                items
                    .iter()
                    .map(|c| self.marshaller.to_wire_object(c))
                    .collect::<ModelResult<Vec<_>>>()?,
            ),
            (PropertyType::Array { element, .. }, PropertyValue::List(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.encode(element, item)?.unwrap_or(Value::Null));
                }
                Value::Array(values)
            }
            (PropertyType::Record(record), PropertyValue::Record(fields)) => {
                self.encode_record(record, fields)?
            }
            (_, PropertyValue::Decimal(d)) => decimal_to_json(d),
            (_, PropertyValue::DateTime(dt)) => Value::String(format_datetime(dt)),
            (_, other) => other.to_json(),
        };
        Ok(Some(wire))
    }

    fn encode_record(&self, record: &RecordType, fields: &IndexMap<String, PropertyValue>) -> ModelResult<Value> {
        let mut object = Map::new();
        for (name, value) in fields {
            match record.fields.iter().find(|f| &f.name == name && f.is_mapped()) {
                Some(field) => {
                    if let Some(wire) = self.convert_from_property(None, field, value)? {
                        object.insert(field.wire_name.clone(), wire);
                    }
                }
                None => {
                    object.insert(name.clone(), value.to_json());
                }
            }
        }
        Ok(Value::Object(object))
    }
}

fn assign(property: &PropertyDescriptor, value: PropertyValue) -> ModelResult<PropertyValue> {
    if property.accepts(&value) {
        return Ok(value);
    }
    Err(conversion_error(
        property,
        anyhow::anyhow!(
            "a {} value is not assignable to a {} property",
            value.kind(),
            property.property_type.label()
        ),
    ))
}

fn conversion_error(property: &PropertyDescriptor, source: anyhow::Error) -> ModelError {
    ModelError::PropertyConversion {
        property: property.name.clone(),
        source,
    }
}

fn coerce_scalar(property_type: &PropertyType, wire: &Value) -> Option<PropertyValue> {
    match property_type {
        PropertyType::Bool => wire.as_bool().map(PropertyValue::Bool),
        PropertyType::Integer => coerce_integer(wire).map(PropertyValue::Integer),
        // Integral wire numbers stay integers so they save unchanged.
        PropertyType::Float => match wire {
            Value::Number(n) => n
                .as_i64()
                .map(PropertyValue::Integer)
                .or_else(|| n.as_f64().map(PropertyValue::Float)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(PropertyValue::Float),
            _ => None,
        },
        PropertyType::Decimal => match wire {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        }
        .map(PropertyValue::Decimal),
        PropertyType::String => wire.as_str().map(|s| PropertyValue::String(s.to_string())),
        PropertyType::DateTime => wire.as_str().and_then(parse_datetime).map(PropertyValue::DateTime),
        _ => None,
    }
}

fn coerce_integer(wire: &Value) -> Option<i64> {
    match wire {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Choice wire values are arrays of codes. An empty array reads as null;
/// unknown codes are ignored.
fn coerce_choice(choice: &ChoiceType, wire: &Value) -> Option<PropertyValue> {
    let items = wire.as_array()?;
    if items.is_empty() {
        return Some(PropertyValue::Null);
    }
    if !choice.flags {
        return items[0].as_str().and_then(|code| choice.value_of(code)).map(PropertyValue::Choice);
    }
    let matched: Vec<i64> = items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|code| choice.value_of(code))
        .collect();
    if matched.is_empty() {
        return None;
    }
    Some(PropertyValue::Choice(matched.into_iter().fold(0, |acc, v| acc | v)))
}
