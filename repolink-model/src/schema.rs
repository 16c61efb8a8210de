use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::handler::ContentHandler;
use crate::value::PropertyValue;

/// Identity of a local content type.
///
/// Handles are compared by name. Two registrations that share a handle
/// describe the same local type, whatever wire names they use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(Arc<str>);

impl TypeHandle {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeHandle {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// The wire-level shape of a property, as seen by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    Scalar,
    Array,
    Reference,
    MultiReference,
    Custom,
}

/// Output hint for collection-valued properties.
///
/// Elements are materialized identically whatever the shape; the hint only
/// records which collection the caller declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionShape {
    #[default]
    Array,
    List,
    Sequence,
}

/// Which properties take part in marshalling.
///
/// Only `ReadWrite` properties are mapped. The others stay in the
/// descriptor table for documentation and are skipped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAccess {
    #[default]
    ReadWrite,
    ReadOnly,
    Static,
    NonPublic,
}

/// The semantic type a property is coerced to.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    Bool,
    Integer,
    Float,
    Decimal,
    String,
    DateTime,
    /// Raw JSON, kept as received.
    Json,
    Array {
        element: Box<PropertyType>,
        shape: CollectionShape,
    },
    Choice(ChoiceType),
    Reference {
        target: Option<TypeHandle>,
    },
    MultiReference {
        target: Option<TypeHandle>,
        shape: CollectionShape,
    },
    /// A plain data class populated field by field from a JSON object.
    Record(RecordType),
    /// Opaque to the built-in rules; handled by a [`CustomConverter`].
    Custom,
}

impl PropertyType {
    pub fn wire_type(&self) -> WireType {
        match self {
            PropertyType::Array { .. } => WireType::Array,
            PropertyType::Reference { .. } => WireType::Reference,
            PropertyType::MultiReference { .. } => WireType::MultiReference,
            PropertyType::Custom => WireType::Custom,
            _ => WireType::Scalar,
        }
    }

    /// Short label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::Bool => "bool",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Decimal => "decimal",
            PropertyType::String => "string",
            PropertyType::DateTime => "datetime",
            PropertyType::Json => "json",
            PropertyType::Array { .. } => "array",
            PropertyType::Choice(_) => "choice",
            PropertyType::Reference { .. } => "reference",
            PropertyType::MultiReference { .. } => "multi-reference",
            PropertyType::Record(_) => "record",
            PropertyType::Custom => "custom",
        }
    }

    /// Whether a non-null in-memory value can be assigned to this type.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (_, PropertyValue::Null) => true,
            (PropertyType::Json | PropertyType::Custom, _) => true,
            (PropertyType::Bool, PropertyValue::Bool(_)) => true,
            (PropertyType::Integer, PropertyValue::Integer(_)) => true,
            (PropertyType::Float, PropertyValue::Float(_) | PropertyValue::Integer(_)) => true,
            (PropertyType::Decimal, PropertyValue::Decimal(_) | PropertyValue::Integer(_)) => true,
            (PropertyType::String, PropertyValue::String(_)) => true,
            (PropertyType::DateTime, PropertyValue::DateTime(_)) => true,
            (PropertyType::Array { element, .. }, PropertyValue::List(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (PropertyType::Choice(_), PropertyValue::Choice(_)) => true,
            (PropertyType::Reference { .. }, PropertyValue::Reference(_)) => true,
            (PropertyType::MultiReference { .. }, PropertyValue::References { .. }) => true,
            (PropertyType::Record(_), PropertyValue::Record(_)) => true,
            _ => false,
        }
    }

    fn nullable_by_default(&self) -> bool {
        !matches!(
            self,
            PropertyType::Bool
                | PropertyType::Integer
                | PropertyType::Float
                | PropertyType::Decimal
                | PropertyType::DateTime
        )
    }
}

/// One code of a choice field and the numeric value it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceVariant {
    pub code: String,
    pub value: i64,
}

/// Enum/choice field definition. Wire values are always arrays of codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceType {
    pub variants: Vec<ChoiceVariant>,
    /// Flag choices OR all matched codes together.
    #[serde(default)]
    pub flags: bool,
}

impl ChoiceType {
    /// Single-valued choice; variant values are their declaration indices.
    pub fn single<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: codes
                .into_iter()
                .enumerate()
                .map(|(index, code)| ChoiceVariant {
                    code: code.into(),
                    value: index as i64,
                })
                .collect(),
            flags: false,
        }
    }

    /// Flag choice; variant values are successive powers of two.
    ///
    /// Only the first 63 codes get a bit; later codes are dropped.
    pub fn flags<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: codes
                .into_iter()
                .enumerate()
                .map_while(|(index, code)| {
                    let value = u32::try_from(index)
                        .ok()
                        .and_then(|shift| 1_i64.checked_shl(shift))
                        .filter(|bit| *bit > 0)?;
                    Some(ChoiceVariant {
                        code: code.into(),
                        value,
                    })
                })
                .collect(),
            flags: true,
        }
    }

    /// Choice with explicit values.
    pub fn with_values<I, S>(variants: I, flags: bool) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            variants: variants
                .into_iter()
                .map(|(code, value)| ChoiceVariant {
                    code: code.into(),
                    value,
                })
                .collect(),
            flags,
        }
    }

    /// Case-insensitive code lookup.
    pub fn value_of(&self, code: &str) -> Option<i64> {
        self.variants
            .iter()
            .find(|v| v.code.eq_ignore_ascii_case(code))
            .map(|v| v.value)
    }

    /// Codes that encode `value`, in declaration order.
    pub fn codes_for(&self, value: i64) -> Vec<String> {
        if !self.flags || value == 0 {
            return self
                .variants
                .iter()
                .find(|v| v.value == value)
                .map(|v| vec![v.code.clone()])
                .unwrap_or_else(|| vec![value.to_string()]);
        }
        self.variants
            .iter()
            .filter(|v| v.value != 0 && value & v.value == v.value)
            .map(|v| v.code.clone())
            .collect()
    }
}

/// Field table of a plain data class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordType {
    pub fields: Vec<PropertyDescriptor>,
}

impl RecordType {
    pub fn new(fields: Vec<PropertyDescriptor>) -> Self {
        Self { fields }
    }
}

type ToPropertyFn = dyn Fn(&Value) -> anyhow::Result<PropertyValue> + Send + Sync;
type ToWireFn = dyn Fn(&PropertyValue) -> anyhow::Result<Value> + Send + Sync;

/// Per-property conversion pair supplied at registration time.
#[derive(Clone)]
pub struct CustomConverter {
    to_property: Arc<ToPropertyFn>,
    to_wire: Arc<ToWireFn>,
}

impl CustomConverter {
    pub fn new<P, W>(to_property: P, to_wire: W) -> Self
    where
        P: Fn(&Value) -> anyhow::Result<PropertyValue> + Send + Sync + 'static,
        W: Fn(&PropertyValue) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            to_property: Arc::new(to_property),
            to_wire: Arc::new(to_wire),
        }
    }

    pub fn to_property(&self, wire: &Value) -> anyhow::Result<PropertyValue> {
        (self.to_property)(wire)
    }

    pub fn to_wire(&self, value: &PropertyValue) -> anyhow::Result<Value> {
        (self.to_wire)(value)
    }
}

impl fmt::Debug for CustomConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomConverter")
    }
}

impl PartialEq for CustomConverter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.to_property, &other.to_property) && Arc::ptr_eq(&self.to_wire, &other.to_wire)
    }
}

/// Static metadata for one mapped property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Local property name.
    pub name: String,
    /// Field name on the wire. Defaults to `name`.
    pub wire_name: String,
    pub property_type: PropertyType,
    pub nullable: bool,
    pub access: PropertyAccess,
    pub converter: Option<CustomConverter>,
}

impl PropertyDescriptor {
    pub fn new(name: &str, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            wire_name: name.into(),
            nullable: property_type.nullable_by_default(),
            property_type,
            access: PropertyAccess::ReadWrite,
            converter: None,
        }
    }

    /// Shorthand for a boolean property.
    pub fn bool(name: &str) -> Self {
        Self::new(name, PropertyType::Bool)
    }

    /// Shorthand for an integral property.
    pub fn integer(name: &str) -> Self {
        Self::new(name, PropertyType::Integer)
    }

    /// Shorthand for a floating point property.
    pub fn float(name: &str) -> Self {
        Self::new(name, PropertyType::Float)
    }

    /// Shorthand for an arbitrary precision decimal property.
    pub fn decimal(name: &str) -> Self {
        Self::new(name, PropertyType::Decimal)
    }

    /// Shorthand for a string property.
    pub fn string(name: &str) -> Self {
        Self::new(name, PropertyType::String)
    }

    /// Shorthand for a timestamp property.
    pub fn datetime(name: &str) -> Self {
        Self::new(name, PropertyType::DateTime)
    }

    /// Shorthand for a raw JSON property.
    pub fn json(name: &str) -> Self {
        Self::new(name, PropertyType::Json)
    }

    /// Shorthand for an array of scalars.
    pub fn array(name: &str, element: PropertyType) -> Self {
        Self::new(
            name,
            PropertyType::Array {
                element: Box::new(element),
                shape: CollectionShape::Array,
            },
        )
    }

    /// Shorthand for a list of scalars.
    pub fn list(name: &str, element: PropertyType) -> Self {
        Self::new(
            name,
            PropertyType::Array {
                element: Box::new(element),
                shape: CollectionShape::List,
            },
        )
    }

    /// Shorthand for a choice field.
    pub fn choice(name: &str, choice: ChoiceType) -> Self {
        Self::new(name, PropertyType::Choice(choice))
    }

    /// Shorthand for a single reference.
    pub fn reference(name: &str) -> Self {
        Self::new(name, PropertyType::Reference { target: None })
    }

    /// Shorthand for a multi-reference materialized as an array.
    pub fn multi_reference(name: &str) -> Self {
        Self::new(
            name,
            PropertyType::MultiReference {
                target: None,
                shape: CollectionShape::Array,
            },
        )
    }

    /// Shorthand for a nested data class.
    pub fn record(name: &str, record: RecordType) -> Self {
        Self::new(name, PropertyType::Record(record))
    }

    /// Shorthand for a property converted by caller-supplied callbacks.
    pub fn custom(name: &str, converter: CustomConverter) -> Self {
        let mut descriptor = Self::new(name, PropertyType::Custom);
        descriptor.converter = Some(converter);
        descriptor
    }

    pub fn with_wire_name(mut self, wire_name: &str) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_access(mut self, access: PropertyAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_converter(mut self, converter: CustomConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Narrows a reference property to a local type.
    pub fn with_target(mut self, target: TypeHandle) -> Self {
        match &mut self.property_type {
            PropertyType::Reference { target: t } | PropertyType::MultiReference { target: t, .. } => {
                *t = Some(target);
            }
            _ => {}
        }
        self
    }

    /// Sets the collection shape hint of an array or multi-reference property.
    pub fn with_shape(mut self, shape: CollectionShape) -> Self {
        match &mut self.property_type {
            PropertyType::Array { shape: s, .. } | PropertyType::MultiReference { shape: s, .. } => {
                *s = shape;
            }
            _ => {}
        }
        self
    }

    pub fn wire_type(&self) -> WireType {
        self.property_type.wire_type()
    }

    pub fn is_mapped(&self) -> bool {
        self.access == PropertyAccess::ReadWrite
    }

    /// Whether `value` can be assigned to this property.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        if let PropertyValue::Deferred(_) = value {
            return matches!(
                self.property_type,
                PropertyType::Reference { .. } | PropertyType::MultiReference { .. }
            );
        }
        if value.is_null() {
            return self.nullable;
        }
        self.property_type.accepts(value)
    }
}

/// Describes a local content type: its properties and conversion hook.
#[derive(Clone)]
pub struct ContentTypeDescriptor {
    pub local_type: TypeHandle,
    /// Parent type, consulted by the default assignability check.
    pub base: Option<TypeHandle>,
    properties: IndexMap<String, PropertyDescriptor>,
    handler: Option<Arc<dyn ContentHandler>>,
}

impl ContentTypeDescriptor {
    pub fn new(local_type: impl Into<TypeHandle>) -> Self {
        Self {
            local_type: local_type.into(),
            base: None,
            properties: IndexMap::new(),
            handler: None,
        }
    }

    pub fn with_base(mut self, base: impl Into<TypeHandle>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Adds a property. A later property with the same local name replaces the earlier one.
    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.insert(property.name.clone(), property);
        self
    }

    pub fn with_properties<I>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = PropertyDescriptor>,
    {
        for property in properties {
            self.properties.insert(property.name.clone(), property);
        }
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn ContentHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Looks up a mapped property by local name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name).filter(|p| p.is_mapped())
    }

    /// Looks up a mapped property by wire field name.
    pub fn property_by_wire_name(&self, wire_name: &str) -> Option<&PropertyDescriptor> {
        self.mapped_properties().find(|p| p.wire_name == wire_name)
    }

    /// Properties taking part in marshalling, in declaration order.
    pub fn mapped_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values().filter(|p| p.is_mapped())
    }

    pub fn handler(&self) -> Option<&dyn ContentHandler> {
        self.handler.as_deref()
    }
}

impl fmt::Debug for ContentTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentTypeDescriptor")
            .field("local_type", &self.local_type)
            .field("base", &self.base)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
