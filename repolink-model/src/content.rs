use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use crate::schema::{ContentTypeDescriptor, PropertyType};
use crate::value::PropertyValue;

/// Wire field holding the content id.
pub const ID_FIELD: &str = "Id";
/// Wire field holding the repository path.
pub const PATH_FIELD: &str = "Path";
/// Wire field holding the content type name.
pub const TYPE_FIELD: &str = "Type";
/// Body field naming the type of content being created.
pub const CONTENT_TYPE_FIELD: &str = "__ContentType";

/// A single field slot: backed by a property descriptor or free-form.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Mapped(PropertyValue),
    Dynamic(Value),
}

/// A repository content item.
///
/// Fields are keyed by wire name. Mapped properties are resolved through
/// the type descriptor first; everything else lives in the dynamic bag.
/// Every mutation is recorded in one dirty set spanning both.
#[derive(Debug, Clone)]
pub struct Content {
    id: Option<i64>,
    path: Option<String>,
    parent_path: Option<String>,
    type_name: String,
    descriptor: Option<Arc<ContentTypeDescriptor>>,
    fields: IndexMap<String, Field>,
    dirty: IndexSet<String>,
    existing: bool,
}

impl Content {
    /// A new, unsaved, untyped content.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: None,
            path: None,
            parent_path: None,
            type_name: type_name.into(),
            descriptor: None,
            fields: IndexMap::new(),
            dirty: IndexSet::new(),
            existing: false,
        }
    }

    /// A new, unsaved content to be created under `parent_path`.
    pub fn create(parent_path: impl Into<String>, type_name: impl Into<String>) -> Self {
        let mut content = Self::new(type_name);
        content.parent_path = Some(parent_path.into());
        content
    }

    /// Attaches the property table of a local type.
    pub fn with_descriptor(mut self, descriptor: Arc<ContentTypeDescriptor>) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub(crate) fn loaded(
        id: Option<i64>,
        path: Option<String>,
        type_name: String,
        descriptor: Option<Arc<ContentTypeDescriptor>>,
    ) -> Self {
        Self {
            id,
            path,
            parent_path: None,
            type_name,
            descriptor,
            fields: IndexMap::new(),
            dirty: IndexSet::new(),
            existing: true,
        }
    }

    pub(crate) fn load_field(&mut self, wire_name: &str, field: Field) {
        self.fields.insert(wire_name.to_string(), field);
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn parent_path(&self) -> Option<&str> {
        self.parent_path.as_deref()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn descriptor(&self) -> Option<&Arc<ContentTypeDescriptor>> {
        self.descriptor.as_ref()
    }

    pub fn is_existing(&self) -> bool {
        self.existing
    }

    /// Whether the content can be addressed by id or path.
    pub fn is_addressable(&self) -> bool {
        self.id.is_some_and(|id| id > 0) || self.path.is_some()
    }

    /// Resolves `name` descriptor-first (local property name), then as a dynamic key.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(self.wire_key(name))
    }

    /// Value of a mapped property. Unexpanded references read as null.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        match self.get(name)? {
            Field::Mapped(PropertyValue::Deferred(_)) => Some(&PropertyValue::Null),
            Field::Mapped(value) => Some(value),
            Field::Dynamic(_) => None,
        }
    }

    /// Follow-up locator of an unexpanded reference property.
    pub fn deferred_uri(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Field::Mapped(value) => value.deferred_uri(),
            Field::Dynamic(_) => None,
        }
    }

    /// Raw value from the dynamic bag.
    pub fn dynamic(&self, key: &str) -> Option<&Value> {
        match self.fields.get(key)? {
            Field::Dynamic(value) => Some(value),
            Field::Mapped(_) => None,
        }
    }

    /// Extract a string from either a mapped or a dynamic field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Field::Mapped(value) => value.as_str(),
            Field::Dynamic(value) => value.as_str(),
        }
    }

    /// Extract an integer from either a mapped or a dynamic field.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Field::Mapped(value) => value.as_i64(),
            Field::Dynamic(value) => value.as_i64(),
        }
    }

    /// Extract a boolean from either a mapped or a dynamic field.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Field::Mapped(value) => value.as_bool(),
            Field::Dynamic(value) => value.as_bool(),
        }
    }

    /// Assigns a value, marking the field dirty.
    ///
    /// `name` is a local property name or a mapped wire name; anything else
    /// is a dynamic key. Mapped properties are type-checked. Assigning null
    /// to a choice that is already null or absent is not a change.
    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) -> ModelResult<()> {
        let value = value.into();
        let property = self
            .descriptor
            .as_ref()
            .and_then(|d| d.property(name).or_else(|| d.property_by_wire_name(name)));
        let Some(property) = property else {
            self.fields.insert(name.to_string(), Field::Dynamic(value.to_json()));
            self.dirty.insert(name.to_string());
            return Ok(());
        };
        if !property.accepts(&value) {
            return Err(ModelError::TypeMismatch {
                property: property.name.clone(),
                expected: property.property_type.label(),
                found: value.kind(),
            });
        }
        let wire_name = property.wire_name.clone();
        if matches!(property.property_type, PropertyType::Choice(_)) && value.is_null() {
            let current_is_null = match self.fields.get(&wire_name) {
                None | Some(Field::Mapped(PropertyValue::Null)) => true,
                Some(Field::Dynamic(v)) => v.is_null(),
                Some(Field::Mapped(_)) => false,
            };
            if current_is_null {
                return Ok(());
            }
        }
        self.fields.insert(wire_name.clone(), Field::Mapped(value));
        self.dirty.insert(wire_name);
        Ok(())
    }

    /// Indexer-style assignment of a raw wire value.
    pub fn set_dynamic(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), Field::Dynamic(value));
        self.dirty.insert(key.to_string());
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.contains(self.wire_key(name))
    }

    /// Dirty wire field names, in the order they were first changed.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// All fields in load/assignment order, keyed by wire name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn field_by_wire_name(&self, wire_name: &str) -> Option<&Field> {
        self.fields.get(wire_name)
    }

    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Records a successful save: the content now exists at the given identity.
    pub fn mark_saved(&mut self, id: Option<i64>, path: Option<String>) {
        if id.is_some() {
            self.id = id;
        }
        if path.is_some() {
            self.path = path;
        }
        self.existing = true;
        self.dirty.clear();
    }

    /// `{"Id": .., "Path": .., "Type": ..}` with only the known parts.
    pub fn identity_json(&self) -> Value {
        Value::Object(self.identity_map())
    }

    pub(crate) fn identity_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(id) = self.id {
            map.insert(ID_FIELD.into(), Value::from(id));
        }
        if let Some(path) = &self.path {
            map.insert(PATH_FIELD.into(), Value::String(path.clone()));
        }
        if !self.type_name.is_empty() {
            map.insert(TYPE_FIELD.into(), Value::String(self.type_name.clone()));
        }
        map
    }

    fn wire_key<'a>(&'a self, name: &'a str) -> &'a str {
        self.descriptor
            .as_ref()
            .and_then(|d| d.property(name))
            .map_or(name, |p| p.wire_name.as_str())
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.path == other.path
            && self.type_name == other.type_name
            && self.fields == other.fields
    }
}
