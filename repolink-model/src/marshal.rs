//! Loading wire objects into [`Content`] and building save patches.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::content::{CONTENT_TYPE_FIELD, Content, Field, ID_FIELD, PATH_FIELD, TYPE_FIELD};
use crate::converter::PropertyConverter;
use crate::error::{ModelError, ModelResult};
use crate::handler::ContentHandler;
use crate::registry::{ContentTypeRegistry, HierarchyComparator, TypeComparator};
use crate::schema::{ContentTypeDescriptor, TypeHandle};
use crate::value::PropertyValue;

static HIERARCHY: HierarchyComparator = HierarchyComparator;

/// One page of a collection response.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPage {
    /// `__count` when the server included it.
    pub total: Option<u64>,
    pub items: Vec<Content>,
}

/// Entry point for wire ↔ content mapping, bound to one registry.
#[derive(Clone, Copy)]
pub struct ContentMarshaller<'a> {
    registry: &'a ContentTypeRegistry,
    comparator: &'a dyn TypeComparator,
}

impl<'a> ContentMarshaller<'a> {
    pub fn new(registry: &'a ContentTypeRegistry) -> Self {
        Self {
            registry,
            comparator: &HIERARCHY,
        }
    }

    /// Replaces the default base-chain assignability check.
    pub fn with_comparator(mut self, comparator: &'a dyn TypeComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn registry(&self) -> &'a ContentTypeRegistry {
        self.registry
    }

    pub fn converter(&self) -> PropertyConverter<'a> {
        PropertyConverter::new(*self)
    }

    /// A new, unsaved content of a registered (or generic) type.
    pub fn new_content(&self, parent_path: &str, type_name: &str) -> Content {
        let content = Content::create(parent_path, type_name);
        match self.registry.descriptor_for_name(type_name) {
            Some(descriptor) => content.with_descriptor(descriptor),
            None => content,
        }
    }

    /// Loads a single content from a wire object (optionally wrapped in `{"d": ..}`).
    pub fn load_content(&self, wire: &Value, target: Option<&TypeHandle>) -> ModelResult<Content> {
        let object = unwrap_entity(wire)
            .as_object()
            .ok_or_else(|| ModelError::InvalidPayload("content payload is not a JSON object".into()))?;
        let content = self.load_object(object, target)?;
        debug!(
            type_name = %content.type_name(),
            id = ?content.id(),
            fields = object.len(),
            "content loaded"
        );
        Ok(content)
    }

    /// Loads every item of a collection response.
    pub fn load_collection(&self, wire: &Value, target: Option<&TypeHandle>) -> ModelResult<ContentPage> {
        let (total, results) = match unwrap_entity(wire) {
            Value::Array(items) => (None, items),
            Value::Object(map) => {
                let items = map.get("results").and_then(Value::as_array).ok_or_else(|| {
                    ModelError::InvalidPayload("collection payload has no results array".into())
                })?;
                (map.get("__count").and_then(parse_count), items)
            }
            _ => {
                return Err(ModelError::InvalidPayload(
                    "collection payload is neither an array nor an object".into(),
                ));
            }
        };
        let items = results
            .iter()
            .map(|item| self.load_content(item, target))
            .collect::<ModelResult<Vec<_>>>()?;
        debug!(count = items.len(), total = ?total, "collection loaded");
        Ok(ContentPage { total, items })
    }

    pub(crate) fn load_object(&self, object: &Map<String, Value>, target: Option<&TypeHandle>) -> ModelResult<Content> {
        let id = object.get(ID_FIELD).and_then(Value::as_i64);
        let path = object.get(PATH_FIELD).and_then(Value::as_str);
        let wire_type = object.get(TYPE_FIELD).and_then(Value::as_str);

        let descriptor = self.select_descriptor(wire_type, target);
        let handler = descriptor.as_deref().and_then(ContentTypeDescriptor::handler);
        let converter = self.converter();

        let mut content = Content::loaded(
            id,
            path.map(str::to_string),
            wire_type.unwrap_or_default().to_string(),
            descriptor.clone(),
        );

        for (key, wire) in object {
            let is_identity = match key.as_str() {
                ID_FIELD => id.is_some(),
                PATH_FIELD => path.is_some(),
                TYPE_FIELD => wire_type.is_some(),
                _ => false,
            };
            if is_identity {
                continue;
            }
            match descriptor.as_deref().and_then(|d| d.property_by_wire_name(key)) {
                Some(property) => match converter.convert_to_property(handler, property, wire)? {
                    Some(value) => content.load_field(key, Field::Mapped(value)),
                    None => trace!(field = %key, expected = property.property_type.label(), "field left unset"),
                },
                None => content.load_field(key, Field::Dynamic(wire.clone())),
            }
        }
        Ok(content)
    }

    /// The JSON body for saving `content`: its dirty fields, plus the
    /// content type when the content does not exist yet.
    pub fn to_wire_patch(&self, content: &Content) -> ModelResult<Value> {
        let mut body = Map::new();
        if !content.is_existing() && !content.type_name().is_empty() {
            body.insert(CONTENT_TYPE_FIELD.into(), Value::String(content.type_name().to_string()));
        }
        let descriptor = content.descriptor().map(|d| d.as_ref());
        let handler = descriptor.and_then(ContentTypeDescriptor::handler);
        for key in content.dirty_fields() {
            let Some(field) = content.field_by_wire_name(key) else {
                continue;
            };
            if let Field::Mapped(PropertyValue::Deferred(_)) = field {
                continue;
            }
            if let Some(wire) = self.encode_field(descriptor, handler, key, field)? {
                body.insert(key.to_string(), wire);
            }
        }
        debug!(fields = body.len(), existing = content.is_existing(), "wire patch built");
        Ok(Value::Object(body))
    }

    /// The full wire object of `content`: identity first, then every field.
    pub fn to_wire_object(&self, content: &Content) -> ModelResult<Value> {
        let mut object = content.identity_map();
        let descriptor = content.descriptor().map(|d| d.as_ref());
        let handler = descriptor.and_then(ContentTypeDescriptor::handler);
        for (key, field) in content.fields() {
            if let Some(wire) = self.encode_field(descriptor, handler, key, field)? {
                object.insert(key.to_string(), wire);
            }
        }
        Ok(Value::Object(object))
    }

    fn encode_field(
        &self,
        descriptor: Option<&ContentTypeDescriptor>,
        handler: Option<&dyn ContentHandler>,
        key: &str,
        field: &Field,
    ) -> ModelResult<Option<Value>> {
        match field {
            Field::Dynamic(value) => Ok(Some(value.clone())),
            Field::Mapped(value) => match descriptor.and_then(|d| d.property_by_wire_name(key)) {
                Some(property) => self.converter().convert_from_property(handler, property, value),
                None => Ok(Some(value.to_json())),
            },
        }
    }

    /// The payload's own type wins when it is registered and assignable to
    /// the requested type; otherwise the requested type; otherwise generic.
    fn select_descriptor(
        &self,
        wire_type: Option<&str>,
        target: Option<&TypeHandle>,
    ) -> Option<std::sync::Arc<ContentTypeDescriptor>> {
        let candidate = wire_type.and_then(|name| self.registry.resolve_type(name));
        match (candidate, target) {
            (Some(candidate), Some(target)) => {
                if self.comparator.is_assignable(self.registry, candidate, target) {
                    self.registry.descriptor(candidate)
                } else {
                    self.registry.descriptor(target)
                }
            }
            (Some(candidate), None) => self.registry.descriptor(candidate),
            (None, Some(target)) => self.registry.descriptor(target),
            (None, None) => None,
        }
    }
}

/// Strips a `{"d": {...}}` response envelope if present.
pub fn unwrap_entity(wire: &Value) -> &Value {
    match wire {
        Value::Object(map) if map.len() == 1 => map.get("d").filter(|d| d.is_object()).unwrap_or(wire),
        _ => wire,
    }
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
