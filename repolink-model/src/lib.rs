//! Content model and property marshalling for repolink.
//!
//! Maps the repository's JSON wire format to in-memory content and back:
//! - [`ContentTypeRegistry`]: wire type names ↔ local type descriptors, per connection
//! - [`PropertyDescriptor`] / [`ContentTypeDescriptor`]: explicit property tables
//! - [`PropertyConverter`]: per-field coercion in both directions
//! - [`reference`]: classification and materialization of reference payloads
//! - [`Content`]: identity, typed and dynamic fields, dirty tracking
//! - [`ContentMarshaller`]: `load_content` and `to_wire_patch`
//!
//! Nothing in this crate performs I/O. Raw responses are parsed by the
//! caller; this crate only sees `serde_json::Value` trees.

mod content;
mod converter;
mod error;
mod handler;
mod marshal;
pub mod reference;
mod registry;
mod schema;
mod value;

pub use content::{CONTENT_TYPE_FIELD, Content, Field, ID_FIELD, PATH_FIELD, TYPE_FIELD};
pub use converter::PropertyConverter;
pub use error::{ModelError, ModelResult};
pub use handler::ContentHandler;
pub use marshal::{ContentMarshaller, ContentPage, unwrap_entity};
pub use reference::{ReferencePayload, ReferenceShape};
pub use registry::{ContentTypeRegistry, HierarchyComparator, TypeComparator};
pub use schema::{
    ChoiceType, ChoiceVariant, CollectionShape, ContentTypeDescriptor, CustomConverter, PropertyAccess,
    PropertyDescriptor, PropertyType, RecordType, TypeHandle, WireType,
};
pub use value::{PropertyValue, decimal_to_json, format_datetime, parse_datetime, parse_decimal};
