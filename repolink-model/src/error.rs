//! Error types for content marshalling.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while mapping content.
///
/// Schema drift is never an error: unknown or unconvertible fields are
/// skipped during load.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A conversion hook failed, or returned a value the property cannot hold.
    #[error("cannot set property '{property}': {source}")]
    PropertyConversion {
        property: String,
        #[source]
        source: anyhow::Error,
    },

    /// One local type is registered under several wire names and none is the default.
    #[error("type '{local_type}' is registered under multiple names: {}", .names.join(", "))]
    AmbiguousTypeName {
        local_type: String,
        names: Vec<String>,
    },

    /// Wire type name not present in the registry.
    #[error("content type name not registered: {0}")]
    UnknownTypeName(String),

    /// Value assigned to a mapped property has the wrong type.
    #[error("property '{property}' of type {expected} cannot hold a {found} value")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The payload does not have the shape of a content object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
