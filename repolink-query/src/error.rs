use repolink_model::ModelError;
use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling queries or building requests.
///
/// All of them occur before anything is sent to the repository.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("property '{property}' is not mapped on content type '{local_type}'")]
    UnknownProperty { local_type: String, property: String },

    #[error("Invalid request properties: either content id or path must be provided.")]
    MissingContentAddress,

    #[error("Invalid request properties: both action name and property name are provided.")]
    ActionAndProperty,

    #[error("cannot plan save: {0}")]
    UnplannableSave(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
