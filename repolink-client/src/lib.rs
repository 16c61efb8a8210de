//! Repository facade for repolink.
//!
//! Ties the model and query crates to caller-supplied collaborators:
//! a [`Transport`] that moves bytes and an optional [`CredentialSupplier`].
//! Connection settings come from [`RepositoryConfig`], usually loaded
//! from a `repolink.toml` file.

mod config;
mod error;
mod logging;
mod repository;
pub mod transport;

pub use config::{RepositoryConfig, ServerContext};
pub use error::{ClientError, ClientResult};
pub use logging::init_logging;
pub use repository::Repository;
pub use transport::{CredentialSupplier, StaticToken, Transport};
