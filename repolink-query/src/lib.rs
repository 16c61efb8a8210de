//! Query compilation and request building for repolink.
//!
//! - [`Projection`]: `$select` / `$expand` derivation from dotted paths
//! - [`Expr`]: predicate AST with fluent builders
//! - [`QueryCompiler`]: predicate and [`ContentQuery`] → content query text
//! - [`ODataRequest`]: validated query string and URL construction
//! - [`SaveRequest`]: save planning for a [`repolink_model::Content`]
//!
//! Everything here is pure; nothing is sent anywhere.

mod error;
mod expr;
mod projection;
mod request;
mod translator;

pub use error::{QueryError, QueryResult};
pub use expr::{ArithmeticOp, CompareOp, Expr, FieldRef, Literal, call, field, in_folder, in_tree, key, lit, type_is};
pub use projection::Projection;
pub use request::{InlineCount, Method, MetadataFormat, ODataRequest, SaveRequest};
pub use translator::{ContentQuery, QueryCompiler, SortKey};
