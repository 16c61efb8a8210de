//! OData request addressing and query-string construction.

use std::fmt;

use repolink_model::{Content, ContentMarshaller};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::projection::Projection;

/// How much metadata the service should include in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFormat {
    /// The service default; not written to the query string.
    #[default]
    Full,
    Minimal,
    None,
}

impl MetadataFormat {
    fn param(self) -> Option<&'static str> {
        match self {
            MetadataFormat::Full => None,
            MetadataFormat::Minimal => Some("minimal"),
            MetadataFormat::None => Some("no"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineCount {
    #[default]
    Default,
    None,
    AllPages,
}

impl InlineCount {
    fn param(self) -> Option<&'static str> {
        match self {
            InlineCount::Default => None,
            InlineCount::None => Some("none"),
            InlineCount::AllPages => Some("allpages"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured fields of one OData request.
///
/// A request addresses exactly one of `content_id` or `path`. An id of
/// zero counts as absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ODataRequest {
    pub content_id: Option<i64>,
    pub path: Option<String>,
    /// Addresses the children of `path` instead of the content itself.
    pub is_collection_request: bool,
    pub action_name: Option<String>,
    pub property_name: Option<String>,
    pub version: Option<String>,
    pub metadata: MetadataFormat,
    pub projection: Projection,
    pub filter: Option<String>,
    pub order_by: Vec<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
    pub inline_count: InlineCount,
    /// Compiled content query text.
    pub content_query: Option<String>,
    pub auto_filters: Option<bool>,
    pub lifespan_filter: Option<bool>,
    /// Free-form parameters, emitted last in insertion order.
    pub parameters: Vec<(String, String)>,
}

impl ODataRequest {
    pub fn for_id(content_id: i64) -> Self {
        Self {
            content_id: Some(content_id),
            ..Self::default()
        }
    }

    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// The children of `path`.
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            is_collection_request: true,
            ..Self::default()
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action_name = Some(action.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property_name = Some(property.into());
        self
    }

    pub fn with_content_query(mut self, query: impl Into<String>) -> Self {
        self.content_query = Some(query.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    fn id(&self) -> Option<i64> {
        self.content_id.filter(|id| *id != 0)
    }

    fn address_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Checks the field combination without building anything.
    pub fn validate(&self) -> QueryResult<()> {
        if self.id().is_some() == self.address_path().is_some() {
            return Err(QueryError::MissingContentAddress);
        }
        if self.action_name.is_some() && self.property_name.is_some() {
            return Err(QueryError::ActionAndProperty);
        }
        Ok(())
    }

    /// The query string, without the leading `?`.
    pub fn build_query_string(&self) -> QueryResult<String> {
        self.validate()?;

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(metadata) = self.metadata.param() {
            params.push(("metadata", metadata.to_string()));
        }
        if let Some(expand) = self.projection.expand_param() {
            params.push(("$expand", expand));
        }
        if let Some(select) = self.projection.select_param() {
            params.push(("$select", select));
        }
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        if !self.order_by.is_empty() {
            params.push(("$orderby", self.order_by.join(",")));
        }
        if let Some(top) = self.top {
            params.push(("$top", top.to_string()));
        }
        if let Some(skip) = self.skip {
            params.push(("$skip", skip.to_string()));
        }
        if let Some(inline_count) = self.inline_count.param() {
            params.push(("$inlinecount", inline_count.to_string()));
        }
        if let Some(query) = &self.content_query {
            params.push(("query", query.clone()));
        }
        if let Some(enabled) = self.auto_filters {
            params.push(("enableautofilters", enabled.to_string()));
        }
        if let Some(enabled) = self.lifespan_filter {
            params.push(("enablelifespanfilter", enabled.to_string()));
        }
        if let Some(version) = &self.version {
            params.push(("version", version.clone()));
        }

        let mut pairs: Vec<String> = params
            .into_iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(&value)))
            .collect();
        pairs.extend(
            self.parameters
                .iter()
                .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))),
        );
        Ok(pairs.join("&"))
    }

    /// The full request URL against `server_url`.
    pub fn to_url(&self, server_url: &str) -> QueryResult<String> {
        let query = self.build_query_string()?;
        let base = format!("{}/OData.svc", server_url.trim_end_matches('/'));

        let mut url = match (self.id(), self.address_path()) {
            (Some(id), _) => format!("{base}/content({id})"),
            (None, Some(path)) if self.is_collection_request => format!("{base}{}", normalize_path(path)),
            (None, Some(path)) => {
                let path = normalize_path(path);
                let (parent, name) = split_path(&path);
                if name.is_empty() {
                    return Err(QueryError::MissingContentAddress);
                }
                format!("{base}{parent}('{}')", name.replace('\'', "''"))
            }
            (None, None) => return Err(QueryError::MissingContentAddress),
        };
        if let Some(suffix) = self.action_name.as_ref().or(self.property_name.as_ref()) {
            url.push('/');
            url.push_str(suffix);
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        debug!(url = %url, "request url built");
        Ok(url)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// `/Root/Sites/x` → (`/Root/Sites`, `x`); `/Root` → (`/`, `Root`).
fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) | None => ("/", path.trim_start_matches('/')),
        Some(index) => (&path[..index], &path[index + 1..]),
    }
}

/// A planned save: method, addressing and body.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub method: Method,
    pub request: ODataRequest,
    pub body: Value,
}

impl SaveRequest {
    /// Plans the save of `content`.
    ///
    /// Existing content is patched at its id (or path). New content is
    /// posted to its parent's children collection.
    pub fn for_content(content: &Content, marshaller: &ContentMarshaller<'_>) -> QueryResult<Self> {
        let (method, request) = if content.is_existing() {
            let request = match (content.id().filter(|id| *id != 0), content.path()) {
                (Some(id), _) => ODataRequest::for_id(id),
                (None, Some(path)) => ODataRequest::for_path(path),
                (None, None) => {
                    return Err(QueryError::UnplannableSave("existing content has neither id nor path".into()));
                }
            };
            (Method::Patch, request)
        } else {
            let parent = content
                .parent_path()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| QueryError::UnplannableSave("new content has no parent path".into()))?;
            (Method::Post, ODataRequest::collection(parent))
        };
        request.validate()?;
        let body = marshaller.to_wire_patch(content)?;
        Ok(Self { method, request, body })
    }
}
