//! Repository connection settings (repolink.toml).

use std::path::Path;

use repolink_query::{MetadataFormat, ODataRequest};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

fn default_log_filter() -> String {
    "info".to_string()
}

/// Settings for one repository connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Base URL of the repository, e.g. `https://repo.example.com`.
    pub url: String,
    /// Metadata format requested when a request leaves it at the default.
    #[serde(default)]
    pub metadata: MetadataFormat,
    #[serde(default)]
    pub auto_filters: Option<bool>,
    #[serde(default)]
    pub lifespan_filter: Option<bool>,
    /// `tracing` filter directive used by [`crate::init_logging`].
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl RepositoryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            metadata: MetadataFormat::default(),
            auto_filters: None,
            lifespan_filter: None,
            log_filter: default_log_filter(),
        }
    }

    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> ClientResult<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ClientError::Config("url is required".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Config(format!("url must be http(s): {url}")));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ClientError::Config("log_filter must not be empty".into()));
        }
        Ok(())
    }

    pub fn server_context(&self) -> ServerContext {
        ServerContext {
            url: self.url.trim().trim_end_matches('/').to_string(),
            metadata: self.metadata,
            auto_filters: self.auto_filters,
            lifespan_filter: self.lifespan_filter,
        }
    }
}

/// The per-connection server descriptor passed to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerContext {
    pub url: String,
    pub metadata: MetadataFormat,
    pub auto_filters: Option<bool>,
    pub lifespan_filter: Option<bool>,
}

impl ServerContext {
    /// Fills the request fields the caller left at their defaults.
    pub fn apply(&self, mut request: ODataRequest) -> ODataRequest {
        if request.metadata == MetadataFormat::default() {
            request.metadata = self.metadata;
        }
        request.auto_filters = request.auto_filters.or(self.auto_filters);
        request.lifespan_filter = request.lifespan_filter.or(self.lifespan_filter);
        request
    }

    pub fn url_for(&self, request: ODataRequest) -> ClientResult<String> {
        Ok(self.apply(request).to_url(&self.url)?)
    }
}
