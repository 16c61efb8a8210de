//! Repository facade: wires the marshaller, compiler and request builder
//! to a [`Transport`].
//!
//! Every operation validates and compiles before anything is sent, so a
//! malformed request never reaches the transport.

use repolink_model::{Content, ContentMarshaller, ContentPage, ContentTypeRegistry, TypeHandle, unwrap_entity};
use repolink_query::{ContentQuery, InlineCount, Method, ODataRequest, Projection, QueryCompiler, SaveRequest};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ServerContext;
use crate::error::{ClientError, ClientResult};
use crate::transport::{CredentialSupplier, Transport};

/// One repository connection.
pub struct Repository<T: Transport> {
    context: ServerContext,
    registry: ContentTypeRegistry,
    transport: T,
    credentials: Option<Box<dyn CredentialSupplier>>,
}

impl<T: Transport> Repository<T> {
    /// `registry` should be fully populated; it is read-only from here on.
    pub fn new(context: ServerContext, registry: ContentTypeRegistry, transport: T) -> Self {
        Self {
            context,
            registry,
            transport,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: impl CredentialSupplier + 'static) -> Self {
        self.credentials = Some(Box::new(credentials));
        self
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    pub fn registry(&self) -> &ContentTypeRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn marshaller(&self) -> ContentMarshaller<'_> {
        ContentMarshaller::new(&self.registry)
    }

    /// A new, unsaved content to be created under `parent_path`.
    pub fn new_content(&self, parent_path: &str, type_name: &str) -> Content {
        self.marshaller().new_content(parent_path, type_name)
    }

    pub async fn load(&self, request: ODataRequest) -> ClientResult<Content> {
        self.load_as(request, None).await
    }

    /// Loads one content, preferring `target` for polymorphic payloads.
    pub async fn load_as(&self, request: ODataRequest, target: Option<&TypeHandle>) -> ClientResult<Content> {
        let url = self.context.url_for(request)?;
        let wire = self.send_json(&url, Method::Get, None).await?;
        Ok(self.marshaller().load_content(&wire, target)?)
    }

    pub async fn load_collection(
        &self,
        request: ODataRequest,
        target: Option<&TypeHandle>,
    ) -> ClientResult<ContentPage> {
        let url = self.context.url_for(request)?;
        let wire = self.send_json(&url, Method::Get, None).await?;
        Ok(self.marshaller().load_collection(&wire, target)?)
    }

    /// Runs a content query below `root_path`.
    pub async fn query(
        &self,
        root_path: &str,
        query: &ContentQuery,
        projection: &Projection,
    ) -> ClientResult<ContentPage> {
        let text = QueryCompiler::new(&self.registry).compile(query)?;
        let request = ODataRequest {
            inline_count: InlineCount::AllPages,
            ..ODataRequest::collection(root_path)
                .with_projection(projection.clone())
                .with_content_query(text)
        };
        let page = self.load_collection(request, query.of_type.as_ref()).await?;
        info!(root = root_path, count = page.items.len(), total = ?page.total, "query executed");
        Ok(page)
    }

    /// Creates or updates `content` and records its new identity.
    pub async fn save(&self, content: &mut Content) -> ClientResult<()> {
        let plan = SaveRequest::for_content(content, &self.marshaller())?;
        let url = self.context.url_for(plan.request)?;
        let body = serde_json::to_string(&plan.body)?;
        let response = self.send(&url, plan.method, Some(&body)).await?;

        let (id, path) = if response.trim().is_empty() {
            (None, None)
        } else {
            let wire: Value = serde_json::from_str(&response)?;
            let entity = unwrap_entity(&wire);
            (
                entity.get("Id").and_then(Value::as_i64),
                entity.get("Path").and_then(Value::as_str).map(str::to_string),
            )
        };
        content.mark_saved(id, path);
        info!(method = %plan.method, id = ?content.id(), "content saved");
        Ok(())
    }

    pub async fn delete(&self, content_id: i64) -> ClientResult<()> {
        let url = self.context.url_for(ODataRequest::for_id(content_id))?;
        self.send(&url, Method::Delete, None).await?;
        info!(id = content_id, "content deleted");
        Ok(())
    }

    async fn send_json(&self, url: &str, method: Method, body: Option<&str>) -> ClientResult<Value> {
        let response = self.send(url, method, body).await?;
        Ok(serde_json::from_str(&response)?)
    }

    async fn send(&self, url: &str, method: Method, body: Option<&str>) -> ClientResult<String> {
        let mut headers = Vec::new();
        if let Some(credentials) = &self.credentials {
            if let Some(value) = credentials.authorization().await.map_err(ClientError::Credentials)? {
                headers.push(("Authorization".to_string(), value));
            }
        }
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        debug!(%method, url, "sending request");
        self.transport
            .send_request(url, method, body, &headers)
            .await
            .map_err(ClientError::Transport)
    }
}
