//! Seams to the outside world: HTTP transport and credentials.
//!
//! Neither is implemented here. Callers plug in their HTTP client and
//! token source; tests use [`mock::MockTransport`].

use async_trait::async_trait;
use repolink_query::Method;

/// Sends one request and returns the raw response text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(
        &self,
        url: &str,
        method: Method,
        body: Option<&str>,
        headers: &[(String, String)],
    ) -> anyhow::Result<String>;
}

/// Supplies the `Authorization` header value, if any.
#[async_trait]
pub trait CredentialSupplier: Send + Sync {
    async fn authorization(&self) -> anyhow::Result<Option<String>>;
}

/// A fixed bearer token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialSupplier for StaticToken {
    async fn authorization(&self) -> anyhow::Result<Option<String>> {
        Ok(Some(format!("Bearer {}", self.0)))
    }
}

pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// A request seen by [`MockTransport`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub url: String,
        pub method: Method,
        pub body: Option<String>,
        pub headers: Vec<(String, String)>,
    }

    /// Replays queued responses and records every request.
    #[derive(Debug, Clone, Default)]
    pub struct MockTransport {
        responses: Arc<Mutex<VecDeque<anyhow::Result<String>>>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a successful response body.
        pub fn respond(&self, body: impl Into<String>) -> &Self {
            self.lock_responses().push_back(Ok(body.into()));
            self
        }

        /// Queues a transport failure.
        pub fn fail(&self, message: &str) -> &Self {
            self.lock_responses().push_back(Err(anyhow::anyhow!(message.to_string())));
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().map(|r| r.len()).unwrap_or_default()
        }

        fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<anyhow::Result<String>>> {
            self.responses.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send_request(
            &self,
            url: &str,
            method: Method,
            body: Option<&str>,
            headers: &[(String, String)],
        ) -> anyhow::Result<String> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(RecordedRequest {
                    url: url.to_string(),
                    method,
                    body: body.map(str::to_string),
                    headers: headers.to_vec(),
                });
            }
            self.lock_responses()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no response queued for {method} {url}")))
        }
    }
}
