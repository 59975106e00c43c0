//! Transport abstraction over the hosted model endpoint
//!
//! [`HttpTransport`] talks to an OpenAI-compatible `/chat/completions`
//! endpoint. [`MockTransport`] answers from a closure or a script so the
//! client and the pipeline can be exercised without network access.

use crate::auth;
use crate::types::{ChatRequest, ChatResponse, ModelReply};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use swarm_core::config::ModelConfig;
use swarm_core::{Result, SwarmError};
use tracing::debug;

/// Trait for sending one chat completion (allows mocking in tests)
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a single request; no retries happen at this layer
    async fn complete(&self, request: &ChatRequest) -> Result<ModelReply>;
}

/// Real HTTP transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build a transport from configuration, failing if the credential is missing
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = auth::get_api_key(config)?;
        let base_url = auth::resolve_base_url(config);
        Ok(Self::new(base_url, api_key))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<ModelReply> {
        debug!(
            "POST {} (model {}, {} messages)",
            self.completions_url(),
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| SwarmError::Api(format!("Failed to send request: {}", e)))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(SwarmError::RateLimited(error_text));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(SwarmError::Api(format!("{}: {}", status, error_text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SwarmError::Api(format!("Failed to parse response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SwarmError::Api("No content in response".to_string()))?;

        Ok(ModelReply {
            content,
            usage: body.usage,
        })
    }
}

type Handler = Box<dyn Fn(&ChatRequest) -> Result<ModelReply> + Send + Sync>;

/// Mock transport for testing
pub struct MockTransport {
    handler: Handler,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockTransport {
    /// Answer every request with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<ModelReply> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same text
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(ModelReply::text(text.clone())))
    }

    /// Answer requests in order from `script`; extra calls fail
    pub fn sequence(script: Vec<Result<String>>) -> Self {
        let script = Mutex::new(VecDeque::from(script));
        Self::new(move |_| {
            let next = script
                .lock()
                .map_err(|_| SwarmError::Other("mock script poisoned".to_string()))?
                .pop_front();
            match next {
                Some(Ok(text)) => Ok(ModelReply::text(text)),
                Some(Err(e)) => Err(e),
                None => Err(SwarmError::Other("No mock response left".to_string())),
            }
        })
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        (self.handler)(request)
    }
}
