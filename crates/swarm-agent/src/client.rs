//! Model client with bounded rate-limit retry
//!
//! Every call goes through [`ModelClient::invoke`]:
//! - rate-limited attempts are retried after `unit * 2^attempt`
//! - any other error, or running out of attempts, is returned as `Err`
//! - every attempt is written to the interaction log before returning

use crate::interaction_log::InteractionLog;
use crate::transport::ChatTransport;
use crate::types::{ChatMessage, ChatRequest};
use std::sync::Arc;
use std::time::Duration;
use swarm_core::config::{ModelConfig, RetryConfig};
use swarm_core::{ActionType, InteractionStatus, Result, SwarmError};
use tracing::{debug, info, warn};

/// Bounded exponential backoff for rate-limited calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Attempt `n` (1-based) that hits a rate limit waits `unit * 2^n`
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// Delay before retrying after the given failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff_unit())
    }
}

/// Client shared by all role agents
#[derive(Clone)]
pub struct ModelClient {
    transport: Arc<dyn ChatTransport>,
    log: InteractionLog,
    retry: RetryPolicy,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ModelClient {
    /// Create a new client for `model`
    pub fn new(transport: Arc<dyn ChatTransport>, log: InteractionLog, model: impl Into<String>) -> Self {
        Self {
            transport,
            log,
            retry: RetryPolicy::default(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
        }
    }

    /// Create a client from the model and retry sections of the config
    pub fn from_config(
        transport: Arc<dyn ChatTransport>,
        log: InteractionLog,
        model: &ModelConfig,
        retry: &RetryConfig,
    ) -> Self {
        Self::new(transport, log, model.name.clone())
            .with_retry(RetryPolicy::from(retry))
            .with_temperature(model.temperature)
            .with_max_tokens(model.max_tokens)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    /// Send `prompt` under the `system` instruction and return the response text
    pub async fn invoke(
        &self,
        agent_name: &str,
        action: ActionType,
        system: &str,
        prompt: &str,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            "{} invoking {} ({} prompt chars)",
            agent_name,
            self.model,
            prompt.len()
        );

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.transport.complete(&request).await {
                Ok(reply) => {
                    if let Some(usage) = &reply.usage {
                        debug!(
                            "{} call complete ({} prompt tokens, {} completion tokens)",
                            agent_name, usage.prompt_tokens, usage.completion_tokens
                        );
                    }
                    self.log
                        .record(
                            agent_name,
                            &self.model,
                            action,
                            prompt,
                            &reply.content,
                            InteractionStatus::Success,
                        )
                        .await;
                    info!("{} responded ({} chars)", agent_name, reply.content.len());
                    return Ok(reply.content);
                }
                Err(e) => {
                    let message = e.to_string();
                    self.log
                        .record(
                            agent_name,
                            &self.model,
                            action,
                            prompt,
                            &format!("ERROR: {}", message),
                            InteractionStatus::Failure,
                        )
                        .await;

                    if !e.is_rate_limit() {
                        return Err(e);
                    }

                    if attempt >= self.retry.max_attempts {
                        return Err(SwarmError::RetriesExhausted {
                            attempts: attempt,
                            message,
                        });
                    }

                    let wait = self.retry.delay_after(attempt);
                    warn!(
                        "Rate limit hit. Retrying in {:?} (attempt {}/{})",
                        wait, attempt, self.retry.max_attempts
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
