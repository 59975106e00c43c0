//! Unified error types for the swarm

use thiserror::Error;

/// Unified error type for all swarm operations
#[derive(Error, Debug)]
pub enum SwarmError {
    // Startup errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Target directory not found: {0}")]
    TargetNotFound(String),

    // Model endpoint errors
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited (429): {0}")]
    RateLimited(String),

    #[error("Rate limit exceeded after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    // Pipeline errors
    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Test runner error: {0}")]
    TestRunner(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl SwarmError {
    /// Whether this error carries a rate-limit signature.
    ///
    /// Besides the dedicated variant, any message mentioning `429` or a
    /// quota counts, since proxies in front of the endpoint do not always
    /// preserve the status code.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            SwarmError::RateLimited(_) => true,
            SwarmError::RetriesExhausted { .. } => false,
            other => {
                let message = other.to_string();
                message.contains("429") || message.to_lowercase().contains("quota")
            }
        }
    }
}

/// Result type alias using SwarmError
pub type Result<T> = std::result::Result<T, SwarmError>;
