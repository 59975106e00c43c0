//! # swarm-agent
//!
//! Language-model side of the Refactoring Swarm.
//!
//! This crate provides:
//! - An OpenAI-compatible chat transport (HTTP, plus a mock for tests)
//! - [`ModelClient`] with bounded retry on rate limits
//! - The append-only [`InteractionLog`]
//! - Role agents: [`Auditor`], [`Fixer`], [`Generator`]
//! - Fenced code-block extraction from free-text responses
//!
//! ## Key Pattern
//!
//! Agents are stateless. Every call sends a fixed role instruction plus a
//! freshly rendered prompt; nothing is carried between calls except what
//! the pipeline puts into the next prompt.

pub mod agents;
mod auth;
mod client;
pub mod extract;
mod interaction_log;
mod transport;
mod types;

pub use agents::{Agent, Auditor, Fixer, Generator};
pub use auth::{get_api_key, resolve_base_url};
pub use client::{ModelClient, RetryPolicy};
pub use extract::{extract_code_block, CodeBlockExtractor, Extraction, MissingFence};
pub use interaction_log::{InteractionLog, InteractionRecord};
pub use transport::{ChatTransport, HttpTransport, MockTransport};
pub use types::*;
