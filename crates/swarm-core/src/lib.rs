//! # swarm-core
//!
//! Core types for the Refactoring Swarm.
//!
//! The swarm scans a directory of source files, has a language model audit
//! them, fix them and write tests for them, then runs the test suite and
//! repeats until the tests pass or the iteration budget runs out.
//!
//! This crate holds what every other crate shares:
//!
//! - [`SwarmError`] and the crate-wide [`Result`] alias
//! - [`SwarmConfig`], loaded from `.swarm/config.toml`
//! - [`PipelineState`] and its [`Phase`] labels
//! - [`fail_open`] for infrastructure writes that must never abort a run

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::SwarmConfig;
pub use error::{Result, SwarmError};
pub use fail_open::fail_open;
pub use types::*;
