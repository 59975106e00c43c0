//! # swarm-orchestrator
//!
//! Pipeline and loop engine for the Refactoring Swarm.
//!
//! This crate provides:
//! - The five pipeline stages (scan, audit, fix, generate, report)
//! - Sandbox path mapping for fixed files and generated tests
//! - A test runner abstraction (child process, plus a mock)
//! - [`RefactoringSwarm`], the test-and-iterate loop

mod pipeline;
mod sandbox;
mod stages;
mod swarm;
mod test_runner;

pub use pipeline::{Pipeline, Stage};
pub use sandbox::Sandbox;
pub use stages::render_report;
pub use swarm::{RefactoringSwarm, StopReason};
pub use test_runner::{MockTestRunner, ProcessTestRunner, TestOutcome, TestRunner};
