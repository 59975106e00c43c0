//! The five-stage refactoring pipeline
//!
//! ```text
//! INITIALIZED -> SCANNED -> AUDITED -> FIXED -> GENERATED -> COMPLETED
//!                   |          |          |         |
//!              SCAN_FAILED  AUDIT_FAILED  |         |
//!                          AUDIT_SKIPPED FIX_SKIPPED GENERATE_SKIPPED
//! ```
//!
//! Stages run one at a time and take the [`PipelineState`] by value. Once a
//! stage of the current iteration has failed, the later work stages skip;
//! the report stage always runs.

use crate::sandbox::Sandbox;
use serde::{Deserialize, Serialize};
use std::fmt;
use swarm_agent::{Auditor, CodeBlockExtractor, Fixer, Generator, InteractionLog, ModelClient};
use swarm_core::{PipelineState, SwarmConfig};
use tracing::debug;

/// One pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Scan,
    Audit,
    Fix,
    Generate,
    Report,
}

impl Stage {
    /// Full pipeline order
    pub const ALL: [Stage; 5] = [
        Stage::Scan,
        Stage::Audit,
        Stage::Fix,
        Stage::Generate,
        Stage::Report,
    ];

    /// Analysis only: nothing is written to the sandbox
    pub const DRY_RUN: [Stage; 3] = [Stage::Scan, Stage::Audit, Stage::Report];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Audit => "audit",
            Stage::Fix => "fix",
            Stage::Generate => "generate",
            Stage::Report => "report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Agents and output locations shared by all stages
pub struct Pipeline {
    pub(crate) auditor: Auditor,
    pub(crate) fixer: Fixer,
    pub(crate) generator: Generator,
    pub(crate) extractor: CodeBlockExtractor,
    pub(crate) sandbox: Sandbox,
    pub(crate) log: InteractionLog,
    pub(crate) source_extension: String,
}

impl Pipeline {
    /// Build the pipeline around one shared model client
    pub fn new(client: ModelClient, config: &SwarmConfig) -> Self {
        let language = config.extraction.fence_language.clone();
        Self {
            auditor: Auditor::new(client.clone()).with_language(language.clone()),
            fixer: Fixer::new(client.clone()).with_language(language.clone()),
            generator: Generator::new(client.clone()).with_language(language.clone()),
            extractor: CodeBlockExtractor::new(&language),
            sandbox: Sandbox::from_config(&config.paths),
            log: client.log().clone(),
            source_extension: config
                .paths
                .source_extension
                .trim_start_matches('.')
                .to_string(),
        }
    }

    /// Redirect sandbox output
    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    /// Run a single stage
    pub async fn run_stage(&self, stage: Stage, state: PipelineState) -> PipelineState {
        debug!("Stage {} (phase {})", stage, state.current_phase);
        match stage {
            Stage::Scan => self.scan(state).await,
            Stage::Audit => self.audit(state).await,
            Stage::Fix => self.fix(state).await,
            Stage::Generate => self.generate(state).await,
            Stage::Report => self.report(state).await,
        }
    }

    /// Run `stages` in order, threading the state through
    pub async fn run_stages(&self, stages: &[Stage], mut state: PipelineState) -> PipelineState {
        for stage in stages {
            state = self.run_stage(*stage, state).await;
        }
        state
    }

    /// Run all five stages once
    pub async fn run_once(&self, state: PipelineState) -> PipelineState {
        self.run_stages(&Stage::ALL, state).await
    }
}
