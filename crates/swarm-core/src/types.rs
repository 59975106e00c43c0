//! Core type definitions shared across the swarm

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Phase label recorded in pipeline state after each stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Initialized,
    Scanned,
    ScanFailed,
    Audited,
    AuditSkipped,
    AuditFailed,
    Fixed,
    FixSkipped,
    Generated,
    GenerateSkipped,
    Completed,
}

impl Phase {
    /// Label as written to logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Initialized => "INITIALIZED",
            Phase::Scanned => "SCANNED",
            Phase::ScanFailed => "SCAN_FAILED",
            Phase::Audited => "AUDITED",
            Phase::AuditSkipped => "AUDIT_SKIPPED",
            Phase::AuditFailed => "AUDIT_FAILED",
            Phase::Fixed => "FIXED",
            Phase::FixSkipped => "FIX_SKIPPED",
            Phase::Generated => "GENERATED",
            Phase::GenerateSkipped => "GENERATE_SKIPPED",
            Phase::Completed => "COMPLETED",
        }
    }

    /// Whether the label marks a failed stage
    pub fn is_failed(&self) -> bool {
        self.as_str().contains("FAILED")
    }

    pub fn is_skipped(&self) -> bool {
        self.as_str().contains("SKIPPED")
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State threaded through every pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Directory being refactored; never changes after construction
    pub target_dir: PathBuf,
    /// Source file path -> content, filled by the scan stage
    pub files: BTreeMap<PathBuf, String>,
    /// Latest audit report (or the audit error)
    pub audit_report: String,
    /// Status lines from the most recent fix stage
    pub fixes_applied: Vec<String>,
    /// Test files written by the most recent generate stage
    pub tests_generated: Vec<String>,
    pub current_phase: Phase,
    /// Phases reached during the current iteration, in order
    pub phase_trail: Vec<Phase>,
    /// Append-only error lines
    pub errors: Vec<String>,
    /// Combined test runner output from the latest iteration
    pub tests_output: String,
}

impl PipelineState {
    /// Fresh state for a run over `target_dir`
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            files: BTreeMap::new(),
            audit_report: String::new(),
            fixes_applied: Vec::new(),
            tests_generated: Vec::new(),
            current_phase: Phase::Initialized,
            phase_trail: Vec::new(),
            errors: Vec::new(),
            tests_output: String::new(),
        }
    }

    /// Record the phase reached by a stage
    pub fn enter(&mut self, phase: Phase) {
        self.current_phase = phase;
        self.phase_trail.push(phase);
    }

    /// Clear the per-iteration phase trail
    pub fn begin_iteration(&mut self) {
        self.phase_trail.clear();
    }

    /// Whether any stage of the current iteration failed.
    ///
    /// The report stage always ends on `COMPLETED`, so the trail is what
    /// downstream stages and the iterate loop consult.
    pub fn has_failed(&self) -> bool {
        self.current_phase.is_failed() || self.phase_trail.iter().any(Phase::is_failed)
    }

    /// The failed phase of the current iteration, if any
    pub fn failed_phase(&self) -> Option<Phase> {
        self.phase_trail.iter().copied().find(Phase::is_failed)
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}

/// Kind of action recorded in the interaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Analysis,
    Generation,
    Debug,
    Fix,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Analysis => write!(f, "ANALYSIS"),
            ActionType::Generation => write!(f, "GENERATION"),
            ActionType::Debug => write!(f, "DEBUG"),
            ActionType::Fix => write!(f, "FIX"),
        }
    }
}

/// Outcome tag of a logged interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionStatus {
    Success,
    Failure,
    Partial,
}

impl fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionStatus::Success => write!(f, "SUCCESS"),
            InteractionStatus::Failure => write!(f, "FAILURE"),
            InteractionStatus::Partial => write!(f, "PARTIAL"),
        }
    }
}
