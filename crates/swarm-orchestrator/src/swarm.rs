//! Test-and-iterate loop
//!
//! Each iteration runs the full pipeline, then the external test suite
//! against the target directory. The loop stops on the first passing run,
//! on an iteration whose pipeline failed, or when the budget is spent.
//! A failing run is recorded in the returned state, never raised.

use crate::pipeline::{Pipeline, Stage};
use crate::test_runner::TestRunner;
use std::path::Path;
use swarm_core::PipelineState;
use tracing::{info, warn};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TestsPassed,
    PipelineFailed,
    MaxIterations,
}

/// Pipeline plus test runner
pub struct RefactoringSwarm<R: TestRunner> {
    pipeline: Pipeline,
    runner: R,
}

impl<R: TestRunner> RefactoringSwarm<R> {
    pub fn new(pipeline: Pipeline, runner: R) -> Self {
        Self { pipeline, runner }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run up to `max_iterations` pipeline + test cycles over `target_dir`
    pub async fn run(&self, target_dir: &Path, max_iterations: usize) -> PipelineState {
        let (state, reason) = self.run_with_reason(target_dir, max_iterations).await;
        info!("Loop stopped: {:?}", reason);
        state
    }

    /// Like [`run`](Self::run), also reporting why the loop stopped
    pub async fn run_with_reason(
        &self,
        target_dir: &Path,
        max_iterations: usize,
    ) -> (PipelineState, StopReason) {
        let mut state = PipelineState::new(target_dir);
        println!("\nREFACTORING SWARM - Starting on: {}\n", target_dir.display());

        for iteration in 1..=max_iterations {
            println!("\n=== ITERATION {}/{} ===", iteration, max_iterations);
            info!("=== Iteration {} of {} ===", iteration, max_iterations);

            state.begin_iteration();
            state = self.pipeline.run_once(state).await;

            let outcome = self.runner.run(&state.target_dir).await;
            state.tests_output = outcome.output;

            if outcome.passed {
                println!("Tests passed. Stopping loop.");
                return (state, StopReason::TestsPassed);
            }

            println!("Tests failed. Attempting another fix cycle...");

            if let Some(phase) = state.failed_phase() {
                warn!("Iteration {} failed at {}", iteration, phase);
                state.push_error("Pipeline failed before tests could pass.");
                return (state, StopReason::PipelineFailed);
            }
        }

        state.push_error(format!(
            "Reached max iterations ({}) without passing tests.",
            max_iterations
        ));
        (state, StopReason::MaxIterations)
    }

    /// Scan, audit and report once; nothing is written and no tests run
    pub async fn dry_run(&self, target_dir: &Path) -> PipelineState {
        println!("\nREFACTORING SWARM - Dry run on: {}\n", target_dir.display());
        let mut state = PipelineState::new(target_dir);
        state.begin_iteration();
        self.pipeline.run_stages(&Stage::DRY_RUN, state).await
    }
}
