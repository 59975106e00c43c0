//! External test runner
//!
//! The iterate loop only needs a pass/fail signal and the combined output.
//! [`ProcessTestRunner`] spawns the configured command (pytest by default);
//! [`MockTestRunner`] replays scripted outcomes for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use swarm_core::config::TestRunnerConfig;
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of one test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub passed: bool,
    /// stdout followed by stderr
    pub output: String,
}

impl TestOutcome {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            passed: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            passed: false,
            output: output.into(),
        }
    }
}

/// Trait for running a test suite against a directory (allows mocking in tests)
///
/// A runner never fails: problems starting the suite are reported as a
/// failed outcome.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, target_dir: &Path) -> TestOutcome;
}

/// Runs the test command as a child process
#[derive(Debug, Clone)]
pub struct ProcessTestRunner {
    program: String,
    args: Vec<String>,
    path_env: String,
}

impl ProcessTestRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>, path_env: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            path_env: path_env.into(),
        }
    }

    pub fn from_config(config: &TestRunnerConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            config.path_env.clone(),
        )
    }

    /// Module search path with `target_dir` in front of the inherited value
    fn search_path(&self, target_dir: &Path) -> OsString {
        let mut paths = vec![target_dir.to_path_buf()];
        if let Some(existing) = env::var_os(&self.path_env) {
            paths.extend(env::split_paths(&existing));
        }
        env::join_paths(paths).unwrap_or_else(|_| target_dir.as_os_str().to_os_string())
    }
}

impl Default for ProcessTestRunner {
    fn default() -> Self {
        Self::from_config(&TestRunnerConfig::default())
    }
}

#[async_trait]
impl TestRunner for ProcessTestRunner {
    async fn run(&self, target_dir: &Path) -> TestOutcome {
        debug!(
            "Running {} {} {:?}",
            self.program,
            self.args.join(" "),
            target_dir
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(target_dir)
            .env(&self.path_env, self.search_path(target_dir))
            .output()
            .await;

        match output {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                TestOutcome {
                    passed: output.status.success(),
                    output: combined,
                }
            }
            Err(e) => {
                warn!("Failed to start {}: {}", self.program, e);
                TestOutcome::failed(format!("Test runner error: {}", e))
            }
        }
    }
}

/// Mock runner for testing
pub struct MockTestRunner {
    outcomes: Mutex<VecDeque<TestOutcome>>,
    calls: AtomicUsize,
    targets: Mutex<Vec<PathBuf>>,
}

impl MockTestRunner {
    /// Replay `outcomes` in order; extra runs fail
    pub fn new(outcomes: Vec<TestOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::from(outcomes)),
            calls: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Every run fails
    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Directories passed to every run so far
    pub fn targets(&self) -> Vec<PathBuf> {
        self.targets
            .lock()
            .map(|targets| targets.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TestRunner for MockTestRunner {
    async fn run(&self, target_dir: &Path) -> TestOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut targets) = self.targets.lock() {
            targets.push(target_dir.to_path_buf());
        }
        self.outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front())
            .unwrap_or_else(|| TestOutcome::failed("1 failed"))
    }
}

#[async_trait]
impl<T: TestRunner + ?Sized> TestRunner for std::sync::Arc<T> {
    async fn run(&self, target_dir: &Path) -> TestOutcome {
        (**self).run(target_dir).await
    }
}
