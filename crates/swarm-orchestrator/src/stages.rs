//! Stage implementations

use crate::pipeline::Pipeline;
use std::path::Path;
use swarm_core::{ActionType, InteractionStatus, Phase, PipelineState};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Characters of the audit report shown in the final summary
const AUDIT_EXCERPT_CHARS: usize = 500;

const RULE_WIDTH: usize = 60;
const SECTION_WIDTH: usize = 40;

impl Pipeline {
    /// Load every matching source file under the target directory
    pub async fn scan(&self, mut state: PipelineState) -> PipelineState {
        state.files.clear();

        let root = state.target_dir.clone();
        let root_is_dir = tokio::fs::metadata(&root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !root_is_dir {
            state.push_error(format!("Directory not found: {}", root.display()));
            state.enter(Phase::ScanFailed);
            return state;
        }

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root.as_path()).display().to_string();
                    warn!("Skipping {}: {}", path, e);
                    state.push_error(format!("Failed to read {}: {}", path, e));
                    continue;
                }
            };

            if !entry.path().is_file() || !self.is_source_file(entry.path()) {
                continue;
            }

            let path = entry.into_path();
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    state.files.insert(path, content);
                }
                Err(e) => {
                    warn!("Failed to read {:?}: {}", path, e);
                    state.push_error(format!("Failed to read {}: {}", path.display(), e));
                }
            }
        }

        println!("SCAN: Loaded {} file(s)", state.files.len());
        state.enter(Phase::Scanned);
        state
    }

    /// One Auditor call over the whole file set
    pub async fn audit(&self, mut state: PipelineState) -> PipelineState {
        if state.has_failed() || state.files.is_empty() {
            state.audit_report = "No files to audit".to_string();
            state.enter(Phase::AuditSkipped);
            return state;
        }

        println!("AUDIT: Analyzing {} file(s)...", state.files.len());
        match self.auditor.analyze_directory(&state.files).await {
            Ok(report) => {
                println!("AUDIT: Complete");
                state.audit_report = report;
                state.enter(Phase::Audited);
            }
            Err(e) => {
                let message = format!("Audit failed: {}", e);
                warn!("{}", message);
                state.audit_report = message.clone();
                state.push_error(message);
                state.enter(Phase::AuditFailed);
            }
        }
        state
    }

    /// Ask the Fixer for a corrected version of every file and save it to the sandbox
    pub async fn fix(&self, mut state: PipelineState) -> PipelineState {
        if state.has_failed() {
            state.fixes_applied.clear();
            state.enter(Phase::FixSkipped);
            return state;
        }

        println!("FIX: Applying corrections...");
        let issue_description = format!(
            "Based on audit report:\n{}\n\nFix any issues found in this file.",
            state.audit_report
        );

        let mut fixes_applied = Vec::new();
        let mut errors = Vec::new();

        for (path, content) in &state.files {
            let file_label = path.display().to_string();
            let response = match self
                .fixer
                .fix_issue(&file_label, content, &issue_description)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!("Fix failed for {}: {}", file_label, e);
                    errors.push(format!("Fix failed for {}: {}", file_label, e));
                    continue;
                }
            };
            fixes_applied.push(format!("Fixed: {}", file_label));

            let Some(code) = self.extractor.extract(&response).into_code() else {
                warn!("No code block in fix for {}", file_label);
                continue;
            };

            let sandbox_path = self.sandbox.mirror_path(&state.target_dir, path);
            match self.sandbox.write(&sandbox_path, &code).await {
                Ok(()) => fixes_applied.push(format!("Saved to: {}", sandbox_path.display())),
                Err(e) => {
                    warn!("Fix failed for {}: {}", file_label, e);
                    errors.push(format!("Fix failed for {}: {}", file_label, e));
                }
            }
        }

        println!("FIX: Applied {} correction(s)", fixes_applied.len());
        state.fixes_applied = fixes_applied;
        state.errors.extend(errors);
        state.enter(Phase::Fixed);
        state
    }

    /// Generate a test file for every non-test source file
    pub async fn generate(&self, mut state: PipelineState) -> PipelineState {
        if state.has_failed() {
            state.tests_generated.clear();
            state.enter(Phase::GenerateSkipped);
            return state;
        }

        println!("GENERATE: Creating tests...");
        let mut tests_generated = Vec::new();
        let mut errors = Vec::new();

        for (path, content) in &state.files {
            if !needs_tests(path) {
                continue;
            }
            let file_label = path.display().to_string();

            let response = match self.generator.generate_tests(&file_label, content).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Test generation failed for {}: {}", file_label, e);
                    errors.push(format!("Test generation failed for {}: {}", file_label, e));
                    continue;
                }
            };

            let Some(code) = self.extractor.extract(&response).into_code() else {
                warn!("No code block in generated tests for {}", file_label);
                continue;
            };

            let test_path = self.sandbox.test_path(path);
            match self.sandbox.write(&test_path, &code).await {
                Ok(()) => tests_generated.push(test_path.display().to_string()),
                Err(e) => {
                    warn!("Test generation failed for {}: {}", file_label, e);
                    errors.push(format!("Test generation failed for {}: {}", file_label, e));
                }
            }
        }

        println!("GENERATE: Created {} test file(s)", tests_generated.len());
        state.tests_generated = tests_generated;
        state.errors.extend(errors);
        state.enter(Phase::Generated);
        state
    }

    /// Print and log the summary; always ends in `COMPLETED`
    pub async fn report(&self, mut state: PipelineState) -> PipelineState {
        let report = render_report(&state);

        println!("\n{}", "=".repeat(RULE_WIDTH));
        println!("REFACTORING SWARM - FINAL REPORT");
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("{}", report);
        println!("{}", "=".repeat(RULE_WIDTH));

        let status = if state.errors.is_empty() {
            InteractionStatus::Success
        } else {
            InteractionStatus::Partial
        };
        self.log
            .record(
                "Orchestrator",
                "N/A",
                ActionType::Analysis,
                &format!("Swarm execution on {}", state.target_dir.display()),
                &report,
                status,
            )
            .await;

        info!(
            "Report: {} file(s), {} fix line(s), {} test file(s), {} error(s)",
            state.files.len(),
            state.fixes_applied.len(),
            state.tests_generated.len(),
            state.errors.len()
        );
        state.enter(Phase::Completed);
        state
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy() == self.source_extension.as_str())
            .unwrap_or(false)
    }
}

/// Package markers and existing test modules get no generated tests
fn needs_tests(path: &Path) -> bool {
    let is_init = path.file_stem().is_some_and(|stem| stem == "__init__");
    let is_test = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with("test_"));
    !is_init && !is_test
}

/// Summary text written by the report stage
pub fn render_report(state: &PipelineState) -> String {
    let mut lines = vec![
        format!("Files analyzed: {}", state.files.len()),
        format!("Fixes applied: {}", state.fixes_applied.len()),
        format!("Tests generated: {}", state.tests_generated.len()),
        format!("Errors: {}", state.errors.len()),
        String::new(),
        "AUDIT REPORT:".to_string(),
        "-".repeat(SECTION_WIDTH),
        audit_excerpt(&state.audit_report),
    ];

    if !state.errors.is_empty() {
        lines.push(String::new());
        lines.push("ERRORS:".to_string());
        lines.push("-".repeat(SECTION_WIDTH));
        lines.extend(state.errors.iter().cloned());
    }

    lines.join("\n")
}

fn audit_excerpt(report: &str) -> String {
    if report.chars().count() > AUDIT_EXCERPT_CHARS {
        let excerpt: String = report.chars().take(AUDIT_EXCERPT_CHARS).collect();
        format!("{}...", excerpt)
    } else {
        report.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::Sandbox;
    use std::sync::Arc;
    use std::time::Duration;
    use swarm_agent::{InteractionLog, MockTransport, ModelClient, RetryPolicy};
    use swarm_core::{SwarmConfig, SwarmError};
    use tempfile::TempDir;

    fn pipeline(transport: Arc<MockTransport>, temp_dir: &TempDir) -> Pipeline {
        let log = InteractionLog::new(temp_dir.path().join("log.jsonl"));
        let client = ModelClient::new(transport, log, "test-model")
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));
        Pipeline::new(client, &SwarmConfig::default())
            .with_sandbox(Sandbox::new(temp_dir.path().join("sandbox"), "tests"))
    }

    fn target_with(temp_dir: &TempDir, files: &[(&str, &str)]) -> std::path::PathBuf {
        let target = temp_dir.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        for (name, content) in files {
            let path = target.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
        target
    }

    #[tokio::test]
    async fn test_scan_filters_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_with(
            &temp_dir,
            &[("a.py", "x = 1"), ("notes.txt", "hi"), ("pkg/b.py", "y = 2")],
        );
        let pipeline = pipeline(Arc::new(MockTransport::always("")), &temp_dir);

        let state = pipeline.scan(PipelineState::new(&target)).await;

        assert_eq!(state.current_phase, Phase::Scanned);
        let names: Vec<_> = state.files.keys().cloned().collect();
        assert_eq!(names, vec![target.join("a.py"), target.join("pkg/b.py")]);
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(MockTransport::always("")), &temp_dir);

        let state = pipeline
            .scan(PipelineState::new(temp_dir.path().join("nope")))
            .await;

        assert_eq!(state.current_phase, Phase::ScanFailed);
        assert!(state.errors[0].starts_with("Directory not found:"));
    }

    #[tokio::test]
    async fn test_audit_skips_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::always("report"));
        let pipeline = pipeline(transport.clone(), &temp_dir);

        let state = pipeline.audit(PipelineState::new(temp_dir.path())).await;

        assert_eq!(state.current_phase, Phase::AuditSkipped);
        assert_eq!(state.audit_report, "No files to audit");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_audit_failure_skips_later_stages() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_with(&temp_dir, &[("a.py", "x = 1")]);
        let transport = Arc::new(MockTransport::sequence(vec![Err(SwarmError::Api(
            "500: boom".to_string(),
        ))]));
        let pipeline = pipeline(transport.clone(), &temp_dir);

        let mut state = PipelineState::new(&target);
        state.begin_iteration();
        let state = pipeline.run_once(state).await;

        assert_eq!(state.failed_phase(), Some(Phase::AuditFailed));
        assert!(state.audit_report.starts_with("Audit failed:"));
        assert_eq!(
            state.phase_trail,
            vec![
                Phase::Scanned,
                Phase::AuditFailed,
                Phase::FixSkipped,
                Phase::GenerateSkipped,
                Phase::Completed
            ]
        );
        assert_eq!(transport.calls(), 1);
        assert!(state.fixes_applied.is_empty());
    }

    #[tokio::test]
    async fn test_fix_without_code_block_records_only_fixed() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_with(&temp_dir, &[("a.py", "x = 1")]);
        let pipeline = pipeline(Arc::new(MockTransport::always("no code here")), &temp_dir);

        let mut state = pipeline.scan(PipelineState::new(&target)).await;
        state.audit_report = "issues".to_string();
        let state = pipeline.fix(state).await;

        assert_eq!(state.current_phase, Phase::Fixed);
        assert_eq!(
            state.fixes_applied,
            vec![format!("Fixed: {}", target.join("a.py").display())]
        );
        assert!(!temp_dir.path().join("sandbox/a.py").exists());
    }

    #[tokio::test]
    async fn test_generate_skips_test_and_init_files() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_with(
            &temp_dir,
            &[
                ("__init__.py", ""),
                ("test_existing.py", "def test(): pass"),
                ("calc.py", "def add(a, b): return a + b"),
            ],
        );
        let transport = Arc::new(MockTransport::always("```python\ndef test_add(): pass\n```"));
        let pipeline = pipeline(transport.clone(), &temp_dir);

        let state = pipeline.scan(PipelineState::new(&target)).await;
        let state = pipeline.generate(state).await;

        assert_eq!(transport.calls(), 1);
        let expected = temp_dir.path().join("sandbox/tests/test_calc.py");
        assert_eq!(state.tests_generated, vec![expected.display().to_string()]);
        assert_eq!(
            std::fs::read_to_string(expected).unwrap(),
            "def test_add(): pass"
        );
    }

    #[tokio::test]
    async fn test_generate_covers_names_containing_test() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_with(
            &temp_dir,
            &[
                ("latest_news.py", "HEADLINE = 'x'"),
                ("my_test_utils.py", "def helper(): pass"),
                ("pkg/__init__.py", ""),
            ],
        );
        let transport = Arc::new(MockTransport::always("```python\ndef test_it(): pass\n```"));
        let pipeline = pipeline(transport.clone(), &temp_dir);

        let state = pipeline.scan(PipelineState::new(&target)).await;
        let state = pipeline.generate(state).await;

        assert_eq!(transport.calls(), 2);
        let tests_dir = temp_dir.path().join("sandbox/tests");
        assert_eq!(
            state.tests_generated,
            vec![
                tests_dir.join("test_latest_news.py").display().to_string(),
                tests_dir.join("test_my_test_utils.py").display().to_string(),
            ]
        );
    }

    #[test]
    fn test_needs_tests() {
        assert!(needs_tests(Path::new("proj/latest_news.py")));
        assert!(needs_tests(Path::new("test_dir/calc.py")));
        assert!(!needs_tests(Path::new("proj/test_calc.py")));
        assert!(!needs_tests(Path::new("proj/pkg/__init__.py")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_reads_symlinked_files() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_with(&temp_dir, &[("a.py", "x = 1")]);
        let outside = temp_dir.path().join("shared.py");
        std::fs::write(&outside, "y = 2").unwrap();
        std::os::unix::fs::symlink(&outside, target.join("linked.py")).unwrap();
        let pipeline = pipeline(Arc::new(MockTransport::always("")), &temp_dir);

        let state = pipeline.scan(PipelineState::new(&target)).await;

        assert_eq!(state.files.len(), 2);
        assert_eq!(
            state.files.get(&target.join("linked.py")).map(String::as_str),
            Some("y = 2")
        );
    }

    #[tokio::test]
    async fn test_report_logs_partial_when_errors() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::new(MockTransport::always("")), &temp_dir);

        let mut state = PipelineState::new(temp_dir.path());
        state.push_error("Fix failed for a.py: boom");
        let state = pipeline.report(state).await;

        assert_eq!(state.current_phase, Phase::Completed);
        let records = pipeline.log().read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_name, "Orchestrator");
        assert_eq!(records[0].model_used, "N/A");
        assert_eq!(records[0].status, InteractionStatus::Partial);
        assert!(records[0].output_response.contains("Fix failed for a.py: boom"));
    }

    #[test]
    fn test_render_report_truncates_audit() {
        let mut state = PipelineState::new("proj");
        state.audit_report = "a".repeat(600);

        let report = render_report(&state);

        assert!(report.contains("Files analyzed: 0"));
        assert!(report.contains(&format!("{}...", "a".repeat(500))));
        assert!(!report.contains(&"a".repeat(501)));
        assert!(!report.contains("ERRORS:"));
    }

    #[test]
    fn test_render_report_short_audit_untouched() {
        let mut state = PipelineState::new("proj");
        state.audit_report = "All good".to_string();
        state.push_error("Directory not found: proj");

        let report = render_report(&state);

        assert!(report.contains("-\nAll good\n"));
        assert!(report.contains("ERRORS:"));
        assert!(report.ends_with("Directory not found: proj"));
    }
}
