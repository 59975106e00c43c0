//! Auditor - reviews source files and reports problems

use super::{line_count, Agent};
use crate::client::ModelClient;
use std::collections::BTreeMap;
use std::path::PathBuf;
use swarm_core::{ActionType, Result};

const SYSTEM_PROMPT: &str = "\
You are a senior code auditor. Review the code you are given and report concrete problems:
bugs and logic errors, unhandled edge cases, security issues, performance problems,
code smells and design issues.

For every finding give the file, the line(s), a severity (CRITICAL, HIGH, MEDIUM, LOW),
what goes wrong and the exact change that fixes it. Group findings by file and finish
with a short prioritized list of recommendations. Answer in markdown. Do not praise;
only report what should change.";

/// Agent responsible for static analysis
#[derive(Debug, Clone)]
pub struct Auditor {
    agent: Agent,
}

impl Auditor {
    pub const NAME: &'static str = "Auditor";

    pub fn new(client: ModelClient) -> Self {
        Self {
            agent: Agent::new(
                Self::NAME,
                ActionType::Analysis,
                SYSTEM_PROMPT.to_string(),
                client,
            ),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.agent = self.agent.with_language(language);
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Audit a single file
    pub async fn analyze_file(&self, file_path: &str, content: &str) -> Result<String> {
        let prompt = format!(
            "Audit this file.\n\n\
             **File**: `{}`\n\
             **Lines**: {}\n\n\
             {}\n\n\
             Report every issue with its line number, severity and a concrete fix.",
            file_path,
            line_count(content),
            self.agent.fenced(content)
        );
        self.agent.invoke(&prompt).await
    }

    /// Audit a whole file set in one call, including cross-file issues
    pub async fn analyze_directory(&self, files: &BTreeMap<PathBuf, String>) -> Result<String> {
        let total_lines: usize = files.values().map(|c| line_count(c)).sum();

        let files_section = files
            .iter()
            .map(|(path, content)| {
                format!(
                    "### File: `{}` ({} lines)\n{}",
                    path.display(),
                    line_count(content),
                    self.agent.fenced(content)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Audit this project.\n\n\
             **Total files**: {}\n\
             **Total lines**: {}\n\n\
             {}\n\n\
             Report issues per file, then a separate \"Cross-File Issues\" section \
             (duplication, coupling, inconsistent error handling, circular imports), \
             then prioritized recommendations. Be thorough: automated fixes are based on this report.",
            files.len(),
            total_lines,
            files_section
        );
        self.agent.invoke(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_analyze_directory_embeds_every_file() {
        let temp_dir = TempDir::new().unwrap();
        let (client, transport) = test_support::client("## AUDIT REPORT", &temp_dir);
        let auditor = Auditor::new(client);

        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("proj/a.py"), "x = 1\ny = 2\n".to_string());
        files.insert(PathBuf::from("proj/b.py"), "z = 3\n".to_string());

        let report = auditor.analyze_directory(&files).await.unwrap();
        assert_eq!(report, "## AUDIT REPORT");
        assert_eq!(transport.calls(), 1);

        let request = &transport.requests()[0];
        let prompt = request.user_prompt().unwrap();
        assert!(prompt.contains("**Total files**: 2"));
        assert!(prompt.contains("**Total lines**: 3"));
        assert!(prompt.contains("### File: `proj/a.py` (2 lines)"));
        assert!(prompt.contains("```python\nz = 3\n\n```"));
        assert!(request.system_prompt().unwrap().contains("code auditor"));
    }

    #[tokio::test]
    async fn test_analyze_file() {
        let temp_dir = TempDir::new().unwrap();
        let (client, transport) = test_support::client("ok", &temp_dir);
        let auditor = Auditor::new(client);

        auditor.analyze_file("a.py", "print(1)").await.unwrap();

        let prompt = transport.requests()[0].user_prompt().unwrap().to_string();
        assert!(prompt.contains("**File**: `a.py`"));
        assert!(prompt.contains("**Lines**: 1"));
    }
}
