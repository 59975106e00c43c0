//! Fixer - applies corrections described by an audit

use super::{line_count, Agent};
use crate::client::ModelClient;
use swarm_core::{ActionType, Result};

const SYSTEM_PROMPT: &str = "\
You are a careful software engineer who applies minimal, targeted fixes.

Change only what is broken. Keep existing names, structure and imports unless the fix
requires otherwise, stay backwards compatible and do not refactor unrelated code.
Add a short inline comment only where a fix is not obvious.

Answer in markdown: briefly state what was wrong and what you changed, then give the
COMPLETE corrected file in a single fenced code block. The code block must contain the
whole file, not a fragment, and must be valid and runnable.";

/// Agent responsible for producing corrected code
#[derive(Debug, Clone)]
pub struct Fixer {
    agent: Agent,
}

impl Fixer {
    pub const NAME: &'static str = "Fixer";

    pub fn new(client: ModelClient) -> Self {
        Self {
            agent: Agent::new(Self::NAME, ActionType::Fix, SYSTEM_PROMPT.to_string(), client),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.agent = self.agent.with_language(language);
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Fix the issues described in `issue_description`
    pub async fn fix_issue(
        &self,
        file_path: &str,
        content: &str,
        issue_description: &str,
    ) -> Result<String> {
        let prompt = format!(
            "Fix this file.\n\n\
             **File**: `{}`\n\
             **Lines**: {}\n\n\
             **Issues to fix**:\n{}\n\n\
             **Current code**:\n{}\n\n\
             Return the complete corrected file in one ```{} code block.",
            file_path,
            line_count(content),
            issue_description,
            self.agent.fenced(content),
            self.agent.language()
        );
        self.agent.invoke(&prompt).await
    }

    /// Apply a refactoring plan while preserving behavior
    pub async fn apply_refactoring(
        &self,
        file_path: &str,
        content: &str,
        refactoring_plan: &str,
    ) -> Result<String> {
        let prompt = format!(
            "Apply this refactoring.\n\n\
             **File**: `{}`\n\n\
             **Refactoring plan**:\n{}\n\n\
             **Current code**:\n{}\n\n\
             Preserve the observable behavior and return the complete refactored file \
             in one ```{} code block.",
            file_path,
            refactoring_plan,
            self.agent.fenced(content),
            self.agent.language()
        );
        self.agent.invoke(&prompt).await
    }
}
