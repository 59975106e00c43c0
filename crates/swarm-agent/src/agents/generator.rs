//! Generator - writes new code: tests, docstrings, utilities

use super::Agent;
use crate::client::ModelClient;
use swarm_core::{ActionType, Result};

const SYSTEM_PROMPT: &str = "\
You write production-quality code: typed, documented, with sensible error handling.

When asked for tests, write pytest unit tests covering the happy path, edge cases,
expected exceptions and invalid input. Import the module under test by its module name.
Put the complete test file in a single fenced code block; explanations go outside it.";

const DEFAULT_CONTEXT: &str = "Automated refactoring project";

/// Agent responsible for generating new code
#[derive(Debug, Clone)]
pub struct Generator {
    agent: Agent,
}

impl Generator {
    pub const NAME: &'static str = "Generator";

    pub fn new(client: ModelClient) -> Self {
        Self {
            agent: Agent::new(
                Self::NAME,
                ActionType::Generation,
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

    /// Generate a unit test file for `content`
    pub async fn generate_tests(&self, file_path: &str, content: &str) -> Result<String> {
        let prompt = format!(
            "Write unit tests for this file.\n\n\
             **Source file**: `{}`\n\n\
             {}\n\n\
             Cover:\n\
             1. Normal cases\n\
             2. Edge cases\n\
             3. Expected errors\n\
             4. Invalid input\n\n\
             Use fixtures where they help. Return the test file in one ```{} code block.",
            file_path,
            self.agent.fenced(content),
            self.agent.language()
        );
        self.agent.invoke(&prompt).await
    }

    /// Add or improve docstrings, returning the whole file
    pub async fn generate_docstrings(&self, file_path: &str, content: &str) -> Result<String> {
        let prompt = format!(
            "Add or improve the docstrings in this file.\n\n\
             **File**: `{}`\n\n\
             {}\n\n\
             Use Google-style docstrings (summary, Args, Returns, Raises, Examples where useful). \
             Return the complete file in one ```{} code block.",
            file_path,
            self.agent.fenced(content),
            self.agent.language()
        );
        self.agent.invoke(&prompt).await
    }

    /// Generate a utility function or class from a description
    pub async fn generate_utility(&self, description: &str, context: &str) -> Result<String> {
        let context = if context.trim().is_empty() {
            DEFAULT_CONTEXT
        } else {
            context
        };
        let prompt = format!(
            "Write a utility function or class.\n\n\
             **Description**: {}\n\n\
             **Project context**: {}\n\n\
             Include type hints, docstrings, error handling and a usage example.",
            description, context
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
    async fn test_generate_tests_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let (client, transport) = test_support::client("```python\ndef test_x(): pass\n```", &temp_dir);
        let generator = Generator::new(client);

        generator
            .generate_tests("proj/calc.py", "def add(a, b): return a + b")
            .await
            .unwrap();

        let request = &transport.requests()[0];
        let prompt = request.user_prompt().unwrap();
        assert!(prompt.contains("**Source file**: `proj/calc.py`"));
        assert!(prompt.contains("def add(a, b)"));
        assert!(request.system_prompt().unwrap().contains("pytest"));

        let records = generator.agent().client.log().read_all().await.unwrap();
        assert_eq!(records[0].action, ActionType::Generation);
    }

    #[tokio::test]
    async fn test_generate_utility_default_context() {
        let temp_dir = TempDir::new().unwrap();
        let (client, transport) = test_support::client("ok", &temp_dir);
        let generator = Generator::new(client);

        generator.generate_utility("Parse ISO dates", "  ").await.unwrap();
        generator.generate_docstrings("a.py", "x = 1").await.unwrap();

        let requests = transport.requests();
        assert!(requests[0]
            .user_prompt()
            .unwrap()
            .contains("**Project context**: Automated refactoring project"));
        assert!(requests[1].user_prompt().unwrap().contains("Google-style"));
    }
}
