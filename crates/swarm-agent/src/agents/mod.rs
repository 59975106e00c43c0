//! Role agents
//!
//! An agent is a fixed role instruction paired with the shared
//! [`ModelClient`]. Each operation renders a prompt template around its
//! inputs and sends it; the returned text is not interpreted here.

mod auditor;
mod fixer;
mod generator;

pub use auditor::Auditor;
pub use fixer::Fixer;
pub use generator::Generator;

use crate::client::ModelClient;
use swarm_core::{ActionType, Result};

/// A named role bound to the model client
#[derive(Clone)]
pub struct Agent {
    name: &'static str,
    action: ActionType,
    system_prompt: String,
    language: String,
    client: ModelClient,
}

impl Agent {
    pub fn new(
        name: &'static str,
        action: ActionType,
        system_prompt: String,
        client: ModelClient,
    ) -> Self {
        Self {
            name,
            action,
            system_prompt,
            language: "python".to_string(),
            client,
        }
    }

    /// Language tag used for code fences in prompts
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn action(&self) -> ActionType {
        self.action
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Send a rendered prompt under this agent's role
    pub async fn invoke(&self, prompt: &str) -> Result<String> {
        self.client
            .invoke(self.name, self.action, &self.system_prompt, prompt)
            .await
    }

    /// Wrap `content` in a fence tagged with the agent's language
    pub(crate) fn fenced(&self, content: &str) -> String {
        format!("```{}\n{}\n```", self.language, content)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.client.model())
            .finish()
    }
}

pub(crate) fn line_count(content: &str) -> usize {
    content.lines().count()
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("a\nb\n"), 2);
    }

    #[tokio::test]
    async fn test_agent_invoke_uses_role() {
        let temp_dir = TempDir::new().unwrap();
        let (client, transport) = test_support::client("hello", &temp_dir);
        let agent = Agent::new("Tester", ActionType::Debug, "be brief".to_string(), client)
            .with_language("rust");

        assert_eq!(agent.fenced("x"), "```rust\nx\n```");
        assert_eq!(agent.invoke("ping").await.unwrap(), "hello");

        let request = &transport.requests()[0];
        assert_eq!(request.system_prompt(), Some("be brief"));
        assert_eq!(request.user_prompt(), Some("ping"));

        let records = agent.client.log().read_all().await.unwrap();
        assert_eq!(records[0].agent_name, "Tester");
        assert_eq!(records[0].action, ActionType::Debug);
    }
}
