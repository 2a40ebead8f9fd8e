use async_trait::async_trait;
use intake_flow::{CollaboratorError, QuestionGenerator};
use rig::completion::Prompt;
use tracing::{error, info};

use super::utils::{AgentSettings, get_llm_agent};

const PREAMBLE: &str = "You are a medical intake assistant. Reply with the numbered follow-up questions only, one per line, and no other text.";

/// Question generation through a single chat completion.
pub struct OpenRouterQuestionGenerator {
    api_key: Option<String>,
    settings: AgentSettings,
}

impl OpenRouterQuestionGenerator {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            settings: AgentSettings {
                model: model.into(),
                temperature: 0.6,
                max_tokens: 200,
            },
        }
    }
}

#[async_trait]
impl QuestionGenerator for OpenRouterQuestionGenerator {
    async fn generate_questions(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let agent = get_llm_agent(self.api_key.as_deref(), &self.settings, PREAMBLE)?;

        info!(model = %self.settings.model, "Requesting follow-up questions");
        let response = agent.prompt(prompt).await.map_err(|e| {
            error!("Question generation request failed: {}", e);
            CollaboratorError::Failed(e.to_string())
        })?;

        info!(lines = response.lines().count(), "Received follow-up questions");
        Ok(response)
    }
}
