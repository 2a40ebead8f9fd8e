use async_trait::async_trait;
use intake_flow::{AnalysisRequest, CollaboratorError, ReportGenerator, analysis_prompt};
use rig::completion::Prompt;
use tracing::{error, info};

use super::utils::{AgentSettings, get_llm_agent};

const PREAMBLE: &str = "You are a medical AI assistant producing differential-diagnosis reports. Answer only with the requested <report> document.";

/// Report generation through a single chat completion, used when no assistant is configured.
pub struct ChatReportGenerator {
    api_key: Option<String>,
    settings: AgentSettings,
}

impl ChatReportGenerator {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            settings: AgentSettings {
                model: model.into(),
                temperature: 0.2,
                max_tokens: 2000,
            },
        }
    }
}

#[async_trait]
impl ReportGenerator for ChatReportGenerator {
    async fn generate_report(&self, request: &AnalysisRequest) -> Result<String, CollaboratorError> {
        let agent = get_llm_agent(self.api_key.as_deref(), &self.settings, PREAMBLE)?;
        let prompt = analysis_prompt(request);

        info!(model = %self.settings.model, "Requesting analysis report");
        let report = agent.prompt(&prompt).await.map_err(|e| {
            error!("Report request failed: {}", e);
            CollaboratorError::Failed(e.to_string())
        })?;

        info!(length = report.len(), "Received analysis report");
        Ok(report)
    }
}
