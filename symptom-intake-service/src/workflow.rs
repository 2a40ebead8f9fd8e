use intake_flow::{
    Collaborators, InMemorySessionStorage, ReportGenerator, SessionStorage, WizardRunner,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    collaborators::{AssistantReportGenerator, ChatReportGenerator, OpenRouterQuestionGenerator},
    config::ServiceConfig,
};

pub fn build_collaborators(config: &ServiceConfig) -> Collaborators {
    let questions = Arc::new(OpenRouterQuestionGenerator::new(
        config.openrouter_api_key.clone(),
        config.question_model.clone(),
    ));

    let reports: Arc<dyn ReportGenerator> = match &config.assistant {
        Some(assistant) => {
            info!(assistant_id = %assistant.assistant_id, "Using assistant runs for analysis reports");
            Arc::new(AssistantReportGenerator::new(
                assistant.clone(),
                config.poll.clone(),
            ))
        }
        None => {
            info!(model = %config.report_model, "Using chat completion for analysis reports");
            Arc::new(ChatReportGenerator::new(
                config.openrouter_api_key.clone(),
                config.report_model.clone(),
            ))
        }
    };

    Collaborators::new(questions, reports).with_question_prompt(config.question_prompt.clone())
}

pub fn create_wizard_runner(config: &ServiceConfig) -> WizardRunner {
    let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
    WizardRunner::new(storage, build_collaborators(config), config.layout.clone())
}
