use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::{models::AnalysisRequest, prompts::QuestionPrompt};

/// Failure of an external language-model call.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// Credentials or configuration are missing.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator call failed: {0}")]
    Failed(String),
    #[error("collaborator did not finish after {attempts} status checks")]
    TimedOut { attempts: u32 },
}

impl From<anyhow::Error> for CollaboratorError {
    fn from(err: anyhow::Error) -> Self {
        CollaboratorError::Failed(err.to_string())
    }
}

/// Produces follow-up questions from a prompt that embeds the symptoms.
///
/// The returned text is newline-delimited, one question per non-blank line.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate_questions(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Produces the tagged-record report document for the collected intake data.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate_report(&self, request: &AnalysisRequest) -> Result<String, CollaboratorError>;
}

/// The two external calls the wizard makes, plus how the question prompt is phrased.
#[derive(Clone)]
pub struct Collaborators {
    pub questions: Arc<dyn QuestionGenerator>,
    pub reports: Arc<dyn ReportGenerator>,
    pub question_prompt: QuestionPrompt,
}

impl Collaborators {
    pub fn new(
        questions: Arc<dyn QuestionGenerator>,
        reports: Arc<dyn ReportGenerator>,
    ) -> Self {
        Self {
            questions,
            reports,
            question_prompt: QuestionPrompt::default(),
        }
    }

    pub fn with_question_prompt(mut self, prompt: QuestionPrompt) -> Self {
        self.question_prompt = prompt;
        self
    }
}
