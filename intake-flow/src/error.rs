use thiserror::Error;

/// Message shown when the question generation call fails.
pub const QUESTIONS_FAILED_MESSAGE: &str =
    "There was an error generating questions. Please try again.";
/// Message shown when the report generation call fails.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "There was an error analyzing your symptoms. Please try again.";
/// Message shown when the report generation call does not finish in time.
pub const ANALYSIS_TIMED_OUT_MESSAGE: &str = "The analysis timed out. Please try again.";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Step '{0}' is incomplete")]
    StepIncomplete(&'static str),

    #[error("A request is already in progress for this session")]
    Busy,

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Navigation locked: {0}")]
    NavigationLocked(String),

    #[error("Answer index {index} is out of range for {count} questions")]
    AnswerOutOfRange { index: usize, count: usize },

    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("Question generation failed: {0}")]
    QuestionGenerationFailed(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Analysis timed out after {attempts} status checks")]
    AnalysisTimedOut { attempts: u32 },

    #[error("No analysis report is available yet")]
    ReportUnavailable,

    #[error("Result discarded: {0}")]
    StaleResult(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl IntakeError {
    /// Flat message suitable for showing to the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            IntakeError::QuestionGenerationFailed(_) => QUESTIONS_FAILED_MESSAGE.to_string(),
            IntakeError::AnalysisFailed(_) => ANALYSIS_FAILED_MESSAGE.to_string(),
            IntakeError::AnalysisTimedOut { .. } => ANALYSIS_TIMED_OUT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// True for failures of the external collaborators, which leave the wizard
    /// on its current step so the call can be retried.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            IntakeError::QuestionGenerationFailed(_)
                | IntakeError::AnalysisFailed(_)
                | IntakeError::AnalysisTimedOut { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;
