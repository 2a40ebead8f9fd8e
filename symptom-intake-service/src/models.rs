use intake_flow::{Answer, ConditionView, WizardView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SymptomsRequest {
    pub symptoms: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub choice: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl From<AnswerRequest> for Answer {
    fn from(request: AnswerRequest) -> Self {
        Answer {
            choice: request.choice,
            details: request.details,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub advanced: bool,
    pub view: WizardView,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub session_id: String,
    pub conditions: Vec<ConditionView>,
}
