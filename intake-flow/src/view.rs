//! Serialisable snapshot of what the wizard shows for its current step.

use serde::Serialize;

use crate::{
    models::{Answer, PatientInfo},
    report::{ConditionView, render_interactive},
    session::IntakeSession,
    steps::{IntakeStage, Step},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Done,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub title: &'static str,
    pub state: ProgressState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewItem {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisAction {
    NewPatient,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepContent {
    Intake {
        stage: IntakeStage,
        patient: PatientInfo,
    },
    Symptoms {
        symptoms: String,
    },
    Question {
        index: usize,
        number: usize,
        of: usize,
        text: String,
        yes_no: bool,
        answer: Answer,
    },
    Review {
        patient: Vec<(&'static str, String)>,
        symptoms: String,
        answers: Vec<ReviewItem>,
    },
    Analysis {
        conditions: Vec<ConditionView>,
        actions: Vec<AnalysisAction>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub can_advance: bool,
    pub can_retreat: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance_label: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WizardView {
    pub session_id: String,
    pub step_index: usize,
    pub total_steps: usize,
    pub step: Step,
    pub title: &'static str,
    pub progress: Vec<ProgressEntry>,
    pub content: StepContent,
    pub navigation: Navigation,
    pub is_generating_questions: bool,
    pub is_analyzing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl WizardView {
    pub fn of(session: &IntakeSession) -> Self {
        let step = session.current_step();

        Self {
            session_id: session.id.clone(),
            step_index: session.cursor(),
            total_steps: session.total_steps(),
            step,
            title: step.title(),
            progress: progress(session, step),
            content: content(session, step),
            navigation: Navigation {
                can_advance: session.can_advance(),
                can_retreat: session.can_retreat(),
                advance_label: advance_label(step, session.question_count()),
            },
            is_generating_questions: session.is_generating_questions(),
            is_analyzing: session.is_analyzing(),
            error_message: session.error_message().map(str::to_string),
        }
    }
}

fn progress(session: &IntakeSession, step: Step) -> Vec<ProgressEntry> {
    let titles = session.layout().stage_titles();
    let current = session.layout().stage_of(step);

    titles
        .into_iter()
        .enumerate()
        .map(|(i, title)| ProgressEntry {
            title,
            state: match i.cmp(&current) {
                std::cmp::Ordering::Less => ProgressState::Done,
                std::cmp::Ordering::Equal => ProgressState::Current,
                std::cmp::Ordering::Greater => ProgressState::Upcoming,
            },
        })
        .collect()
}

fn advance_label(step: Step, question_count: usize) -> Option<&'static str> {
    match step {
        Step::Intake { .. } | Step::Symptoms => Some("Next"),
        Step::Question { index } if index + 1 == question_count => Some("Review"),
        Step::Question { .. } => Some("Next"),
        Step::Review => Some("Analyze"),
        Step::Analysis => None,
    }
}

fn content(session: &IntakeSession, step: Step) -> StepContent {
    match step {
        Step::Intake { stage } => StepContent::Intake {
            stage,
            patient: session.patient().clone(),
        },
        Step::Symptoms => StepContent::Symptoms {
            symptoms: session.symptoms().to_string(),
        },
        Step::Question { index } => {
            let follow_up = &session.follow_ups()[index];
            StepContent::Question {
                index,
                number: index + 1,
                of: session.question_count(),
                text: follow_up.question.display_text(),
                yes_no: follow_up.question.is_yes_no(),
                answer: follow_up.answer.clone(),
            }
        }
        Step::Review => StepContent::Review {
            patient: session.patient().summary_lines(),
            symptoms: session.symptoms().to_string(),
            answers: session
                .follow_ups()
                .iter()
                .map(|f| ReviewItem {
                    question: f.question.display_text(),
                    answer: f.answer.choice.clone(),
                    additional_details: f.answer.shown_details().map(str::to_string),
                })
                .collect(),
        },
        Step::Analysis => StepContent::Analysis {
            conditions: render_interactive(&session.conditions()),
            actions: vec![AnalysisAction::NewPatient, AnalysisAction::Export],
        },
    }
}
