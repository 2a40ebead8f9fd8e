use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    collaborator::{CollaboratorError, Collaborators},
    error::{IntakeError, Result},
    models::{AnalysisRequest, Answer, FollowUp, PatientInfo, PatientInfoUpdate, parse_questions},
    report::{Condition, parse_report},
    steps::{IntakeStage, Step, StepLayout},
};

/// External call currently in flight for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingCall {
    GeneratingQuestions,
    Analyzing,
}

/// What [`IntakeSession::begin_advance`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The cursor moved; no external call was needed.
    Moved(Step),
    /// Questions must be generated from this prompt before the cursor moves.
    GenerateQuestions { prompt: String },
    /// The report must be generated from this request before the cursor moves.
    Analyze(AnalysisRequest),
}

/// State of one intake wizard.
///
/// All mutation goes through methods that check the step gates first, so the
/// cursor always stays inside `0..total_steps()` and the answer list always
/// matches the generated questions one to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    layout: StepLayout,
    cursor: usize,
    patient: PatientInfo,
    symptoms: String,
    follow_ups: Vec<FollowUp>,
    report: Option<String>,
    pending: Option<PendingCall>,
    error_message: Option<String>,
}

impl IntakeSession {
    pub fn new(id: impl Into<String>, layout: StepLayout) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            layout,
            cursor: 0,
            patient: PatientInfo::default(),
            symptoms: String::new(),
            follow_ups: Vec::new(),
            report: None,
            pending: None,
            error_message: None,
        }
    }

    pub fn layout(&self) -> &StepLayout {
        &self.layout
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn patient(&self) -> &PatientInfo {
        &self.patient
    }

    pub fn symptoms(&self) -> &str {
        &self.symptoms
    }

    pub fn follow_ups(&self) -> &[FollowUp] {
        &self.follow_ups
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn pending(&self) -> Option<PendingCall> {
        self.pending
    }

    pub fn is_generating_questions(&self) -> bool {
        self.pending == Some(PendingCall::GeneratingQuestions)
    }

    pub fn is_analyzing(&self) -> bool {
        self.pending == Some(PendingCall::Analyzing)
    }

    pub fn question_count(&self) -> usize {
        self.follow_ups.len()
    }

    pub fn total_steps(&self) -> usize {
        self.layout.total_steps(self.question_count())
    }

    pub fn current_step(&self) -> Step {
        self.layout.step_at(self.cursor, self.question_count())
    }

    /// Parsed conditions of the stored report, empty before analysis.
    pub fn conditions(&self) -> Vec<Condition> {
        self.report.as_deref().map(parse_report).unwrap_or_default()
    }

    /// Whether the current step's required fields are filled in.
    pub fn gate_satisfied(&self) -> bool {
        let p = &self.patient;
        match self.current_step() {
            Step::Intake {
                stage: IntakeStage::GeneralInfo,
            } => filled(&p.age) && p.sex.is_some(),
            Step::Intake {
                stage: IntakeStage::PhysicalInfo,
            } => filled(&p.height) && filled(&p.weight),
            Step::Intake {
                stage: IntakeStage::MedicalHistory,
            } => {
                filled(&p.allergies)
                    && filled(&p.past_medical_history)
                    && filled(&p.current_medications)
            }
            Step::Symptoms => filled(&self.symptoms),
            Step::Question { index } => self
                .follow_ups
                .get(index)
                .is_some_and(|f| f.answer.is_answered()),
            Step::Review => true,
            Step::Analysis => false,
        }
    }

    pub fn can_advance(&self) -> bool {
        self.pending.is_none() && self.gate_satisfied()
    }

    pub fn can_retreat(&self) -> bool {
        self.pending.is_none() && self.cursor > 0 && self.current_step() != Step::Analysis
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.pending {
            Some(_) => Err(IntakeError::Busy),
            None => Ok(()),
        }
    }

    fn ensure_editable(&self) -> Result<()> {
        self.ensure_idle()?;
        if self.report.is_some() || self.current_step() == Step::Analysis {
            return Err(IntakeError::NavigationLocked(
                "intake data cannot change once analysis has completed".to_string(),
            ));
        }
        Ok(())
    }

    pub fn update_patient(&mut self, update: PatientInfoUpdate) -> Result<()> {
        self.ensure_editable()?;
        self.patient.apply(update);
        Ok(())
    }

    pub fn set_symptoms(&mut self, symptoms: impl Into<String>) -> Result<()> {
        self.ensure_editable()?;
        self.symptoms = symptoms.into();
        Ok(())
    }

    /// First half of an advance. Steps without an external call move the cursor
    /// right away; the symptom and review steps mark the session busy and hand back
    /// what the collaborator needs. The matching `complete_*` call finishes the move.
    pub fn begin_advance(&mut self, collaborators: &Collaborators) -> Result<Advance> {
        self.ensure_idle()?;
        let step = self.current_step();

        if step == Step::Analysis {
            return Err(IntakeError::NavigationLocked(
                "the analysis step is the last step".to_string(),
            ));
        }
        if !self.gate_satisfied() {
            return Err(IntakeError::StepIncomplete(step.title()));
        }

        match step {
            Step::Symptoms => {
                self.pending = Some(PendingCall::GeneratingQuestions);
                self.error_message = None;
                Ok(Advance::GenerateQuestions {
                    prompt: collaborators.question_prompt.render(&self.symptoms),
                })
            }
            Step::Review => {
                self.pending = Some(PendingCall::Analyzing);
                self.error_message = None;
                Ok(Advance::Analyze(AnalysisRequest::new(
                    &self.patient,
                    &self.symptoms,
                    &self.follow_ups,
                )))
            }
            _ => {
                self.cursor += 1;
                Ok(Advance::Moved(self.current_step()))
            }
        }
    }

    /// Applies the question generator's outcome. On success the questions replace any
    /// earlier ones, every answer starts empty, and the cursor moves past the symptom
    /// step. On failure the cursor stays put and the error message is set.
    pub fn complete_question_generation(
        &mut self,
        outcome: std::result::Result<String, CollaboratorError>,
    ) -> Result<Step> {
        if self.pending != Some(PendingCall::GeneratingQuestions) {
            return Err(IntakeError::StaleResult(
                "no question generation was in progress".to_string(),
            ));
        }
        self.pending = None;

        match outcome {
            Ok(raw) => {
                self.follow_ups = parse_questions(&raw)
                    .into_iter()
                    .map(FollowUp::unanswered)
                    .collect();
                self.cursor = self.layout.symptom_index() + 1;
                info!(
                    session_id = %self.id,
                    questions = self.follow_ups.len(),
                    "Follow-up questions generated"
                );
                Ok(self.current_step())
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Question generation failed");
                let err = IntakeError::QuestionGenerationFailed(e.to_string());
                self.error_message = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Applies the report generator's outcome. On success the raw report is stored and
    /// the cursor moves to the analysis step; otherwise the wizard stays on review.
    pub fn complete_analysis(
        &mut self,
        outcome: std::result::Result<String, CollaboratorError>,
    ) -> Result<Step> {
        if self.pending != Some(PendingCall::Analyzing) {
            return Err(IntakeError::StaleResult(
                "no analysis was in progress".to_string(),
            ));
        }
        self.pending = None;

        let err = match outcome {
            Ok(report) => {
                self.report = Some(report);
                self.cursor = self.layout.analysis_index(self.question_count());
                info!(session_id = %self.id, "Analysis report stored");
                return Ok(self.current_step());
            }
            Err(CollaboratorError::TimedOut { attempts }) => {
                IntakeError::AnalysisTimedOut { attempts }
            }
            Err(e) => IntakeError::AnalysisFailed(e.to_string()),
        };

        warn!(session_id = %self.id, error = %err, "Analysis failed");
        self.error_message = Some(err.user_message());
        Err(err)
    }

    /// Moves forward one step, calling the collaborators when leaving the symptom
    /// or review step.
    pub async fn advance(&mut self, collaborators: &Collaborators) -> Result<Step> {
        match self.begin_advance(collaborators)? {
            Advance::Moved(step) => Ok(step),
            Advance::GenerateQuestions { prompt } => {
                let outcome = collaborators.questions.generate_questions(&prompt).await;
                self.complete_question_generation(outcome)
            }
            Advance::Analyze(request) => {
                let outcome = collaborators.reports.generate_report(&request).await;
                self.complete_analysis(outcome)
            }
        }
    }

    pub fn retreat(&mut self) -> Result<Step> {
        self.ensure_idle()?;
        if self.current_step() == Step::Analysis {
            return Err(IntakeError::NavigationLocked(
                "start a new patient to leave the analysis step".to_string(),
            ));
        }
        if self.cursor == 0 {
            return Err(IntakeError::AtFirstStep);
        }
        self.cursor -= 1;
        Ok(self.current_step())
    }

    /// Stores the answer to question `index`. When the wizard is showing that
    /// question and the answer has a choice, the cursor moves on as well.
    /// Returns whether it moved.
    pub fn record_answer(&mut self, index: usize, answer: Answer) -> Result<bool> {
        self.ensure_editable()?;
        let count = self.follow_ups.len();
        let follow_up = self
            .follow_ups
            .get_mut(index)
            .ok_or(IntakeError::AnswerOutOfRange { index, count })?;

        follow_up.answer = normalize_answer(follow_up.question.is_yes_no(), answer)?;
        let answered = follow_up.answer.is_answered();

        if answered && self.current_step() == (Step::Question { index }) {
            self.cursor += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// Clears everything back to an empty first step. The layout is kept.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.cursor = 0;
        self.patient = PatientInfo::default();
        self.symptoms.clear();
        self.follow_ups.clear();
        self.report = None;
        self.error_message = None;
        info!(session_id = %self.id, "Session reset for a new patient");
        Ok(())
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

fn normalize_answer(yes_no: bool, answer: Answer) -> Result<Answer> {
    if !yes_no {
        return Ok(Answer::new(answer.choice));
    }

    let choice = answer.choice.trim().to_ascii_lowercase();
    match choice.as_str() {
        "yes" => Ok(Answer {
            choice,
            details: answer.details,
        }),
        "no" | "" => Ok(Answer::new(choice)),
        other => Err(IntakeError::InvalidAnswer(format!(
            "'{}' is not a yes/no answer",
            other
        ))),
    }
}
