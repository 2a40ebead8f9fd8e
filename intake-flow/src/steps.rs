//! Step layout of the intake wizard.
//!
//! The wizard is a single cursor over a contiguous range of steps:
//!
//! ```text
//! [intake stages (K)] [symptoms] [question 0 .. question n-1] [review] [analysis]
//! ```
//!
//! K comes from the configured [`StepLayout`]; n is the number of generated questions.

use serde::{Deserialize, Serialize};

/// Fixed patient-information steps shown before the symptom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStage {
    GeneralInfo,
    PhysicalInfo,
    MedicalHistory,
}

impl IntakeStage {
    pub fn title(&self) -> &'static str {
        match self {
            IntakeStage::GeneralInfo => "General Info",
            IntakeStage::PhysicalInfo => "Physical Info",
            IntakeStage::MedicalHistory => "Medical History",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Intake { stage: IntakeStage },
    Symptoms,
    Question { index: usize },
    Review,
    Analysis,
}

impl Step {
    pub fn title(&self) -> &'static str {
        match self {
            Step::Intake { stage } => stage.title(),
            Step::Symptoms => "Symptoms",
            Step::Question { .. } => "Questions",
            Step::Review => "Review",
            Step::Analysis => "Analysis",
        }
    }
}

/// Ordered intake stages; their count is the K of the step arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLayout {
    intake: Vec<IntakeStage>,
}

impl StepLayout {
    pub fn new(intake: Vec<IntakeStage>) -> Self {
        Self { intake }
    }

    /// General info, physical info and medical history before the symptoms.
    pub fn standard() -> Self {
        Self::new(vec![
            IntakeStage::GeneralInfo,
            IntakeStage::PhysicalInfo,
            IntakeStage::MedicalHistory,
        ])
    }

    /// Starts directly at the symptom step.
    pub fn symptoms_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn intake_steps(&self) -> usize {
        self.intake.len()
    }

    pub fn total_steps(&self, question_count: usize) -> usize {
        self.intake_steps() + 1 + question_count + 2
    }

    pub fn symptom_index(&self) -> usize {
        self.intake_steps()
    }

    pub fn review_index(&self, question_count: usize) -> usize {
        self.intake_steps() + 1 + question_count
    }

    pub fn analysis_index(&self, question_count: usize) -> usize {
        self.review_index(question_count) + 1
    }

    /// Maps a cursor position onto its step. Positions past the end resolve to
    /// the analysis step.
    pub fn step_at(&self, cursor: usize, question_count: usize) -> Step {
        let k = self.intake_steps();
        if cursor < k {
            Step::Intake {
                stage: self.intake[cursor],
            }
        } else if cursor == k {
            Step::Symptoms
        } else if cursor < self.review_index(question_count) {
            Step::Question {
                index: cursor - k - 1,
            }
        } else if cursor == self.review_index(question_count) {
            Step::Review
        } else {
            Step::Analysis
        }
    }

    /// Stage titles shown by the progress indicator.
    pub fn stage_titles(&self) -> Vec<&'static str> {
        let mut titles: Vec<&'static str> = self.intake.iter().map(|s| s.title()).collect();
        titles.extend(["Symptoms", "Questions", "Review", "Analysis"]);
        titles
    }

    /// Position of a step within [`Self::stage_titles`]. All question steps share one stage.
    pub fn stage_of(&self, step: Step) -> usize {
        let k = self.intake_steps();
        match step {
            Step::Intake { stage } => self
                .intake
                .iter()
                .position(|s| *s == stage)
                .unwrap_or_default(),
            Step::Symptoms => k,
            Step::Question { .. } => k + 1,
            Step::Review => k + 2,
            Step::Analysis => k + 3,
        }
    }
}

impl Default for StepLayout {
    fn default() -> Self {
        Self::standard()
    }
}
