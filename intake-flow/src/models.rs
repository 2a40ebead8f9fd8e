use serde::{Deserialize, Serialize};

/// Marker the question generator appends to questions that expect a yes/no answer.
pub const YES_NO_MARKER: &str = "[YES/NO]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

/// Patient details collected on the intake steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfo {
    pub age: String,
    pub sex: Option<Sex>,
    pub height: String,
    pub weight: String,
    pub allergies: String,
    pub past_medical_history: String,
    pub current_medications: String,
}

/// Partial update of [`PatientInfo`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInfoUpdate {
    pub age: Option<String>,
    pub sex: Option<Sex>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub allergies: Option<String>,
    pub past_medical_history: Option<String>,
    pub current_medications: Option<String>,
}

impl PatientInfo {
    pub fn apply(&mut self, update: PatientInfoUpdate) {
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(sex) = update.sex {
            self.sex = Some(sex);
        }
        if let Some(height) = update.height {
            self.height = height;
        }
        if let Some(weight) = update.weight {
            self.weight = weight;
        }
        if let Some(allergies) = update.allergies {
            self.allergies = allergies;
        }
        if let Some(history) = update.past_medical_history {
            self.past_medical_history = history;
        }
        if let Some(medications) = update.current_medications {
            self.current_medications = medications;
        }
    }

    pub fn sex_label(&self) -> &'static str {
        self.sex.map(|s| s.as_str()).unwrap_or("")
    }

    /// Label/value pairs in display order.
    pub fn summary_lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Age", self.age.clone()),
            ("Sex", self.sex_label().to_string()),
            ("Height", self.height.clone()),
            ("Weight", self.weight.clone()),
            ("Allergies", self.allergies.clone()),
            ("Past Medical History", self.past_medical_history.clone()),
            ("Current Medications", self.current_medications.clone()),
        ]
    }
}

/// A generated follow-up question, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_yes_no(&self) -> bool {
        self.text
            .to_ascii_lowercase()
            .contains(&YES_NO_MARKER.to_ascii_lowercase())
    }

    /// Question text with the yes/no marker removed.
    pub fn display_text(&self) -> String {
        let lower = self.text.to_ascii_lowercase();
        let marker = YES_NO_MARKER.to_ascii_lowercase();
        match lower.find(&marker) {
            Some(start) => {
                let mut text = String::with_capacity(self.text.len());
                text.push_str(&self.text[..start]);
                text.push_str(&self.text[start + marker.len()..]);
                text.trim().to_string()
            }
            None => self.text.trim().to_string(),
        }
    }
}

/// Splits the generator's newline-delimited output into questions, dropping blank lines.
pub fn parse_questions(raw: &str) -> Vec<Question> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Question::new)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub choice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Answer {
    pub fn new(choice: impl Into<String>) -> Self {
        Self {
            choice: choice.into(),
            details: None,
        }
    }

    pub fn with_details(choice: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            choice: choice.into(),
            details: Some(details.into()),
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.choice.trim().is_empty()
    }

    /// Details worth showing: present, non-blank, and only for a "yes" choice.
    pub fn shown_details(&self) -> Option<&str> {
        if self.choice != "yes" {
            return None;
        }
        self.details
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// A question paired with its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub question: Question,
    pub answer: Answer,
}

impl FollowUp {
    pub fn unanswered(question: Question) -> Self {
        Self {
            question,
            answer: Answer::default(),
        }
    }
}

/// Payload handed to the report generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub symptoms: String,
    pub questions: Vec<String>,
    pub answers: Vec<Answer>,
    pub patient_info: PatientInfo,
}

impl AnalysisRequest {
    pub fn new(patient_info: &PatientInfo, symptoms: &str, follow_ups: &[FollowUp]) -> Self {
        let (questions, answers) = follow_ups
            .iter()
            .map(|f| (f.question.text.clone(), f.answer.clone()))
            .unzip();
        Self {
            symptoms: symptoms.to_string(),
            questions,
            answers,
            patient_info: patient_info.clone(),
        }
    }
}
