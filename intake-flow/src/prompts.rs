use serde::{Deserialize, Serialize};

use crate::models::{AnalysisRequest, YES_NO_MARKER};

/// How the follow-up question prompt is phrased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPrompt {
    pub count: usize,
    /// Second language each question is translated into, if any.
    pub translation: Option<String>,
}

impl Default for QuestionPrompt {
    fn default() -> Self {
        Self {
            count: 4,
            translation: Some("Somali".to_string()),
        }
    }
}

impl QuestionPrompt {
    pub fn render(&self, symptoms: &str) -> String {
        let (languages, line) = match &self.translation {
            Some(language) => (
                format!(" in both English and {}", language),
                format!("English question ({} translation)", language),
            ),
            None => (String::new(), "Question".to_string()),
        };

        let mut prompt = format!(
            "Based on the following symptoms, generate {} relevant follow-up questions{} to gather more information. For yes/no questions, indicate {} at the end:\nSymptoms: {}\n\nGenerate the questions in the following format:",
            self.count, languages, YES_NO_MARKER, symptoms
        );
        for n in 1..=self.count {
            prompt.push_str(&format!(
                "\n{}. {} {} if applicable",
                n, line, YES_NO_MARKER
            ));
        }
        prompt
    }
}

const REPORT_FORMAT: &str = r#"<report>
  <condition>
    <name>Condition Name</name>
    <likelihood>High, Medium or Low</likelihood>
    <description>Brief description of the condition</description>
    <treatments>
      <treatment>Treatment 1</treatment>
      <treatment>Treatment 2</treatment>
    </treatments>
    <medicines>
      <medicine>
        <name>Medicine name</name>
        <dosage>Typical dosage</dosage>
        <alternatives>
          <alternative>Alternative 1</alternative>
        </alternatives>
      </medicine>
    </medicines>
  </condition>
  <!-- Repeat for each condition -->
</report>"#;

/// Prompt asking for the tagged-record differential report.
pub fn analysis_prompt(request: &AnalysisRequest) -> String {
    let patient = request
        .patient_info
        .summary_lines()
        .into_iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect::<Vec<_>>()
        .join("\n");

    let answers = request
        .questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let answer = request.answers.get(i).cloned().unwrap_or_default();
            let mut block = format!("{}\nAnswer: {}", question, answer.choice);
            if let Some(details) = answer.shown_details() {
                block.push_str(&format!("\nAdditional details: {}", details));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Analyze the following patient information, symptoms and answers:\nPatient Information:\n{}\n\nSymptoms: {}\n\nQuestions and Answers:\n{}\n\nBased on this information, provide a professional report indicating:\n1. Possible conditions, listed from most to least likely\n2. For each condition, list possible treatments and medicine options with dosage and alternatives\n\nPlease format the output as follows:\n{}",
        patient, request.symptoms, answers, REPORT_FORMAT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, FollowUp, PatientInfo, Question};

    #[test]
    fn question_prompt_embeds_symptoms_and_count() {
        let prompt = QuestionPrompt::default().render("fever and cough");
        assert!(prompt.contains("Symptoms: fever and cough"));
        assert!(prompt.contains("generate 4 relevant follow-up questions in both English and Somali"));
        assert!(prompt.contains("\n4. English question (Somali translation) [YES/NO] if applicable"));
        assert!(!prompt.contains("\n5."));
    }

    #[test]
    fn question_prompt_without_translation() {
        let prompt = QuestionPrompt {
            count: 2,
            translation: None,
        }
        .render("headache");
        assert!(!prompt.contains("Somali"));
        assert!(prompt.contains("\n2. Question [YES/NO] if applicable"));
    }

    #[test]
    fn analysis_prompt_lists_answers_in_order() {
        let follow_ups = vec![
            FollowUp {
                question: Question::new("Do you have a fever? [YES/NO]"),
                answer: Answer::with_details("yes", "3 days"),
            },
            FollowUp {
                question: Question::new("How many days?"),
                answer: Answer::new("5"),
            },
        ];
        let request = AnalysisRequest::new(&PatientInfo::default(), "fever and cough", &follow_ups);
        let prompt = analysis_prompt(&request);

        let first = prompt.find("Answer: yes\nAdditional details: 3 days").unwrap();
        let second = prompt.find("How many days?\nAnswer: 5").unwrap();
        assert!(first < second);
        assert!(prompt.contains("<likelihood>"));
    }
}
