use std::sync::Arc;

use async_trait::async_trait;
use intake_flow::{
    AnalysisRequest, Answer, CollaboratorError, Collaborators, IntakeSession, PatientInfo,
    PatientInfoUpdate, QuestionGenerator, ReportGenerator, Sex, Step, StepLayout, WizardView,
    export::layout_report, render_interactive, view::StepContent,
};
use tokio::sync::Mutex;

const QUESTIONS: &str = "Do you have a fever? [YES/NO]\nHow many days?\n";

const INFLUENZA: &str = r#"<report>
  <condition>
    <name>Influenza</name>
    <likelihood>High</likelihood>
    <description>A contagious respiratory illness caused by influenza viruses.</description>
    <treatments>
      <treatment>Rest</treatment>
      <treatment>Fluids</treatment>
    </treatments>
    <medicines>
      <medicine>
        <name>Oseltamivir</name>
        <dosage>75 mg twice daily for 5 days</dosage>
        <alternatives>
          <alternative>Zanamivir</alternative>
          <alternative>Baloxavir</alternative>
        </alternatives>
      </medicine>
    </medicines>
  </condition>
</report>"#;

struct ScriptedQuestions;

#[async_trait]
impl QuestionGenerator for ScriptedQuestions {
    async fn generate_questions(&self, prompt: &str) -> Result<String, CollaboratorError> {
        assert!(prompt.contains("fever and cough"));
        Ok(QUESTIONS.to_string())
    }
}

/// Records the request it receives and answers with a fixed report.
#[derive(Default)]
struct RecordingReport {
    seen: Mutex<Option<AnalysisRequest>>,
}

#[async_trait]
impl ReportGenerator for RecordingReport {
    async fn generate_report(&self, request: &AnalysisRequest) -> Result<String, CollaboratorError> {
        *self.seen.lock().await = Some(request.clone());
        Ok(INFLUENZA.to_string())
    }
}

fn patient_update() -> PatientInfoUpdate {
    PatientInfoUpdate {
        age: Some("34".to_string()),
        sex: Some(Sex::Female),
        height: Some("165 cm".to_string()),
        weight: Some("60 kg".to_string()),
        allergies: Some("None".to_string()),
        past_medical_history: Some("Asthma".to_string()),
        current_medications: Some("Salbutamol".to_string()),
    }
}

async fn finished_session(reports: Arc<RecordingReport>) -> IntakeSession {
    let collaborators = Collaborators::new(Arc::new(ScriptedQuestions), reports);
    let mut session = IntakeSession::new("scenario", StepLayout::standard());

    session.update_patient(patient_update()).unwrap();
    for _ in 0..3 {
        session.advance(&collaborators).await.unwrap();
    }
    assert_eq!(session.current_step(), Step::Symptoms);

    session.set_symptoms("fever and cough").unwrap();
    session.advance(&collaborators).await.unwrap();
    assert_eq!(session.question_count(), 2);
    assert_eq!(session.total_steps(), 3 + 1 + 2 + 2);

    assert!(session
        .record_answer(0, Answer::with_details("yes", "3 days"))
        .unwrap());
    assert!(session.record_answer(1, Answer::new("5")).unwrap());
    assert_eq!(session.current_step(), Step::Review);

    session.advance(&collaborators).await.unwrap();
    assert_eq!(session.current_step(), Step::Analysis);
    session
}

#[tokio::test]
async fn fever_and_cough_scenario() {
    let reports = Arc::new(RecordingReport::default());
    let session = finished_session(reports.clone()).await;

    let request = reports.seen.lock().await.clone().unwrap();
    assert_eq!(request.symptoms, "fever and cough");
    assert_eq!(
        request.questions,
        vec!["Do you have a fever? [YES/NO]", "How many days?"]
    );
    assert_eq!(
        request.answers,
        vec![Answer::with_details("yes", "3 days"), Answer::new("5")]
    );
    assert_eq!(request.patient_info.past_medical_history, "Asthma");

    // Interactive rendering: one block, two treatments, one medicine with two alternatives.
    let views = render_interactive(&session.conditions());
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].name, "Influenza");
    assert_eq!(views[0].likelihood.as_deref(), Some("High"));
    assert_eq!(views[0].treatments, vec!["Rest", "Fluids"]);
    assert_eq!(views[0].medicines.len(), 1);
    assert_eq!(views[0].medicines[0].alternatives, vec!["Zanamivir", "Baloxavir"]);

    match WizardView::of(&session).content {
        StepContent::Analysis { conditions, .. } => assert_eq!(conditions, views),
        other => panic!("unexpected content {:?}", other),
    }

    // Export: title, patient block, symptoms, two Q/A blocks, then the condition block.
    let pages = layout_report(
        "Symptom Analysis Report",
        session.patient(),
        session.symptoms(),
        session.follow_ups(),
        &session.conditions(),
    );
    let lines: Vec<&str> = pages
        .iter()
        .flat_map(|p| p.lines.iter().map(|l| l.text.as_str()))
        .collect();
    let at = |needle: &str| {
        lines
            .iter()
            .position(|l| *l == needle)
            .unwrap_or_else(|| panic!("missing line {needle:?}"))
    };

    let order = [
        at("Symptom Analysis Report"),
        at("Patient Information:"),
        at("Age: 34"),
        at("Symptoms:"),
        at("fever and cough"),
        at("Do you have a fever?"),
        at("Answer: yes"),
        at("Additional details: 3 days"),
        at("How many days?"),
        at("Answer: 5"),
        at("Analysis:"),
        at("1. Influenza (High)"),
        at("- Rest"),
        at("- Fluids"),
        at("- Oseltamivir"),
        at("- Zanamivir"),
        at("- Baloxavir"),
    ];
    assert!(order.windows(2).all(|w| w[0] < w[1]), "out of order: {order:?}");
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("Additional details")).count(),
        1
    );
}

#[tokio::test]
async fn new_patient_clears_everything() {
    let mut session = finished_session(Arc::new(RecordingReport::default())).await;

    session.reset().unwrap();

    assert_eq!(session.cursor(), 0);
    assert_eq!(session.patient(), &PatientInfo::default());
    assert_eq!(session.symptoms(), "");
    assert!(session.follow_ups().is_empty());
    assert!(session.report().is_none());
    assert!(session.conditions().is_empty());
    assert!(session.error_message().is_none());
    assert_eq!(session.total_steps(), 3 + 1 + 0 + 2);
}
