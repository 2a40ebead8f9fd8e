pub mod collaborator;
pub mod error;
pub mod export;
pub mod models;
pub mod poll;
pub mod prompts;
pub mod report;
pub mod runner;
pub mod session;
pub mod steps;
pub mod storage;
pub mod view;

// Re-export commonly used types
pub use collaborator::{CollaboratorError, Collaborators, QuestionGenerator, ReportGenerator};
pub use error::{IntakeError, Result};
pub use export::{ExportedDocument, export_document};
pub use models::{
    AnalysisRequest, Answer, FollowUp, PatientInfo, PatientInfoUpdate, Question, Sex,
};
pub use poll::{Backoff, PollError, PollPolicy, PollState, poll_until};
pub use prompts::{QuestionPrompt, analysis_prompt};
pub use report::{Condition, ConditionView, Medicine, parse_report, render_interactive, to_markup};
pub use runner::{WizardRunner, export_session};
pub use session::{Advance, IntakeSession, PendingCall};
pub use steps::{IntakeStage, Step, StepLayout};
pub use storage::{InMemorySessionStorage, SessionStorage};
pub use view::WizardView;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct EchoQuestions;

    #[async_trait]
    impl QuestionGenerator for EchoQuestions {
        async fn generate_questions(
            &self,
            _prompt: &str,
        ) -> std::result::Result<String, CollaboratorError> {
            Ok("Is it worse at night? [YES/NO]".to_string())
        }
    }

    /// Waits for a release signal before answering, so a test can observe the busy window.
    struct GatedReport {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ReportGenerator for GatedReport {
        async fn generate_report(
            &self,
            _request: &AnalysisRequest,
        ) -> std::result::Result<String, CollaboratorError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok("<condition><name>Migraine</name></condition>".to_string())
        }
    }

    struct PanickingReport;

    #[async_trait]
    impl ReportGenerator for PanickingReport {
        async fn generate_report(
            &self,
            _request: &AnalysisRequest,
        ) -> std::result::Result<String, CollaboratorError> {
            panic!("report client crashed");
        }
    }

    fn runner(reports: Arc<dyn ReportGenerator>) -> WizardRunner {
        WizardRunner::new(
            Arc::new(InMemorySessionStorage::new()),
            Collaborators::new(Arc::new(EchoQuestions), reports),
            StepLayout::symptoms_only(),
        )
    }

    #[tokio::test]
    async fn test_runner_round_trip() {
        let gate = Arc::new(GatedReport {
            started: Notify::new(),
            release: Notify::new(),
        });
        gate.release.notify_one();
        let runner = runner(gate);

        let session = runner.start().await.unwrap();
        let id = session.id.clone();
        assert_eq!(session.current_step(), Step::Symptoms);

        runner.set_symptoms(&id, "headache".to_string()).await.unwrap();
        let session = runner.advance(&id).await.unwrap();
        assert_eq!(session.current_step(), Step::Question { index: 0 });

        let (session, moved) = runner.record_answer(&id, 0, Answer::new("No")).await.unwrap();
        assert!(moved);
        assert_eq!(session.current_step(), Step::Review);

        let session = runner.advance(&id).await.unwrap();
        assert_eq!(session.current_step(), Step::Analysis);
        assert_eq!(session.conditions()[0].name, "Migraine");

        let document = runner.export(&id).await.unwrap();
        assert!(document.bytes.starts_with(b"%PDF"));

        let session = runner.reset(&id).await.unwrap();
        assert_eq!(session.cursor(), 0);
        assert!(session.report().is_none());

        runner.discard(&id).await.unwrap();
        assert!(matches!(
            runner.session(&id).await,
            Err(IntakeError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_advance_is_rejected_while_busy() {
        let gate = Arc::new(GatedReport {
            started: Notify::new(),
            release: Notify::new(),
        });
        let runner = runner(gate.clone());

        let id = runner.start().await.unwrap().id;
        runner.set_symptoms(&id, "headache".to_string()).await.unwrap();
        runner.advance(&id).await.unwrap();
        runner.record_answer(&id, 0, Answer::new("yes")).await.unwrap();

        let background = {
            let runner = runner.clone();
            let id = id.clone();
            tokio::spawn(async move { runner.advance(&id).await })
        };
        gate.started.notified().await;

        let busy = runner.session(&id).await.unwrap();
        assert!(busy.is_analyzing());
        assert!(matches!(runner.advance(&id).await, Err(IntakeError::Busy)));
        assert!(matches!(runner.retreat(&id).await, Err(IntakeError::Busy)));
        assert!(matches!(runner.reset(&id).await, Err(IntakeError::Busy)));

        gate.release.notify_one();
        let session = background.await.unwrap().unwrap();
        assert_eq!(session.current_step(), Step::Analysis);
        assert!(!session.is_analyzing());
    }

    #[tokio::test]
    async fn test_export_requires_report() {
        let gate = Arc::new(GatedReport {
            started: Notify::new(),
            release: Notify::new(),
        });
        let runner = runner(gate);
        let id = runner.start().await.unwrap().id;

        assert!(matches!(
            runner.export(&id).await,
            Err(IntakeError::ReportUnavailable)
        ));
        assert!(matches!(
            runner.advance("missing").await,
            Err(IntakeError::SessionNotFound(_))
        ));
    }

    async fn at_review(runner: &WizardRunner) -> String {
        let id = runner.start().await.unwrap().id;
        runner.set_symptoms(&id, "headache".to_string()).await.unwrap();
        runner.advance(&id).await.unwrap();
        runner.record_answer(&id, 0, Answer::new("yes")).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_dropped_advance_still_settles_the_session() {
        let gate = Arc::new(GatedReport {
            started: Notify::new(),
            release: Notify::new(),
        });
        let runner = runner(gate.clone());
        let id = at_review(&runner).await;

        let dropped = tokio::time::timeout(Duration::from_millis(50), runner.advance(&id)).await;
        assert!(dropped.is_err());
        assert!(runner.session(&id).await.unwrap().is_analyzing());

        gate.release.notify_one();
        let mut session = runner.session(&id).await.unwrap();
        for _ in 0..100 {
            if !session.is_analyzing() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            session = runner.session(&id).await.unwrap();
        }

        assert!(!session.is_analyzing());
        assert_eq!(session.current_step(), Step::Analysis);
        let session = runner.reset(&id).await.unwrap();
        assert_eq!(session.cursor(), 0);
    }

    #[tokio::test]
    async fn test_panicking_collaborator_clears_busy_flag() {
        let runner = runner(Arc::new(PanickingReport));
        let id = at_review(&runner).await;

        let err = runner.advance(&id).await.unwrap_err();
        assert!(matches!(err, IntakeError::AnalysisFailed(_)));

        let session = runner.session(&id).await.unwrap();
        assert!(!session.is_analyzing());
        assert_eq!(session.current_step(), Step::Review);
        assert!(session.error_message().is_some());
        let session = runner.retreat(&id).await.unwrap();
        assert_eq!(session.current_step(), Step::Question { index: 0 });
    }
}
