//! WizardRunner: loads a session, applies exactly one wizard action, and persists the
//! updated session back to storage.
//!
//! Advancing off the symptom or review step involves an external call. The runner splits
//! that advance in two: the session is first saved with its busy flag set, the
//! collaborator is called without holding the session lock, and the outcome is then
//! applied to a freshly loaded copy. Concurrent requests for the same session therefore
//! see the busy flag and are rejected with [`IntakeError::Busy`] instead of racing.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    collaborator::{CollaboratorError, Collaborators},
    error::{IntakeError, Result},
    export::{ExportedDocument, export_document},
    models::{Answer, PatientInfoUpdate},
    session::{Advance, IntakeSession, PendingCall},
    steps::StepLayout,
    storage::SessionStorage,
};

/// High-level helper that orchestrates the _load → act → save_ cycle for one session.
#[derive(Clone)]
pub struct WizardRunner {
    storage: Arc<dyn SessionStorage>,
    collaborators: Collaborators,
    layout: StepLayout,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl WizardRunner {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        collaborators: Collaborators,
        layout: StepLayout,
    ) -> Self {
        Self {
            storage,
            collaborators,
            layout,
            locks: Arc::new(DashMap::new()),
        }
    }

    async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn load(&self, session_id: &str) -> Result<IntakeSession> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| IntakeError::SessionNotFound(session_id.to_string()))
    }

    /// Applies `action` to the stored session and saves it if the action succeeded.
    async fn update<T>(
        &self,
        session_id: &str,
        action: impl FnOnce(&mut IntakeSession) -> Result<T>,
    ) -> Result<(IntakeSession, T)> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;
        let value = action(&mut session)?;
        self.storage.save(session.clone()).await?;
        Ok((session, value))
    }

    /// Creates a fresh session at step 0.
    pub async fn start(&self) -> Result<IntakeSession> {
        let session = IntakeSession::new(Uuid::new_v4().to_string(), self.layout.clone());
        self.storage.save(session.clone()).await?;
        info!(session_id = %session.id, "Started new intake session");
        Ok(session)
    }

    pub async fn session(&self, session_id: &str) -> Result<IntakeSession> {
        self.load(session_id).await
    }

    /// Moves the session forward one step, running the question or report generator
    /// when the step requires it. External failures are recorded on the session (which
    /// stays on its step) before the error is returned.
    ///
    /// The external call and the step that applies its outcome run on a spawned task, so
    /// a caller that stops waiting does not leave the session busy.
    pub async fn advance(&self, session_id: &str) -> Result<IntakeSession> {
        let (session, advance) = self
            .update(session_id, |session| {
                session.begin_advance(&self.collaborators)
            })
            .await?;

        let call = match &advance {
            Advance::Moved(step) => {
                debug!(session_id = %session_id, step = ?step, "Advanced");
                return Ok(session);
            }
            Advance::GenerateQuestions { .. } => PendingCall::GeneratingQuestions,
            Advance::Analyze(_) => PendingCall::Analyzing,
        };

        let task = {
            let runner = self.clone();
            let session_id = session_id.to_string();
            tokio::spawn(async move { runner.run_external(&session_id, advance).await })
        };

        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                error!(session_id = %session_id, error = %join_error, "External call aborted");
                let aborted = Err(CollaboratorError::Failed(format!(
                    "external call aborted: {join_error}"
                )));
                self.settle(session_id, call, aborted).await
            }
        }
    }

    async fn run_external(&self, session_id: &str, advance: Advance) -> Result<IntakeSession> {
        let (call, outcome) = match advance {
            Advance::Moved(_) => return self.load(session_id).await,
            Advance::GenerateQuestions { prompt } => {
                info!(session_id = %session_id, "Generating follow-up questions");
                let outcome = self.collaborators.questions.generate_questions(&prompt).await;
                (PendingCall::GeneratingQuestions, outcome)
            }
            Advance::Analyze(request) => {
                info!(
                    session_id = %session_id,
                    questions = request.questions.len(),
                    "Requesting analysis report"
                );
                let outcome = self.collaborators.reports.generate_report(&request).await;
                (PendingCall::Analyzing, outcome)
            }
        };
        self.settle(session_id, call, outcome).await
    }

    /// Applies an external call's outcome to a freshly loaded session and saves it.
    async fn settle(
        &self,
        session_id: &str,
        call: PendingCall,
        outcome: std::result::Result<String, CollaboratorError>,
    ) -> Result<IntakeSession> {
        let _guard = self.lock(session_id).await;
        let mut session = self.load(session_id).await?;
        let result = match call {
            PendingCall::GeneratingQuestions => session.complete_question_generation(outcome),
            PendingCall::Analyzing => session.complete_analysis(outcome),
        };

        match result {
            Ok(step) => {
                self.storage.save(session.clone()).await?;
                info!(session_id = %session_id, step = ?step, "Advanced after external call");
                Ok(session)
            }
            Err(e) if e.is_external() => {
                self.storage.save(session).await?;
                Err(e)
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Discarding external result");
                Err(e)
            }
        }
    }

    pub async fn retreat(&self, session_id: &str) -> Result<IntakeSession> {
        let (session, step) = self.update(session_id, IntakeSession::retreat).await?;
        debug!(session_id = %session_id, step = ?step, "Went back");
        Ok(session)
    }

    /// Records an answer; the flag tells whether the wizard moved to the next step.
    pub async fn record_answer(
        &self,
        session_id: &str,
        index: usize,
        answer: Answer,
    ) -> Result<(IntakeSession, bool)> {
        let (session, moved) = self
            .update(session_id, |session| session.record_answer(index, answer))
            .await?;
        debug!(session_id = %session_id, index, moved, "Recorded answer");
        Ok((session, moved))
    }

    pub async fn update_patient(
        &self,
        session_id: &str,
        update: PatientInfoUpdate,
    ) -> Result<IntakeSession> {
        let (session, ()) = self
            .update(session_id, |session| session.update_patient(update))
            .await?;
        Ok(session)
    }

    pub async fn set_symptoms(&self, session_id: &str, symptoms: String) -> Result<IntakeSession> {
        let (session, ()) = self
            .update(session_id, |session| session.set_symptoms(symptoms))
            .await?;
        Ok(session)
    }

    /// "New patient": clears the session back to step 0.
    pub async fn reset(&self, session_id: &str) -> Result<IntakeSession> {
        let (session, ()) = self.update(session_id, IntakeSession::reset).await?;
        Ok(session)
    }

    /// Builds the export document for a session that has a report.
    pub async fn export(&self, session_id: &str) -> Result<ExportedDocument> {
        let session = self.load(session_id).await?;
        export_session(&session)
    }

    pub async fn discard(&self, session_id: &str) -> Result<()> {
        let _guard = self.lock(session_id).await;
        self.load(session_id).await?;
        self.storage.delete(session_id).await?;
        self.locks.remove(session_id);
        info!(session_id = %session_id, "Discarded intake session");
        Ok(())
    }
}

/// Export of a finished session. Fails with [`IntakeError::ReportUnavailable`] before analysis.
pub fn export_session(session: &IntakeSession) -> Result<ExportedDocument> {
    if session.report().is_none() {
        return Err(IntakeError::ReportUnavailable);
    }
    export_document(
        session.patient(),
        session.symptoms(),
        session.follow_ups(),
        &session.conditions(),
    )
}
