//! TriageOrchestrator – drives one session through a single turn and persists it.
//!
//! Every public operation follows the same _lock → load → stage → decide → save_
//! shape. Changes are staged on an owned [`TriageSession`] and committed with a
//! single [`SessionStore::save`], so a turn that fails part-way (for example
//! when image analysis times out) leaves the stored session untouched.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::{
    classifier::{self, Category},
    config::TriageConfig,
    context::{InputMode, TriageContext},
    error::{Result, TriageError},
    output::TriageOutput,
    questions::{CONFIRMATION_QUESTION, QUESTION_BANK, Question, UPLOAD_PROMPT_QUESTION},
    safety::SafetyScanner,
    session::{ObservationData, ObservationSource, SessionStatus, TriageSession},
    storage::SessionStore,
    synthesizer,
    vision::ImageObservationService,
};

/// Outcome of a turn as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    NeedsMoreInfo,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub session_id: String,
    pub status: TriageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<TriageOutput>,
}

impl TriageResult {
    pub fn needs_more_info(session_id: impl Into<String>, question: Question) -> Self {
        Self {
            session_id: session_id.into(),
            status: TriageStatus::NeedsMoreInfo,
            next_question: Some(question),
            final_output: None,
        }
    }

    pub fn completed(session_id: impl Into<String>, output: TriageOutput) -> Self {
        Self {
            session_id: session_id.into(),
            status: TriageStatus::Completed,
            next_question: None,
            final_output: Some(output),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TriageStatus::Completed
    }
}

/// A free-text symptom report with optional hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSubmission {
    pub symptoms: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

impl TextSubmission {
    pub fn new(symptoms: impl Into<String>) -> Self {
        Self {
            symptoms: symptoms.into(),
            ..Default::default()
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }
}

/// Serializes turns per session id. Different sessions never contend.
///
/// An entry lives only while some turn holds or waits on it.
#[derive(Default)]
pub struct TurnLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, session_id: &str) -> TurnGuard<'_> {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        TurnGuard {
            locks: self,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held for the duration of one turn. Dropping it unlocks the session and
/// prunes the map entry when nobody else is queued on it.
pub struct TurnGuard<'a> {
    locks: &'a TurnLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        // Release our clone of the mutex first so only the map's reference remains.
        self.guard.take();
        // `remove_if` holds the shard lock, so no `acquire` can clone the entry mid-check.
        self.locks
            .locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// How a confirmation-style answer should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerIntent {
    UploadAnother,
    AddSymptoms,
    Finalize,
    Other,
}

impl AnswerIntent {
    fn parse(answer: &str) -> Self {
        let lower = answer.to_lowercase();
        if lower.contains("upload another image") {
            AnswerIntent::UploadAnother
        } else if lower.contains("add symptoms") {
            AnswerIntent::AddSymptoms
        } else if lower.contains("finalize") || lower.contains("no") {
            AnswerIntent::Finalize
        } else {
            AnswerIntent::Other
        }
    }
}

/// High-level entry point for every triage operation.
#[derive(Clone)]
pub struct TriageOrchestrator {
    store: Arc<dyn SessionStore>,
    vision: Arc<dyn ImageObservationService>,
    scanner: SafetyScanner,
    config: TriageConfig,
    locks: Arc<TurnLocks>,
}

impl TriageOrchestrator {
    pub fn new(store: Arc<dyn SessionStore>, vision: Arc<dyn ImageObservationService>) -> Self {
        Self::with_config(store, vision, TriageConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn SessionStore>,
        vision: Arc<dyn ImageObservationService>,
        config: TriageConfig,
    ) -> Self {
        Self {
            store,
            vision,
            scanner: SafetyScanner::new(),
            config,
            locks: Arc::new(TurnLocks::new()),
        }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub async fn create_session(&self, language: Option<String>) -> Result<TriageSession> {
        let language = language.unwrap_or_else(|| self.config.default_language.clone());
        let session = TriageSession::new(language);
        self.store.create(session.clone()).await?;
        info!(session_id = %session.id, "session created");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<TriageSession> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| TriageError::SessionNotFound(session_id.to_string()))
    }

    /// Remove a session and everything recorded under it. Returns whether it existed.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let existed = {
            let _turn = self.locks.acquire(session_id).await;
            self.store.delete(session_id).await?
        };
        info!(session_id, existed, "session deleted");
        Ok(existed)
    }

    /// Run the general per-turn algorithm for a text report. `None` starts a new session.
    pub async fn submit_text(
        &self,
        session_id: Option<&str>,
        submission: TextSubmission,
    ) -> Result<TriageResult> {
        require_text(&submission.symptoms, "symptoms")?;
        let (_turn, mut session) = self.begin_turn(session_id).await?;

        session.push_user_message(submission.symptoms.trim());
        let mode = TriageContext::mode_for(&session);
        let result = self.decide(&mut session, mode, submission.severity, submission.duration);

        self.commit(session, &result).await?;
        Ok(result)
    }

    /// Append more text to a running session and offer the confirmation choices.
    pub async fn add_session_text(&self, session_id: &str, symptoms: &str) -> Result<TriageResult> {
        require_text(symptoms, "symptoms")?;
        let (_turn, mut session) = self.begin_turn(Some(session_id)).await?;

        session.push_user_message(symptoms.trim());
        let result = match self.safety_check(&mut session) {
            Some(result) => result,
            None => ask(&mut session, &CONFIRMATION_QUESTION),
        };

        self.commit(session, &result).await?;
        Ok(result)
    }

    /// Analyse an uploaded image. Finalizes on a visible wound, otherwise asks
    /// whether the user wants to add more evidence. `None` starts a new session.
    pub async fn submit_image(
        &self,
        session_id: Option<&str>,
        image: Vec<u8>,
    ) -> Result<TriageResult> {
        if image.is_empty() {
            return Err(TriageError::InvalidInput("image must not be empty".to_string()));
        }
        let (_turn, mut session) = self.begin_turn(session_id).await?;

        if let Some(result) = self.safety_check(&mut session) {
            self.commit(session, &result).await?;
            return Ok(result);
        }

        let observation = self.analyze_image(&session.id, image).await?;
        session.push_observation(ObservationSource::Vision, observation);

        let result = if classifier::classify_observations(
            session
                .latest_vision_observation()
                .map(|o| o.findings.as_slice())
                .unwrap_or(&[]),
        ) == Some(Category::Wound)
        {
            finalize(&mut session, InputMode::Image)
        } else {
            ask(&mut session, &CONFIRMATION_QUESTION)
        };

        self.commit(session, &result).await?;
        Ok(result)
    }

    /// Handle the user's reply to the last question.
    pub async fn submit_answer(&self, session_id: &str, answer: &str) -> Result<TriageResult> {
        require_text(answer, "answer")?;
        let (_turn, mut session) = self.begin_turn(Some(session_id)).await?;

        session.push_user_message(answer.trim());
        let intent = AnswerIntent::parse(answer);
        debug!(session_id, ?intent, "answer received");

        let result = match self.safety_check(&mut session) {
            Some(result) => result,
            None => match intent {
                AnswerIntent::UploadAnother => ask(&mut session, &UPLOAD_PROMPT_QUESTION),
                AnswerIntent::AddSymptoms => ask(&mut session, QUESTION_BANK.describe_symptoms()),
                AnswerIntent::Finalize => {
                    let mode = TriageContext::mode_for(&session);
                    finalize(&mut session, mode)
                }
                AnswerIntent::Other => {
                    let mode = TriageContext::mode_for(&session);
                    self.decide(&mut session, mode, None, None)
                }
            },
        };

        self.commit(session, &result).await?;
        Ok(result)
    }

    /// Take the turn lock, then load the session (or create one when no id is given).
    async fn begin_turn(
        &self,
        session_id: Option<&str>,
    ) -> Result<(Option<TurnGuard<'_>>, TriageSession)> {
        match session_id {
            Some(id) => {
                let guard = self.locks.acquire(id).await;
                let session = self.get_session(id).await?;
                if session.is_completed() {
                    return Err(TriageError::SessionCompleted(id.to_string()));
                }
                Ok((Some(guard), session))
            }
            // A fresh id cannot be contended; it is only stored on commit.
            None => {
                let session = TriageSession::new(self.config.default_language.clone());
                debug!(session_id = %session.id, "session started implicitly");
                Ok((None, session))
            }
        }
    }

    async fn commit(&self, session: TriageSession, result: &TriageResult) -> Result<()> {
        let session_id = session.id.clone();
        let status = session.status;
        self.store.save(session).await?;
        info!(
            session_id = %session_id,
            status = status.as_str(),
            completed = result.is_completed(),
            "turn committed"
        );
        Ok(())
    }

    async fn analyze_image(
        &self,
        session_id: &str,
        image: Vec<u8>,
    ) -> Result<ObservationData> {
        let timeout = self.config.image_analysis_timeout;
        match tokio::time::timeout(timeout, self.vision.analyze(image)).await {
            Ok(Ok(observation)) => Ok(observation),
            Ok(Err(e)) => {
                warn!(session_id, error = %e, "image analysis failed");
                Err(match e {
                    TriageError::ImageAnalysisFailed(_) => e,
                    other => TriageError::ImageAnalysisFailed(other.to_string()),
                })
            }
            Err(_) => {
                warn!(session_id, timeout_ms = timeout.as_millis() as u64, "image analysis timed out");
                Err(TriageError::ImageAnalysisFailed(format!(
                    "analysis did not finish within {}s",
                    timeout.as_secs_f32()
                )))
            }
        }
    }

    /// Scan everything the user has said so far; a match ends the session.
    fn safety_check(&self, session: &mut TriageSession) -> Option<TriageResult> {
        let emergency = self.scanner.scan(&session.combined_user_text())?;
        warn!(
            session_id = %session.id,
            group = ?emergency.group,
            kind = ?emergency.kind,
            "emergency pattern detected"
        );
        session.complete(emergency.output.clone());
        Some(TriageResult::completed(session.id.clone(), emergency.output))
    }

    /// General per-turn algorithm: safety, visible wound, first question, finalize.
    fn decide(
        &self,
        session: &mut TriageSession,
        mode: InputMode,
        severity: Option<String>,
        duration: Option<String>,
    ) -> TriageResult {
        if let Some(result) = self.safety_check(session) {
            return result;
        }

        let ctx = TriageContext::from_session(session, mode).with_hints(severity, duration);

        if classifier::classify_observations(ctx.findings()) == Some(Category::Wound) {
            return finalize(session, mode);
        }

        if !ctx.has_observations() && session.status == SessionStatus::Collecting {
            let category = classifier::classify_for_question(&ctx);
            debug!(session_id = %session.id, %category, "asking follow-up question");
            return ask(session, QUESTION_BANK.question_for(category));
        }

        finalize(session, mode)
    }
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TriageError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Record the question as an AI message and mark it outstanding.
fn ask(session: &mut TriageSession, question: &Question) -> TriageResult {
    session.push_ai_message(question.text.clone());
    session.await_answer();
    TriageResult::needs_more_info(session.id.clone(), question.clone())
}

/// Classify with the output-time rules, synthesize and complete the session.
fn finalize(session: &mut TriageSession, mode: InputMode) -> TriageResult {
    let ctx = TriageContext::from_session(session, mode);
    let category = classifier::classify_for_output(&ctx);
    info!(session_id = %session.id, %category, "finalizing");
    let output = synthesizer::synthesize(category, Some(&ctx.combined_text));
    session.complete(output.clone());
    TriageResult::completed(session.id.clone(), output)
}
