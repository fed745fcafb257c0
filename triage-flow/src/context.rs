use serde::{Deserialize, Serialize};

use crate::session::{ObservationData, TriageSession};

/// How the evidence for the current decision arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Text,
    Image,
    Mixed,
}

/// Everything a single decision step needs, built fresh on every turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageContext {
    /// All user text so far, oldest first.
    pub combined_text: String,
    pub latest_observation: Option<ObservationData>,
    pub ai_message_count: usize,
    pub input_mode: InputMode,
    pub severity_hint: Option<String>,
    pub duration_hint: Option<String>,
}

impl TriageContext {
    pub fn from_session(session: &TriageSession, input_mode: InputMode) -> Self {
        Self {
            combined_text: session.combined_user_text(),
            latest_observation: session.latest_vision_observation().cloned(),
            ai_message_count: session.ai_message_count(),
            input_mode,
            severity_hint: None,
            duration_hint: None,
        }
    }

    pub fn with_hints(mut self, severity: Option<String>, duration: Option<String>) -> Self {
        self.severity_hint = severity;
        self.duration_hint = duration;
        self
    }

    pub fn has_observations(&self) -> bool {
        self.latest_observation.is_some()
    }

    /// `Text` when no image has ever been analysed, `Mixed` otherwise.
    pub fn mode_for(session: &TriageSession) -> InputMode {
        if session.observations.is_empty() {
            InputMode::Text
        } else {
            InputMode::Mixed
        }
    }

    pub fn findings(&self) -> &[String] {
        self.latest_observation
            .as_ref()
            .map(|o| o.findings.as_slice())
            .unwrap_or(&[])
    }
}
