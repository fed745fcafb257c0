use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::output::TriageOutput;

/// Lifecycle of a triage session.
///
/// `Collecting` and `AwaitingAnswer` are both "still collecting" from the
/// caller's point of view; the split records whether a question is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No question has been asked yet.
    Collecting,
    /// A follow-up or confirmation question is outstanding.
    AwaitingAnswer,
    /// Terminal; `output` is set.
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Collecting => "collecting",
            SessionStatus::AwaitingAnswer => "awaiting_answer",
            SessionStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationSource {
    Vision,
    Text,
}

/// Categorical findings reported for one uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationData {
    pub body_part: Option<String>,
    pub findings: Vec<String>,
    #[serde(default)]
    pub quality_flags: Vec<String>,
    #[serde(default)]
    pub confidence: BTreeMap<String, f64>,
}

impl ObservationData {
    pub fn new<I, S>(findings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            findings: findings.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_body_part(mut self, body_part: impl Into<String>) -> Self {
        self.body_part = Some(body_part.into());
        self
    }

    pub fn with_confidence(mut self, finding: impl Into<String>, score: f64) -> Self {
        self.confidence.insert(finding.into(), score);
        self
    }

    /// Case-insensitive check for an exact finding label.
    pub fn has_finding(&self, label: &str) -> bool {
        self.findings.iter().any(|f| f.eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub source: ObservationSource,
    pub data: ObservationData,
    pub timestamp: DateTime<Utc>,
}

/// One user's symptom-reporting conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageSession {
    pub id: String,
    pub status: SessionStatus,
    pub language: String,
    pub messages: Vec<Message>,
    pub observations: Vec<Observation>,
    pub output: Option<TriageOutput>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of committed saves. Stores reject a save whose revision is stale.
    #[serde(default)]
    pub revision: u64,
}

impl TriageSession {
    pub fn new(language: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: SessionStatus::Collecting,
            language: language.into(),
            messages: Vec::new(),
            observations: Vec::new(),
            output: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.status != SessionStatus::Completed
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.push_message(Sender::User, content.into());
    }

    pub fn push_ai_message(&mut self, content: impl Into<String>) {
        self.push_message(Sender::Ai, content.into());
    }

    fn push_message(&mut self, sender: Sender, content: String) {
        let timestamp = Utc::now();
        self.messages.push(Message {
            sender,
            content,
            timestamp,
        });
        self.updated_at = timestamp;
    }

    pub fn push_observation(&mut self, source: ObservationSource, data: ObservationData) {
        let timestamp = Utc::now();
        self.observations.push(Observation {
            source,
            data,
            timestamp,
        });
        self.updated_at = timestamp;
    }

    /// Mark a question as outstanding. No-op on a completed session.
    pub fn await_answer(&mut self) {
        if !self.is_completed() {
            self.status = SessionStatus::AwaitingAnswer;
        }
    }

    /// Store the final output. A session completes at most once; later calls
    /// leave the first output in place and return `false`.
    pub fn complete(&mut self, output: TriageOutput) -> bool {
        if self.is_completed() {
            return false;
        }
        self.output = Some(output);
        self.status = SessionStatus::Completed;
        self.updated_at = Utc::now();
        true
    }

    /// All user-authored text, oldest first, newline separated.
    pub fn combined_user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.sender == Sender::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn ai_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender == Sender::Ai)
            .count()
    }

    /// Most recent vision observation, the only one used for branching.
    pub fn latest_vision_observation(&self) -> Option<&ObservationData> {
        self.observations
            .iter()
            .rev()
            .find(|o| o.source == ObservationSource::Vision)
            .map(|o| &o.data)
    }
}
