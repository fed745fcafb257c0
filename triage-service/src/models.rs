use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_flow::{Message, Observation, SessionStatus, TriageOutput, TriageSession};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextTriageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub symptoms: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageTriageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub content_type: String,
    /// Standard base64, optionally as a `data:` URL.
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionTextRequest {
    pub symptoms: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub language: String,
    pub messages: Vec<Message>,
    pub observations: Vec<Observation>,
    pub output: Option<TriageOutput>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TriageSession> for SessionResponse {
    fn from(session: TriageSession) -> Self {
        Self {
            session_id: session.id,
            status: session.status,
            language: session.language,
            messages: session.messages,
            observations: session.observations,
            output: session.output,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub session_id: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisclaimerResponse {
    pub disclaimer: String,
    pub output_disclaimer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
