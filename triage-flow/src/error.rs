use thiserror::Error;

/// Errors surfaced by the triage engine and its collaborators.
///
/// Only the session store and the image observation service can fail; the
/// safety scanner, classifiers and synthesizer are infallible.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already completed: {0}")]
    SessionCompleted(String),

    #[error("Session was modified concurrently: {0}")]
    ConcurrentModification(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image analysis failed: {0}")]
    ImageAnalysisFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TriageError {
    /// Stable machine-readable code, used as the `error` field on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            TriageError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            TriageError::SessionCompleted(_) => "SESSION_COMPLETED",
            TriageError::ConcurrentModification(_) => "SESSION_CONFLICT",
            TriageError::InvalidInput(_) => "INVALID_INPUT",
            TriageError::ImageAnalysisFailed(_) => "IMAGE_ANALYSIS_FAILED",
            TriageError::StorageError(_) | TriageError::Internal(_) => "INTERNAL",
        }
    }

    /// Client errors are the caller's fault and are logged at a lower level.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TriageError::SessionNotFound(_)
                | TriageError::SessionCompleted(_)
                | TriageError::InvalidInput(_)
        )
    }

    /// Recoverable failures the user can fix by retrying the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TriageError::ImageAnalysisFailed(_) | TriageError::ConcurrentModification(_)
        )
    }
}

impl From<serde_json::Error> for TriageError {
    fn from(e: serde_json::Error) -> Self {
        TriageError::Internal(format!("serialization: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
