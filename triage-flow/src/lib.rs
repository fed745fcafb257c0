pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod questions;
pub mod rules;
pub mod safety;
pub mod session;
pub mod storage;
#[cfg(feature = "postgres")]
pub mod storage_postgres;
pub mod synthesizer;
pub mod vision;

// Re-export commonly used types
pub use classifier::Category;
pub use config::TriageConfig;
pub use context::{InputMode, TriageContext};
pub use error::{Result, TriageError};
pub use orchestrator::{TextSubmission, TriageOrchestrator, TriageResult, TriageStatus};
pub use output::{PossibleCause, Severity, TriageOutput};
pub use questions::{CONFIRMATION_QUESTION, QUESTION_BANK, Question, UPLOAD_PROMPT_QUESTION};
pub use rules::{Rule, RuleSet};
pub use safety::{EmergencyGroup, EmergencyKind, EmergencyResponse, SafetyScanner};
pub use session::{
    Message, Observation, ObservationData, ObservationSource, Sender, SessionStatus,
    TriageSession,
};
pub use storage::{InMemorySessionStore, SessionStore};
#[cfg(feature = "postgres")]
pub use storage_postgres::PostgresSessionStore;
pub use synthesizer::{DISCLAIMER, synthesize};
pub use vision::{
    FixedImageObservationService, ImageObservationService, StubImageObservationService,
};
