use serde::{Deserialize, Serialize};

/// Severity assigned to a finalized triage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A candidate explanation with a confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossibleCause {
    pub name: String,
    pub confidence: f64,
}

impl PossibleCause {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Structured guidance produced when a session is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageOutput {
    pub summary: String,
    pub severity: Severity,
    pub possible_causes: Vec<PossibleCause>,
    pub home_care: Vec<String>,
    pub prevention: Vec<String>,
    pub red_flags: Vec<String>,
    pub when_to_seek_care: Vec<String>,
    pub disclaimer: String,
}

impl TriageOutput {
    pub fn is_emergency(&self) -> bool {
        self.severity == Severity::Critical
    }
}
