use std::time::Duration;

pub const DEFAULT_IMAGE_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LANGUAGE: &str = "en";

/// Engine-level settings. Transport settings live in the service crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageConfig {
    /// Upper bound on one image analysis call.
    pub image_analysis_timeout: Duration,
    pub default_language: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            image_analysis_timeout: DEFAULT_IMAGE_ANALYSIS_TIMEOUT,
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl TriageConfig {
    pub fn with_image_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.image_analysis_timeout = timeout;
        self
    }
}
