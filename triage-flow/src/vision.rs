use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{Result, TriageError},
    session::ObservationData,
};

/// Turns raw image bytes into categorical findings.
///
/// Implementations may block or call out to a remote model; the orchestrator
/// bounds every call with a timeout.
#[async_trait]
pub trait ImageObservationService: Send + Sync {
    async fn analyze(&self, image: Vec<u8>) -> Result<ObservationData>;
}

/// Deterministic stand-in for a vision model, keyed on payload length.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubImageObservationService;

impl StubImageObservationService {
    pub fn new() -> Self {
        Self
    }

    fn observe(image: &[u8]) -> ObservationData {
        if image.len() % 2 == 1 {
            ObservationData::new(["open wound", "bleeding", "jagged edges"])
                .with_body_part("leg")
                .with_confidence("open_wound", 0.92)
                .with_confidence("bleeding", 0.78)
        } else {
            ObservationData::new(["redness", "mild swelling", "papules"])
                .with_body_part("forearm")
                .with_confidence("redness", 0.88)
                .with_confidence("swelling", 0.65)
        }
    }
}

#[async_trait]
impl ImageObservationService for StubImageObservationService {
    async fn analyze(&self, image: Vec<u8>) -> Result<ObservationData> {
        if image.is_empty() {
            return Err(TriageError::ImageAnalysisFailed("empty image".to_string()));
        }
        let size = image.len();
        let data = tokio::task::spawn_blocking(move || Self::observe(&image))
            .await
            .map_err(|e| TriageError::ImageAnalysisFailed(format!("analysis task failed: {e}")))?;
        debug!(bytes = size, findings = data.findings.len(), "image analysed");
        Ok(data)
    }
}

/// Always reports the same findings. Handy for demos and scripted sessions.
#[derive(Debug, Clone, Default)]
pub struct FixedImageObservationService {
    data: ObservationData,
}

impl FixedImageObservationService {
    pub fn new(data: ObservationData) -> Self {
        Self { data }
    }

    pub fn with_findings<I, S>(findings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ObservationData::new(findings))
    }
}

#[async_trait]
impl ImageObservationService for FixedImageObservationService {
    async fn analyze(&self, _image: Vec<u8>) -> Result<ObservationData> {
        Ok(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_odd_payload_reports_wound() {
        let data = StubImageObservationService::new()
            .analyze(vec![0u8; 3])
            .await
            .unwrap();
        assert!(data.has_finding("open wound"));
        assert!(data.has_finding("bleeding"));
        assert_eq!(data.body_part.as_deref(), Some("leg"));
        assert_eq!(data.confidence.get("open_wound"), Some(&0.92));
    }

    #[tokio::test]
    async fn test_even_payload_reports_redness() {
        let data = StubImageObservationService::new()
            .analyze(vec![0u8; 4])
            .await
            .unwrap();
        assert!(data.has_finding("redness"));
        assert!(!data.has_finding("open wound"));
        assert_eq!(data.body_part.as_deref(), Some("forearm"));
    }

    #[tokio::test]
    async fn test_empty_payload_fails() {
        let err = StubImageObservationService::new()
            .analyze(Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::ImageAnalysisFailed(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fixed_service_ignores_payload() {
        let service = FixedImageObservationService::with_findings(["rash"]);
        let a = service.analyze(vec![1]).await.unwrap();
        let b = service.analyze(vec![1, 2]).await.unwrap();
        assert_eq!(a, b);
        assert!(a.has_finding("rash"));
    }
}
