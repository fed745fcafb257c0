use std::time::Duration;
use tracing::warn;
use triage_flow::TriageConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_IMAGE_ANALYSIS_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Process-level settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub image_analysis_timeout: Duration,
    pub max_image_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            image_analysis_timeout: Duration::from_secs(DEFAULT_IMAGE_ANALYSIS_TIMEOUT_SECS),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            image_analysis_timeout: Duration::from_secs(parse_or(
                "IMAGE_ANALYSIS_TIMEOUT_SECS",
                lookup("IMAGE_ANALYSIS_TIMEOUT_SECS"),
                DEFAULT_IMAGE_ANALYSIS_TIMEOUT_SECS,
            )),
            max_image_bytes: parse_or(
                "MAX_IMAGE_BYTES",
                lookup("MAX_IMAGE_BYTES"),
                defaults.max_image_bytes,
            ),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn triage_config(&self) -> TriageConfig {
        TriageConfig::default().with_image_analysis_timeout(self.image_analysis_timeout)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %value, default = %default, "invalid value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:3000");
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.image_analysis_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_image_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("BIND_ADDR", "127.0.0.1"),
            ("DATABASE_URL", "postgres://localhost/triage"),
            ("IMAGE_ANALYSIS_TIMEOUT_SECS", "3"),
            ("MAX_IMAGE_BYTES", "1024"),
        ]);
        assert_eq!(cfg.listen_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/triage"));
        assert_eq!(cfg.triage_config().image_analysis_timeout, Duration::from_secs(3));
        assert_eq!(cfg.max_image_bytes, 1024);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let cfg = config(&[("PORT", "not-a-port"), ("MAX_IMAGE_BYTES", "-5")]);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
    }

    #[test]
    fn test_blank_database_url_is_ignored() {
        let cfg = config(&[("DATABASE_URL", "  ")]);
        assert!(cfg.database_url.is_none());
    }
}
