//! Semantic advisor configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

/// Connection settings for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Call the advisor at all; when false every analysis is marked degraded
    pub enabled: bool,
    /// API root, e.g. http://localhost:11434/v1
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key, if any
    pub api_key_env: String,
    /// Per-attempt timeout in seconds (default: 60)
    pub timeout_secs: u64,
    /// Pause before the single retry, in milliseconds
    pub retry_backoff_ms: u64,
    pub temperature: f32,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "mistral".to_string(),
            api_key_env: "RIPPLE_ADVISOR_API_KEY".to_string(),
            timeout_secs: 60,
            retry_backoff_ms: 250,
            temperature: 0.2,
        }
    }
}

impl AdvisorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.base_url.is_empty() {
            return Err(AdvisorError::ConfigError(
                "advisor base_url cannot be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AdvisorError::ConfigError(format!(
                "advisor base_url must be http(s): {}",
                self.base_url
            )));
        }
        if self.model.is_empty() {
            return Err(AdvisorError::ConfigError(
                "advisor model cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AdvisorError::ConfigError(
                "advisor timeout_secs must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AdvisorError::ConfigError(format!(
                "advisor temperature {} outside 0.0-2.0",
                self.temperature
            )));
        }
        Ok(())
    }
}
