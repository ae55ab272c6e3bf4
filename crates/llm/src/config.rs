//! LLM configuration loaded from environment variables.

use std::time::Duration;

/// Default chat-completions base URL.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Temperature used for output generation and rewrites.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Temperature used for scoring; low so repeated runs agree.
pub const DEFAULT_SCORING_TEMPERATURE: f32 = 0.2;

/// Timeout for establishing the HTTP connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for the chat-completions client.
///
/// | Env var                   | Default                     |
/// |---------------------------|-----------------------------|
/// | `LLM_API_URL`             | `https://api.openai.com/v1` |
/// | `LLM_API_KEY`             | unset (simulation mode)     |
/// | `LLM_MODEL`               | `gpt-4o-mini`               |
/// | `LLM_TEMPERATURE`         | `0.7`                       |
/// | `LLM_SCORING_TEMPERATURE` | `0.2`                       |
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub scoring_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            scoring_temperature: DEFAULT_SCORING_TEMPERATURE,
        }
    }
}

impl LlmConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults. A blank `LLM_API_KEY` counts as unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("LLM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_key: std::env::var("LLM_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            temperature: parse_temperature("LLM_TEMPERATURE", defaults.temperature),
            scoring_temperature: parse_temperature(
                "LLM_SCORING_TEMPERATURE",
                defaults.scoring_temperature,
            ),
        }
    }

    /// Without an API key every engine goes straight to its fallback.
    pub fn is_simulation(&self) -> bool {
        self.api_key.is_none()
    }
}

fn parse_temperature(var: &str, default: f32) -> f32 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|t| (0.0..=2.0).contains(t))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_simulation() {
        let config = LlmConfig::default();
        assert!(config.is_simulation());
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn key_enables_live_mode() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(!config.is_simulation());
    }
}
