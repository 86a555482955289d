//! Oracle endpoint configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OracleError, Result};

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gemma3:27b-cloud";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Oracle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL of an Ollama-compatible server
    pub host: String,
    /// Bearer token (optional for local servers)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Chat model name
    pub model: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Replaces the built-in system prompt when set
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            host: std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            api_key: std::env::var("OLLAMA_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("BROLL_ORACLE_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout_secs: std::env::var("BROLL_ORACLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            system_prompt_path: None,
        }
    }
}

impl OracleConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific server and model
    pub fn new(host: &str, model: &str) -> Self {
        OracleConfig {
            host: host.to_string(),
            api_key: None,
            model: model.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            system_prompt_path: None,
        }
    }

    /// Set authentication token
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_system_prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_prompt_path = Some(path.into());
        self
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(OracleError::InvalidConfig(format!(
                "host must be an http(s) URL, got {:?}",
                self.host
            )));
        }
        if self.model.trim().is_empty() {
            return Err(OracleError::InvalidConfig("model is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(OracleError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_url_strips_trailing_slash() {
        let cfg = OracleConfig::new("http://gpu-box:11434/", "m");
        assert_eq!(cfg.chat_url(), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn test_builders() {
        let cfg = OracleConfig::new("https://ollama.example", "gemma3")
            .with_api_key("secret")
            .with_timeout_secs(30)
            .with_system_prompt_path("prompt.md");
        assert_eq!(cfg.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.system_prompt_path, Some(PathBuf::from("prompt.md")));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_host_and_timeout() {
        assert!(OracleConfig::new("localhost:11434", "m").validate().is_err());
        assert!(OracleConfig::new("http://h", "m")
            .with_timeout_secs(0)
            .validate()
            .is_err());
        assert!(OracleConfig::new("http://h", " ").validate().is_err());
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let cfg = OracleConfig::new("http://h", "m").with_api_key("secret");
        let out = toml::to_string(&cfg).unwrap();
        assert!(!out.contains("secret"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: OracleConfig = toml::from_str(r#"model = "llama3""#).unwrap();
        assert_eq!(cfg.model, "llama3");
        assert!(cfg.timeout_secs > 0);
    }
}
