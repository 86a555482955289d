use std::time::Duration;

use async_trait::async_trait;
use broll_core::{Judgment, JudgmentOracle, JudgmentRequest, PortResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::OracleConfig;
use crate::error::{OracleError, Result};
use crate::parse::parse_judgment;
use crate::prompt::{load_system_prompt, render_user_message};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

/// Judgment oracle backed by an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaOracle {
    config: OracleConfig,
    system_prompt: String,
    http_client: reqwest::Client,
}

impl OllamaOracle {
    pub fn new(config: OracleConfig) -> Result<Self> {
        config.validate()?;
        let system_prompt = load_system_prompt(config.system_prompt_path.as_deref())?;
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("broll-oracle/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OllamaOracle {
            config,
            system_prompt,
            http_client,
        })
    }

    /// Create an oracle from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OracleConfig::from_env())
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// One chat round trip. Never retried.
    #[instrument(skip_all, fields(model = %self.config.model, round = request.round))]
    pub async fn judge(&self, request: &JudgmentRequest<'_>) -> Result<Judgment> {
        let user_message = render_user_message(request)?;
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            stream: false,
            format: "json",
        };

        let mut http = self.http_client.post(self.config.chat_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "oracle request rejected");
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let chat: ChatResponse = serde_json::from_str(&text)?;
        let content = chat.message.map(|m| m.content).unwrap_or_default();
        debug!(bytes = content.len(), "oracle responded");

        parse_judgment(&content).inspect_err(|e| {
            let preview: String = content.chars().take(200).collect();
            warn!(error = %e, raw = %preview, "unparseable oracle response");
        })
    }
}

#[async_trait]
impl JudgmentOracle for OllamaOracle {
    async fn evaluate(&self, request: &JudgmentRequest<'_>) -> PortResult<Judgment> {
        Ok(self.judge(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let cfg = OracleConfig::new("not-a-url", "m");
        assert!(matches!(
            OllamaOracle::new(cfg),
            Err(OracleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "gemma3",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
            stream: false,
            format: "json",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gemma3");
        assert_eq!(value["stream"], false);
        assert_eq!(value["format"], "json");
        assert_eq!(value["messages"][1]["role"], "user");
    }
}
