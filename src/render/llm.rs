//! LLM-backed renderer over an OpenAI-compatible chat completions API

use std::env;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::prompts;
use super::Renderer;
use crate::domain::CompressionLevel;
use crate::error::{RenderError, RenderResult};

/// Configuration for the LLM renderer
#[derive(Debug, Clone)]
pub struct LlmRendererConfig {
    /// Model to render with
    pub model: String,
    /// API base URL (OpenAI-compatible)
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Total time to keep retrying transient failures, in seconds
    pub retry_window_secs: u64,
}

impl Default for LlmRendererConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 300,
            retry_window_secs: 120,
        }
    }
}

/// Renderer that rewrites content through a language model using the
/// per-level prompt templates. Transient failures (network, 5xx, rate
/// limits) retry with exponential backoff inside a bounded window.
pub struct LlmRenderer {
    client: reqwest::Client,
    api_key: String,
    config: LlmRendererConfig,
}

impl LlmRenderer {
    /// Create a renderer. Fails when the API key variable is unset.
    pub fn new(config: LlmRendererConfig) -> RenderResult<Self> {
        let api_key = env::var(&config.api_key_env).map_err(|_| RenderError::Api {
            status: 401,
            message: format!("environment variable {} not set", config.api_key_env),
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            config,
        })
    }

    async fn complete(&self, prompt: &str) -> RenderResult<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), request)
            .await
            .map_err(|_| RenderError::Timeout(self.config.timeout_secs))?
            .map_err(|e| RenderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RenderError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RenderError::Network(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(RenderError::Empty)
    }

    fn is_transient(error: &RenderError) -> bool {
        match error {
            RenderError::Timeout(_) | RenderError::Network(_) => true,
            RenderError::Api { status, .. } => *status == 429 || *status >= 500,
            RenderError::Empty => false,
        }
    }
}

#[async_trait]
impl Renderer for LlmRenderer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn render(
        &self,
        path: &Path,
        content: &str,
        level: CompressionLevel,
    ) -> RenderResult<String> {
        let Some(template) = prompts::template_for(path, level) else {
            return Ok(content.to_string());
        };
        let prompt = prompts::fill(template, content);

        debug!(path = %path.display(), level = %level, "rendering");

        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::from_secs(self.config.retry_window_secs)))
            .build();

        backoff::future::retry(policy, || async {
            self.complete(&prompt).await.map_err(|e| {
                if Self::is_transient(&e) {
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmRenderer::is_transient(&RenderError::Timeout(10)));
        assert!(LlmRenderer::is_transient(&RenderError::Network(
            "reset".to_string()
        )));
        assert!(LlmRenderer::is_transient(&RenderError::Api {
            status: 429,
            message: String::new()
        }));
        assert!(LlmRenderer::is_transient(&RenderError::Api {
            status: 503,
            message: String::new()
        }));
        assert!(!LlmRenderer::is_transient(&RenderError::Api {
            status: 400,
            message: String::new()
        }));
        assert!(!LlmRenderer::is_transient(&RenderError::Empty));
    }
}
