//! Grading backend abstraction.
//!
//! A [`GradingClient`] sends a prompt to a language model and reports one
//! of three outcomes. It never returns an error or panics on backend
//! trouble: network, auth, rate-limit, and malformed-reply failures all
//! become [`GradeOutcome::TransportFailure`].
//!
//! [`ChatCompletionsClient`] speaks the OpenAI chat-completions protocol,
//! which Groq (the default) and OpenAI both serve. Transient failures
//! (HTTP 429, 5xx, network errors) are retried with exponential backoff:
//! 1s, 2s, 4s, ... up to `grading.max_retries` extra attempts.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GradingConfig;

/// Result of one grading call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeOutcome {
    /// The model's reply text.
    Success(String),
    /// The backend answered but gave no usable completion (e.g. safety filtering).
    Blocked,
    /// The backend could not be reached or answered with an error.
    TransportFailure(String),
}

#[async_trait]
pub trait GradingClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn grade(&self, prompt: &str) -> GradeOutcome;
}

// ============ Disabled client ============

/// Used when `grading.provider = "disabled"`; every call fails.
pub struct DisabledGradingClient;

#[async_trait]
impl GradingClient for DisabledGradingClient {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn grade(&self, _prompt: &str) -> GradeOutcome {
        GradeOutcome::TransportFailure("grading backend is disabled".to_string())
    }
}

// ============ Chat completions client ============

pub struct ChatCompletionsClient {
    client: reqwest::Client,
    url: String,
    auth_header: String,
    model: String,
    temperature: Option<f32>,
    max_retries: u32,
}

impl ChatCompletionsClient {
    /// Build a client, reading the API key from `grading.api_key_env`
    /// (or the provider's default variable).
    pub fn new(config: &GradingConfig) -> Result<Self> {
        let var = config.api_key_var();
        let api_key = std::env::var(var)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?;
        Self::with_api_key(config, &api_key)
    }

    pub fn with_api_key(config: &GradingConfig, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}/v1/chat/completions",
                config.endpoint().trim_end_matches('/')
            ),
            auth_header: format!("Bearer {}", api_key),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        body
    }
}

#[async_trait]
impl GradingClient for ChatCompletionsClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn grade(&self, prompt: &str) -> GradeOutcome {
        let body = self.request_body(prompt);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.url)
                .header("Authorization", &self.auth_header)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return match response.json::<ChatResponse>().await {
                            Ok(reply) => interpret_reply(reply),
                            Err(e) => GradeOutcome::TransportFailure(format!(
                                "malformed chat completion response: {}",
                                e
                            )),
                        };
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let message = format!("grading API error {}: {}", status, body_text);

                    // Rate limited or server error; retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::debug!(attempt, %status, "grading request failed; retrying");
                        last_err = Some(message);
                        continue;
                    }

                    // Client error (auth, bad request); don't retry
                    return GradeOutcome::TransportFailure(message);
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "grading request failed; retrying");
                    last_err = Some(format!("grading API connection error: {}", e));
                    continue;
                }
            }
        }

        GradeOutcome::TransportFailure(
            last_err.unwrap_or_else(|| "grading failed after retries".to_string()),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn interpret_reply(reply: ChatResponse) -> GradeOutcome {
    let Some(choice) = reply.choices.into_iter().next() else {
        return GradeOutcome::Blocked;
    };
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return GradeOutcome::Blocked;
    }
    match choice.message.and_then(|m| m.content) {
        Some(content) if !content.trim().is_empty() => GradeOutcome::Success(content),
        _ => GradeOutcome::Blocked,
    }
}

/// Create the grading client named by `grading.provider`.
pub fn create_client(config: &GradingConfig) -> Result<Arc<dyn GradingClient>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGradingClient)),
        "groq" | "openai" => Ok(Arc::new(ChatCompletionsClient::new(config)?)),
        other => anyhow::bail!("Unknown grading provider: {}", other),
    }
}
