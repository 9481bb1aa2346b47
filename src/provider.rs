//! Completion providers for the generation stage.
//!
//! - **[`DisabledProvider`]**: always errors; used when generation is not configured.
//! - **[`OpenAIProvider`]**: calls an OpenAI-compatible chat completions
//!   endpoint with the metadata tool schema and retry/backoff.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use component_manifest_core::generation::{strip_code_fence, CompletionProvider, CompletionRequest};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GenerationConfig;

// ============ Disabled Provider ============

/// A provider that refuses every request.
pub struct DisabledProvider;

#[async_trait]
impl CompletionProvider for DisabledProvider {
    fn provider_name(&self) -> &str {
        "disabled"
    }
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn complete(&self, _request: &CompletionRequest) -> Result<Value> {
        bail!("Generation provider is disabled; set [generation].provider in the config")
    }
}

// ============ OpenAI Provider ============

/// OpenAI-compatible chat completions provider.
///
/// Reads the API key from the environment variable named by
/// `generation.api_key_env` at construction.
pub struct OpenAIProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_retries: u32,
    temperature: Option<f32>,
}

impl OpenAIProvider {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("generation.model required for OpenAI provider"))?;
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model,
            max_retries: config.max_retries,
            temperature: config.temperature,
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            if let [only] = request.tools.as_slice() {
                body["tool_choice"] = json!({ "type": "function", "function": { "name": only.name } });
            }
        }
        body
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        let body = self.request_body(request);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, ?delay, "retrying completion request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        debug!(model = %self.model, "completion received");
                        return parse_chat_response(&json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("completion API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("completion API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("completion failed after retries")))
    }
}

/// Pull the structured payload out of a chat completions response.
///
/// Prefers the first tool call's arguments; otherwise parses the message
/// content as JSON, tolerating a surrounding code fence.
pub fn parse_chat_response(json: &Value) -> Result<Value> {
    let message = json
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow!("Invalid completion response: missing choices[0].message"))?;

    if let Some(args) = message
        .pointer("/tool_calls/0/function/arguments")
        .and_then(Value::as_str)
    {
        return serde_json::from_str(args)
            .map_err(|e| anyhow!("tool call arguments are not JSON: {}", e));
    }

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Invalid completion response: no tool call or content"))?;
    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| anyhow!("completion content is not JSON: {}", e))
}

/// Create the provider named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
pub fn create_provider(config: &GenerationConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call_arguments() {
        let json = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "type": "function",
                        "function": {
                            "name": "record_component_metadata",
                            "arguments": "{\"description\":\"A button\"}"
                        }
                    }]
                }
            }]
        });
        let payload = parse_chat_response(&json).unwrap();
        assert_eq!(payload["description"], "A button");
    }

    #[test]
    fn test_parse_fenced_content() {
        let json = json!({
            "choices": [{ "message": { "content": "```json\n{\"description\":\"Card\"}\n```" } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap()["description"], "Card");
    }

    #[test]
    fn test_parse_rejects_missing_message() {
        assert!(parse_chat_response(&json!({ "choices": [] })).is_err());
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let provider = create_provider(&GenerationConfig::default()).unwrap();
        assert_eq!(provider.provider_name(), "disabled");
        let request = CompletionRequest {
            system: String::new(),
            prompt: String::new(),
            tools: Vec::new(),
        };
        assert!(provider.complete(&request).await.is_err());
    }
}
