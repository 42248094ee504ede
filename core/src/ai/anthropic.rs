//! Anthropic Messages API.

use super::{http_client, join_url, non_empty, parse_envelope, send_for_body, Backend, BackendError};
use crate::config::BackendSettings;
use crate::prompt::{Prompt, PromptStyle};
use crate::salvage::RepairLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug)]
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicBackend {
    pub fn new(
        api_key: String,
        settings: &BackendSettings,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            temperature: settings.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }
}

/// The reply text is the first text block of `content`.
fn parse_reply(body: &str) -> Result<String, BackendError> {
    let response: MessagesResponse = parse_envelope(body)?;
    let text = response
        .content
        .into_iter()
        .find_map(|block| block.text)
        .ok_or(BackendError::EmptyResponse)?;
    non_empty(text)
}

impl Backend for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn style(&self) -> PromptStyle {
        PromptStyle::Detailed
    }

    fn repair_level(&self) -> RepairLevel {
        RepairLevel::Strict
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let body = MessagesRequest {
            model: &self.model,
            system: &prompt.system,
            messages: [Message {
                role: "user",
                content: &prompt.user,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        log::info!("[anthropic] Sending request for model: {}", self.model);
        let request = self
            .client
            .post(join_url(&self.base_url, "v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let response = send_for_body(request).await?;
        parse_reply(&response)
    }
}
