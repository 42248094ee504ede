//! Local Ollama server, `/api/generate` without streaming.

use super::{http_client, join_url, non_empty, parse_envelope, send_for_body, Backend, BackendError};
use crate::config::BackendSettings;
use crate::prompt::{Prompt, PromptStyle};
use crate::salvage::RepairLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemma3";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const TOP_P: f32 = 0.9;

#[derive(Debug)]
pub struct OllamaBackend {
    client: reqwest::Client,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaBackend {
    pub fn new(settings: &BackendSettings, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: http_client(timeout)?,
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

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn parse_reply(body: &str) -> Result<String, BackendError> {
    let response: GenerateResponse = parse_envelope(body)?;
    if let Some(error) = response.error {
        return Err(BackendError::UnexpectedResponse(error));
    }
    non_empty(response.response)
}

impl Backend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn style(&self) -> PromptStyle {
        PromptStyle::Compact
    }

    fn repair_level(&self) -> RepairLevel {
        RepairLevel::Aggressive
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &self.model,
            system: &prompt.system,
            prompt: &prompt.user,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                top_p: TOP_P,
                num_predict: self.max_tokens,
            },
        };

        log::info!("[ollama] Sending request to {} for model: {}", self.base_url, self.model);
        let request = self
            .client
            .post(join_url(&self.base_url, "api/generate"))
            .json(&body);

        let response = send_for_body(request).await?;
        parse_reply(&response)
    }
}
