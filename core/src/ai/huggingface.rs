//! Hugging Face Inference API, text-generation task.

use super::{http_client, join_url, non_empty, parse_envelope, send_for_body, Backend, BackendError};
use crate::config::BackendSettings;
use crate::prompt::{Prompt, PromptStyle};
use crate::salvage::RepairLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_KEY_VAR: &str = "HUGGINGFACE_API_KEY";
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const TOP_P: f32 = 0.95;

#[derive(Debug)]
pub struct HuggingFaceBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

/// The endpoint answers with a list, a bare object, or an error object
/// depending on the model and its loading state.
#[derive(Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    List(Vec<Generated>),
    Single(Generated),
    Error { error: String },
}

impl HuggingFaceBackend {
    pub fn new(
        api_key: Option<String>,
        settings: &BackendSettings,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        if api_key.is_none() {
            log::warn!("[huggingface] {API_KEY_VAR} is not set; sending unauthenticated requests");
        }
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

    fn endpoint(&self) -> String {
        join_url(&self.base_url, &format!("models/{}", self.model))
    }
}

fn parse_reply(body: &str) -> Result<String, BackendError> {
    let text = match parse_envelope::<GenerationResponse>(body)? {
        GenerationResponse::List(items) => items
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or(BackendError::EmptyResponse)?,
        GenerationResponse::Single(g) => g.generated_text,
        GenerationResponse::Error { error } => return Err(BackendError::UnexpectedResponse(error)),
    };
    non_empty(text)
}

impl Backend for HuggingFaceBackend {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn style(&self) -> PromptStyle {
        PromptStyle::Instruct
    }

    fn repair_level(&self) -> RepairLevel {
        RepairLevel::Lenient
    }

    // Mistral often drifts back to English mid-answer.
    fn checks_analysis_script(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let inputs = prompt.to_instruct();
        let body = GenerationRequest {
            inputs: &inputs,
            parameters: GenerationParameters {
                max_new_tokens: self.max_tokens,
                temperature: self.temperature,
                top_p: TOP_P,
                return_full_text: false,
            },
        };

        log::info!("[huggingface] Sending request for model: {}", self.model);
        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = send_for_body(request).await?;
        parse_reply(&response)
    }
}
