pub mod anthropic;
pub mod huggingface;
pub mod ollama;

use crate::config::Config;
use crate::prompt::{Prompt, PromptStyle};
use crate::salvage::{truncate_chars, RepairLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use anthropic::AnthropicBackend;
pub use huggingface::HuggingFaceBackend;
pub use ollama::OllamaBackend;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),
    #[error("Empty response from model")]
    EmptyResponse,
}

/// A text-completion endpoint that can be asked for a matchmaking reply.
///
/// Besides the call itself, each backend states which prompt style suits
/// its model and how much repair its replies usually need.
pub trait Backend {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    fn style(&self) -> PromptStyle;

    fn repair_level(&self) -> RepairLevel;

    /// Whether a Thai `analysis` must actually contain Thai script.
    fn checks_analysis_script(&self) -> bool {
        false
    }

    /// Send the prompt and return the model's raw reply text.
    fn complete(&self, prompt: &Prompt)
        -> impl Future<Output = Result<String, BackendError>> + Send;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Anthropic,
    #[serde(rename = "huggingface")]
    #[cfg_attr(feature = "cli", value(name = "huggingface"))]
    HuggingFace,
    #[default]
    Ollama,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Anthropic,
        BackendKind::HuggingFace,
        BackendKind::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::HuggingFace => "huggingface",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!(
                "Unknown backend '{other}' (expected anthropic, huggingface or ollama)"
            )),
        }
    }
}

/// Any of the built-in backends, chosen at runtime.
#[derive(Debug)]
pub enum AnyBackend {
    Anthropic(AnthropicBackend),
    HuggingFace(HuggingFaceBackend),
    Ollama(OllamaBackend),
}

impl AnyBackend {
    /// Build the backend for `kind` from the effective configuration.
    pub fn from_config(kind: BackendKind, config: &Config) -> Result<Self, BackendError> {
        let timeout = config.timeout();
        let settings = config.settings(kind);
        match kind {
            BackendKind::Anthropic => {
                let key = config
                    .api_key(kind)
                    .ok_or(BackendError::MissingApiKey(anthropic::API_KEY_VAR))?;
                Ok(Self::Anthropic(AnthropicBackend::new(key, settings, timeout)?))
            }
            BackendKind::HuggingFace => Ok(Self::HuggingFace(HuggingFaceBackend::new(
                config.api_key(kind),
                settings,
                timeout,
            )?)),
            BackendKind::Ollama => Ok(Self::Ollama(OllamaBackend::new(settings, timeout)?)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Anthropic(_) => BackendKind::Anthropic,
            Self::HuggingFace(_) => BackendKind::HuggingFace,
            Self::Ollama(_) => BackendKind::Ollama,
        }
    }
}

impl Backend for AnyBackend {
    fn name(&self) -> &'static str {
        match self {
            Self::Anthropic(b) => b.name(),
            Self::HuggingFace(b) => b.name(),
            Self::Ollama(b) => b.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Self::Anthropic(b) => b.model(),
            Self::HuggingFace(b) => b.model(),
            Self::Ollama(b) => b.model(),
        }
    }

    fn style(&self) -> PromptStyle {
        match self {
            Self::Anthropic(b) => b.style(),
            Self::HuggingFace(b) => b.style(),
            Self::Ollama(b) => b.style(),
        }
    }

    fn repair_level(&self) -> RepairLevel {
        match self {
            Self::Anthropic(b) => b.repair_level(),
            Self::HuggingFace(b) => b.repair_level(),
            Self::Ollama(b) => b.repair_level(),
        }
    }

    fn checks_analysis_script(&self) -> bool {
        match self {
            Self::Anthropic(b) => b.checks_analysis_script(),
            Self::HuggingFace(b) => b.checks_analysis_script(),
            Self::Ollama(b) => b.checks_analysis_script(),
        }
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
        match self {
            Self::Anthropic(b) => b.complete(prompt).await,
            Self::HuggingFace(b) => b.complete(prompt).await,
            Self::Ollama(b) => b.complete(prompt).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared HTTP helpers
// ---------------------------------------------------------------------------

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Send a request and return the body, turning non-2xx statuses into
/// `BackendError::Status`.
pub(crate) async fn send_for_body(request: reqwest::RequestBuilder) -> Result<String, BackendError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_owned());
        log::error!("[send_for_body] API request failed with status {status}: {body}");
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.text().await?)
}

/// Parse an API envelope, wrapping failures with a preview of the body.
pub(crate) fn parse_envelope<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        BackendError::UnexpectedResponse(format!("{e}. Body: {}", truncate_chars(body, 500)))
    })
}

/// Reject replies that are empty or whitespace only.
pub(crate) fn non_empty(text: String) -> Result<String, BackendError> {
    if text.trim().is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(text)
}

/// Join a base URL and a path without doubling or dropping the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
