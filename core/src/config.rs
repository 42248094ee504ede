//! Configuration for backends and the pipeline.
//!
//! Stored at `~/.courtside/config.json` (or `$COURTSIDE_HOME/config.json`).
//! Every field is optional; environment variables override the file, and
//! API keys are only ever read from the environment.

use crate::ai::{anthropic, huggingface, BackendKind};
use crate::prompt::AnalysisLanguage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const HOME_VAR: &str = "COURTSIDE_HOME";
pub const BACKEND_VAR: &str = "COURTSIDE_BACKEND";
pub const MODEL_VAR: &str = "COURTSIDE_MODEL";
pub const OLLAMA_URL_VAR: &str = "OLLAMA_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine home directory")]
    Home,
    #[error("{0}")]
    Invalid(String),
}

/// Per-backend overrides. Unset fields fall back to the backend's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub language: AnalysisLanguage,
    pub timeout_secs: u64,
    pub anthropic: BackendSettings,
    pub huggingface: BackendSettings,
    pub ollama: BackendSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            language: AnalysisLanguage::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            anthropic: BackendSettings::default(),
            huggingface: BackendSettings::default(),
            ollama: BackendSettings::default(),
        }
    }
}

/// Return the config root: `$COURTSIDE_HOME` if set, otherwise `~/.courtside/`.
pub fn config_root() -> Result<PathBuf, ConfigError> {
    if let Ok(home) = std::env::var(HOME_VAR) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or(ConfigError::Home)?;
    Ok(home.join(".courtside"))
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_root()?.join("config.json"))
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read a config file, returning defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("[Config::load_from] no config at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save atomically: write a sibling tmp file, then rename over the target.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, &content)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Apply `COURTSIDE_BACKEND`, `COURTSIDE_MODEL` and `OLLAMA_URL`.
    ///
    /// `lookup` stands in for `std::env::var` so tests need not touch the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(BACKEND_VAR).filter(|v| !v.trim().is_empty()) {
            self.backend = backend.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(model) = lookup(MODEL_VAR).filter(|v| !v.trim().is_empty()) {
            self.settings_mut(self.backend).model = Some(model);
        }
        if let Some(url) = lookup(OLLAMA_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.ollama.base_url = Some(url);
        }
        Ok(())
    }

    pub fn settings(&self, kind: BackendKind) -> &BackendSettings {
        match kind {
            BackendKind::Anthropic => &self.anthropic,
            BackendKind::HuggingFace => &self.huggingface,
            BackendKind::Ollama => &self.ollama,
        }
    }

    pub fn settings_mut(&mut self, kind: BackendKind) -> &mut BackendSettings {
        match kind {
            BackendKind::Anthropic => &mut self.anthropic,
            BackendKind::HuggingFace => &mut self.huggingface,
            BackendKind::Ollama => &mut self.ollama,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// API key for `kind` from the environment. Ollama needs none.
    pub fn api_key(&self, kind: BackendKind) -> Option<String> {
        let var = match kind {
            BackendKind::Anthropic => anthropic::API_KEY_VAR,
            BackendKind::HuggingFace => huggingface::API_KEY_VAR,
            BackendKind::Ollama => return None,
        };
        std::env::var(var).ok().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend, BackendKind::Ollama);
        assert_eq!(config.language, AnalysisLanguage::Thai);
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"backend": "anthropic", "anthropic": {"model": "claude-test"}}"#,
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Anthropic);
        assert_eq!(config.anthropic.model.as_deref(), Some("claude-test"));
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.ollama, BackendSettings::default());
    }

    #[test]
    fn test_save_roundtrip_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.language = AnalysisLanguage::English;
        config.ollama.base_url = Some("http://gpu-box:11434".to_owned());
        config.save_to(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                (BACKEND_VAR, "hf"),
                (MODEL_VAR, "mistralai/Mixtral-8x7B-Instruct-v0.1"),
                (OLLAMA_URL_VAR, "http://10.0.0.5:11434"),
            ]))
            .unwrap();
        assert_eq!(config.backend, BackendKind::HuggingFace);
        assert_eq!(
            config.huggingface.model.as_deref(),
            Some("mistralai/Mixtral-8x7B-Instruct-v0.1")
        );
        assert_eq!(config.ollama.base_url.as_deref(), Some("http://10.0.0.5:11434"));
        assert!(config.anthropic.model.is_none());
    }

    #[test]
    fn test_env_rejects_unknown_backend() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[(BACKEND_VAR, "gpt")])).unwrap_err();
        assert!(err.to_string().contains("Unknown backend"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[(BACKEND_VAR, "  "), (MODEL_VAR, "")])).unwrap();
        assert_eq!(config, Config::default());
    }
}
