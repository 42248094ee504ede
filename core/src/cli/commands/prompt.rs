use super::{load_room, print_json, with_overrides};
use crate::ai::{anthropic, huggingface, ollama, BackendKind};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::prompt::{build_prompt, AnalysisLanguage, PromptStyle};
use colored::Colorize;
use std::path::Path;

fn style_for(kind: BackendKind) -> PromptStyle {
    match kind {
        BackendKind::Anthropic => PromptStyle::Detailed,
        BackendKind::HuggingFace => PromptStyle::Instruct,
        BackendKind::Ollama => PromptStyle::Compact,
    }
}

fn default_model(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Anthropic => anthropic::DEFAULT_MODEL,
        BackendKind::HuggingFace => huggingface::DEFAULT_MODEL,
        BackendKind::Ollama => ollama::DEFAULT_MODEL,
    }
}

pub fn run(
    config: &Config,
    room_path: &Path,
    backend: Option<BackendKind>,
    language: Option<AnalysisLanguage>,
    format: OutputFormat,
) -> Result<(), String> {
    let room = load_room(room_path)?;
    let config = with_overrides(config, backend, None, language);
    let kind = config.backend;
    let style = style_for(kind);
    let prompt = build_prompt(&room, style, config.language);

    if format == OutputFormat::Json {
        let model = config
            .settings(kind)
            .model
            .clone()
            .unwrap_or_else(|| default_model(kind).to_owned());
        print_json(&serde_json::json!({
            "backend": kind,
            "model": model,
            "style": style,
            "system": prompt.system,
            "user": prompt.user,
        }));
        return Ok(());
    }

    // Hugging Face receives a single instruct-wrapped string
    if kind == BackendKind::HuggingFace {
        println!("{}", prompt.to_instruct());
        return Ok(());
    }

    println!("{}", "System".bold());
    println!("{}", prompt.system);
    println!();
    println!("{}", "User".bold());
    println!("{}", prompt.user);
    Ok(())
}
