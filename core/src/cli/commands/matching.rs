use super::{load_room, print_failure_text, print_json, print_result_text, with_overrides};
use crate::ai::{AnyBackend, Backend, BackendKind};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::AppError;
use crate::matchmaking::{generate_matchmaking, MatchOptions};
use crate::prompt::AnalysisLanguage;
use colored::Colorize;
use std::path::Path;

pub fn run(
    config: &Config,
    room_path: &Path,
    backend: Option<BackendKind>,
    model: Option<String>,
    language: Option<AnalysisLanguage>,
    format: OutputFormat,
) -> Result<(), String> {
    let room = load_room(room_path)?;
    let config = with_overrides(config, backend, model, language);
    let backend = AnyBackend::from_config(config.backend, &config)
        .map_err(|e| AppError::from_backend(e, config.backend))?;
    let options = MatchOptions {
        language: config.language,
    };

    if format == OutputFormat::Text {
        eprintln!(
            "Matching {} players with {} ({})...",
            room.players.len().to_string().cyan(),
            backend.name(),
            backend.model()
        );
    }

    let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    let outcome = rt.block_on(generate_matchmaking(&backend, &room, &options));

    match outcome {
        Ok(result) => {
            if format == OutputFormat::Json {
                print_json(&result);
            } else {
                print_result_text(&result);
            }
            Ok(())
        }
        Err(failure) => {
            if format == OutputFormat::Json {
                print_json(&failure);
            } else {
                print_failure_text(&failure);
            }
            Err(AppError::from(failure).into())
        }
    }
}
