use super::{load_room, print_failure_text, print_json, print_result_text, with_overrides};
use crate::ai::{AnyBackend, Backend, BackendKind};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::AppError;
use crate::matchmaking::{generate_all, MatchOptions};
use crate::prompt::AnalysisLanguage;
use colored::Colorize;
use std::path::Path;

pub fn run(
    config: &Config,
    room_path: &Path,
    backends: Vec<BackendKind>,
    language: Option<AnalysisLanguage>,
    format: OutputFormat,
) -> Result<(), String> {
    let room = load_room(room_path)?;
    let config = with_overrides(config, None, None, language);
    let kinds = if backends.is_empty() {
        BackendKind::ALL.to_vec()
    } else {
        backends
    };

    // Backends that cannot be built (e.g. a missing API key) are reported
    // and skipped rather than failing the whole comparison.
    let mut built = Vec::new();
    let mut skipped = Vec::new();
    for kind in kinds {
        match AnyBackend::from_config(kind, &config) {
            Ok(backend) => built.push(backend),
            Err(e) => skipped.push((kind, AppError::from_backend(e, kind))),
        }
    }

    if built.is_empty() {
        let reasons: Vec<String> = skipped.iter().map(|(_, e)| e.to_string()).collect();
        return Err(format!("No backend available: {}", reasons.join("; ")));
    }

    let options = MatchOptions {
        language: config.language,
    };
    let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    let outcomes = rt.block_on(generate_all(&built, &room, &options));
    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();

    if format == OutputFormat::Json {
        let mut entries: Vec<serde_json::Value> = built
            .iter()
            .zip(&outcomes)
            .map(|(backend, outcome)| match outcome {
                Ok(result) => serde_json::json!({
                    "backend": backend.kind(),
                    "result": result,
                }),
                Err(failure) => serde_json::json!({
                    "backend": backend.kind(),
                    "failure": failure,
                }),
            })
            .collect();
        entries.extend(skipped.iter().map(|(kind, err)| {
            serde_json::json!({
                "backend": kind,
                "skipped": err,
            })
        }));
        print_json(&entries);
    } else {
        for (backend, outcome) in built.iter().zip(&outcomes) {
            println!("{}", format!("== {} ==", backend.name()).bold());
            match outcome {
                Ok(result) => print_result_text(result),
                Err(failure) => print_failure_text(failure),
            }
            println!();
        }
        for (kind, err) in &skipped {
            println!("{} {} {}", "skipped".yellow(), kind, err.to_string().dimmed());
        }
        println!(
            "{} {}/{} backends produced a matchup",
            "✓".green(),
            succeeded,
            built.len()
        );
    }

    if succeeded == 0 {
        return Err("Every backend failed".to_owned());
    }
    Ok(())
}
