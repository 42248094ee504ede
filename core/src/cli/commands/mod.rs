pub mod compare;
pub mod config;
pub mod matching;
pub mod parse;
pub mod prompt;

use crate::ai::BackendKind;
use crate::config::Config;
use crate::error::AppError;
use crate::matchmaking::MatchmakingFailure;
use crate::prompt::AnalysisLanguage;
use crate::result::MatchmakingResult;
use crate::room::Room;
use colored::Colorize;
use std::io::Read;
use std::path::Path;

/// Read a file, or stdin when the path is "-".
fn read_input(path: &Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(AppError::from)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| AppError::from(e).into())
}

fn load_room(path: &Path) -> Result<Room, String> {
    let content = read_input(path)?;
    Room::from_json(&content).map_err(|e| AppError::from(e).into())
}

/// Apply command-line overrides on top of the loaded configuration.
fn with_overrides(
    config: &Config,
    backend: Option<BackendKind>,
    model: Option<String>,
    language: Option<AnalysisLanguage>,
) -> Config {
    let mut config = config.clone();
    if let Some(backend) = backend {
        config.backend = backend;
    }
    if let Some(model) = model {
        config.settings_mut(config.backend).model = Some(model);
    }
    if let Some(language) = language {
        config.language = language;
    }
    config
}

/// Serialize a value as pretty-printed JSON and print it to stdout.
fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("failed to serialize JSON output")
    );
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_owned(), |s| format!("{s:.0}"))
}

fn print_result_text(result: &MatchmakingResult) {
    println!("{}", "Matchup".bold());
    println!("  {} {}", "Model:".dimmed(), result.model_used);
    println!(
        "  {} {}",
        "Balance:".dimmed(),
        format_score(result.match_summary.balance_score).green()
    );
    println!();

    for team in &result.teams {
        println!(
            "{} {}",
            team.team_name.bold(),
            format!("(compatibility {})", format_score(team.compatibility_score)).dimmed()
        );
        for player in &team.players {
            println!(
                "  {} {} {}",
                format!("#{}", player.id).dimmed(),
                player.name,
                player.skill.cyan()
            );
        }
    }

    if !result.analysis.is_empty() {
        println!();
        println!("{}", "Analysis".bold());
        for line in result.analysis.lines() {
            println!("  {line}");
        }
    }
}

fn print_failure_text(failure: &MatchmakingFailure) {
    eprintln!("{} {}", "✗".red(), failure.error);
    if let Some(raw) = &failure.raw_response {
        eprintln!("{}", "Raw response:".dimmed());
        for line in raw.lines().take(20) {
            eprintln!("  {}", line.dimmed());
        }
    }
}
