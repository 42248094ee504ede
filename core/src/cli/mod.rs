pub mod commands;

use crate::ai::BackendKind;
use crate::config::{self, Config};
use crate::error::AppError;
use crate::prompt::AnalysisLanguage;
use crate::salvage::RepairLevel;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "courtside")]
#[command(author, version, about = "Pick balanced badminton doubles teams with an LLM", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Override the config directory (default: ~/.courtside/, env: COURTSIDE_HOME)
    #[arg(long, global = true)]
    pub home: Option<String>,

    /// Log requests and the salvage trail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ask a backend to pick two balanced doubles teams from a room
    Match {
        /// Room JSON file ("-" reads stdin)
        room: PathBuf,

        /// Backend to use (defaults to the configured one)
        #[arg(short, long)]
        backend: Option<BackendKind>,

        /// Model override for the chosen backend
        #[arg(short, long)]
        model: Option<String>,

        /// Language for the analysis and team names
        #[arg(short, long)]
        language: Option<AnalysisLanguage>,
    },

    /// Run the same room through several backends at once
    Compare {
        /// Room JSON file ("-" reads stdin)
        room: PathBuf,

        /// Backends to compare (repeatable; defaults to all three)
        #[arg(short, long = "backend")]
        backends: Vec<BackendKind>,

        /// Language for the analysis and team names
        #[arg(short, long)]
        language: Option<AnalysisLanguage>,
    },

    /// Print the prompt a backend would receive, without calling it
    Prompt {
        /// Room JSON file ("-" reads stdin)
        room: PathBuf,

        /// Backend whose prompt style to use
        #[arg(short, long)]
        backend: Option<BackendKind>,

        /// Language for the analysis and team names
        #[arg(short, long)]
        language: Option<AnalysisLanguage>,
    },

    /// Run the JSON salvage chain over a saved model reply
    Parse {
        /// File holding the raw reply ("-" reads stdin)
        reply: PathBuf,

        /// How much repair to attempt
        #[arg(long, default_value = "lenient")]
        level: RepairLevel,

        /// Model name to record in the result
        #[arg(short, long, default_value = "unknown")]
        model: String,
    },

    /// Show the effective configuration
    Config {
        /// Write the current configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Resolve a potentially relative path to an absolute one.
fn resolve_absolute(path: &Path) -> Result<PathBuf, String> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
    Ok(cwd.join(path))
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<(), String> {
    // Set COURTSIDE_HOME early so config loading uses the override
    if let Some(home) = &cli.home {
        let absolute = resolve_absolute(Path::new(home))?;
        std::env::set_var(config::HOME_VAR, &absolute);
    }

    let config = Config::load().map_err(AppError::from)?;

    match cli.command {
        Commands::Match {
            room,
            backend,
            model,
            language,
        } => commands::matching::run(&config, &room, backend, model, language, cli.format),
        Commands::Compare {
            room,
            backends,
            language,
        } => commands::compare::run(&config, &room, backends, language, cli.format),
        Commands::Prompt {
            room,
            backend,
            language,
        } => commands::prompt::run(&config, &room, backend, language, cli.format),
        Commands::Parse {
            reply,
            level,
            model,
        } => commands::parse::run(&reply, level, &model, cli.format),
        Commands::Config { init } => commands::config::run(&config, init, cli.format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_match_command() {
        let cli = Cli::try_parse_from([
            "courtside",
            "match",
            "room.json",
            "--backend",
            "huggingface",
            "--language",
            "english",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Match {
                room,
                backend,
                model,
                language,
            } => {
                assert_eq!(room, PathBuf::from("room.json"));
                assert_eq!(backend, Some(BackendKind::HuggingFace));
                assert_eq!(model, None);
                assert_eq!(language, Some(AnalysisLanguage::English));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_compare_repeated_backends() {
        let cli = Cli::try_parse_from([
            "courtside", "compare", "-", "-b", "ollama", "-b", "anthropic",
        ])
        .unwrap();
        match cli.command {
            Commands::Compare { backends, .. } => {
                assert_eq!(backends, vec![BackendKind::Ollama, BackendKind::Anthropic]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_level_default() {
        let cli = Cli::try_parse_from(["courtside", "parse", "reply.txt"]).unwrap();
        match cli.command {
            Commands::Parse { level, model, .. } => {
                assert_eq!(level, RepairLevel::Lenient);
                assert_eq!(model, "unknown");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["courtside", "match", "r.json", "-b", "gpt"]).is_err());
    }
}
