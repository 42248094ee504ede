use super::print_json;
use crate::ai::BackendKind;
use crate::cli::OutputFormat;
use crate::config::{config_path, Config};
use crate::error::AppError;
use colored::Colorize;

pub fn run(config: &Config, init: bool, format: OutputFormat) -> Result<(), String> {
    let path = config_path().map_err(AppError::from)?;

    if init {
        config.save_to(&path).map_err(AppError::from)?;
        if format == OutputFormat::Text {
            println!("{} Wrote {}", "✓".green(), path.display());
        }
    }

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "path": path,
            "config": config,
            "api_keys": BackendKind::ALL
                .iter()
                .map(|kind| (kind.as_str(), config.api_key(*kind).is_some()))
                .collect::<std::collections::BTreeMap<_, _>>(),
        }));
        return Ok(());
    }

    println!("{}", "Configuration".bold());
    println!("  {} {}", "File:".dimmed(), path.display());
    println!("  {} {}", "Backend:".dimmed(), config.backend.to_string().cyan());
    println!("  {} {:?}", "Language:".dimmed(), config.language);
    println!("  {} {}s", "Timeout:".dimmed(), config.timeout_secs);
    for kind in BackendKind::ALL {
        let settings = config.settings(kind);
        let key = match kind {
            BackendKind::Ollama => "not needed".dimmed(),
            _ if config.api_key(kind).is_some() => "set".green(),
            _ => "missing".yellow(),
        };
        println!();
        println!("{}", kind.as_str().bold());
        println!(
            "  {} {}",
            "Model:".dimmed(),
            settings.model.as_deref().unwrap_or("(default)")
        );
        println!(
            "  {} {}",
            "URL:".dimmed(),
            settings.base_url.as_deref().unwrap_or("(default)")
        );
        println!("  {} {}", "API key:".dimmed(), key);
    }
    Ok(())
}
