use super::{print_json, print_result_text, read_input};
use crate::cli::OutputFormat;
use crate::error::AppError;
use crate::result::MatchmakingResult;
use crate::salvage::{salvage, RepairLevel};
use colored::Colorize;
use std::path::Path;

pub fn run(reply_path: &Path, level: RepairLevel, model: &str, format: OutputFormat) -> Result<(), String> {
    let reply = read_input(reply_path)?;

    let salvaged = match salvage(&reply, level) {
        Ok(salvaged) => salvaged,
        Err(e) => {
            if format == OutputFormat::Json {
                print_json(&serde_json::json!({
                    "error": e.to_string(),
                    "debug_info": &e.debug,
                }));
            } else {
                eprintln!("{} {}", "✗".red(), e);
                if let Some(cleaned) = &e.debug.cleaned_json {
                    eprintln!("  {} {}", "cleaned:".dimmed(), cleaned);
                }
                if let Some(fixed) = &e.debug.fixed_json {
                    eprintln!("  {} {}", "fixed:".dimmed(), fixed);
                }
            }
            return Err(AppError::from(e).into());
        }
    };

    let result = MatchmakingResult::from_value(&salvaged.value, model)
        .map_err(|e| AppError::parse(e.to_string()))?;

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "repaired": salvaged.repaired,
            "debug_info": salvaged.debug,
            "result": result,
        }));
        return Ok(());
    }

    if salvaged.repaired {
        println!("{}", "Reply needed repair before it parsed".yellow());
    }
    print_result_text(&result);
    if result.teams.len() < 2 {
        println!();
        println!(
            "{} expected 2 teams, found {}",
            "!".yellow(),
            result.teams.len()
        );
    }
    Ok(())
}
