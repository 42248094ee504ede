//! Recover a JSON payload from free-text model output.
//!
//! Models are asked for bare JSON but routinely wrap it in markdown fences,
//! surround it with prose, use single quotes, leave `//` comments from the
//! schema example in place, or add trailing commas. The functions here peel
//! those layers off in a fixed order; `salvage` chains them according to a
//! `RepairLevel`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Length of the previews kept in `DebugInfo`.
pub const PREVIEW_CHARS: usize = 200;

static SINGLE_QUOTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*)':\s*").unwrap());
static SINGLE_QUOTED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*'([^']*)'").unwrap());
static TRAILING_COMMA_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\}").unwrap());
static TRAILING_COMMA_ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*\]").unwrap());
static GREEDY_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// How hard to work before giving up on a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum RepairLevel {
    /// Strip a surrounding code fence and parse once.
    Strict,
    /// Extract the JSON span, and on failure repair it and parse again.
    #[default]
    Lenient,
    /// Lenient, plus newline removal and a final greedy `{...}` retry.
    Aggressive,
}

/// Intermediate texts seen while salvaging, truncated for logging and
/// error reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_json: Option<String>,
}

impl DebugInfo {
    pub fn is_empty(&self) -> bool {
        self.raw_response.is_none() && self.cleaned_json.is_none() && self.fixed_json.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Salvaged {
    pub value: Value,
    pub debug: DebugInfo,
    /// True when the text only parsed after `repair_json`.
    pub repaired: bool,
}

#[derive(Error, Debug)]
#[error("Could not parse AI response as JSON: {source}")]
pub struct SalvageError {
    pub source: serde_json::Error,
    pub debug: DebugInfo,
}

/// Keep the first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `truncate_chars` to `PREVIEW_CHARS`, marking the cut with `...`.
pub fn preview(text: &str) -> String {
    let head = truncate_chars(text, PREVIEW_CHARS);
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head.to_owned()
    }
}

/// Remove one leading ```` ```json ```` / ```` ``` ```` marker and one
/// trailing ```` ``` ````. Nothing else is touched.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Pick the most plausible JSON substring out of a model reply.
///
/// Tried in order: a ```` ```json ```` block, any fenced block (a language
/// tag on the fence line is skipped), the span from the first `{` to the last `}`. A reply
/// cut off mid-object yields everything from the first `{`. When none of
/// these apply the trimmed text is returned as is.
pub fn extract_json_str(output: &str) -> &str {
    let trimmed = output.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_marker = &trimmed[start + 7..];
        if let Some(end) = after_marker.find("```") {
            return after_marker[..end].trim();
        }
        return after_marker.trim();
    }

    if let Some(start) = trimmed.find("```") {
        let after_marker = &trimmed[start + 3..];
        let body = skip_language_tag(after_marker);
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
        return body.trim();
    }

    if let Some(start) = trimmed.find('{') {
        return match trimmed.rfind('}') {
            Some(end) if end > start => &trimmed[start..=end],
            _ => &trimmed[start..],
        };
    }

    trimmed
}

/// Skip the rest of the fence line when it is a language tag. A line that
/// already holds `{` or `[` is payload and is kept.
fn skip_language_tag(after_fence: &str) -> &str {
    let line_end = after_fence.find('\n').unwrap_or(after_fence.len());
    let first_line = &after_fence[..line_end];
    if first_line.contains(['{', '[']) {
        return after_fence;
    }
    after_fence.get(line_end + 1..).unwrap_or("")
}

/// Drop `//` comments that sit outside string literals.
fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                // Skip to end of line, keeping the newline itself.
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Apply the common syntax repairs: comments, single quotes, trailing commas.
pub fn repair_json(text: &str) -> String {
    let text = strip_line_comments(text);
    let text = SINGLE_QUOTED_KEY.replace_all(&text, "\"$1\": ");
    let text = SINGLE_QUOTED_VALUE.replace_all(&text, ": \"$1\"");
    let text = TRAILING_COMMA_OBJECT.replace_all(&text, "}");
    let text = TRAILING_COMMA_ARRAY.replace_all(&text, "]");
    text.into_owned()
}

/// Remove line breaks. Raw newlines inside string values are invalid JSON,
/// and some local models emit them.
pub fn collapse_newlines(text: &str) -> String {
    text.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Run the salvage chain for `level` over a raw reply.
pub fn salvage(text: &str, level: RepairLevel) -> Result<Salvaged, SalvageError> {
    let mut debug = DebugInfo {
        raw_response: Some(preview(text)),
        ..DebugInfo::default()
    };

    if level == RepairLevel::Strict {
        let cleaned = strip_fences(text);
        debug.cleaned_json = Some(preview(cleaned));
        return match serde_json::from_str(cleaned) {
            Ok(value) => Ok(Salvaged {
                value,
                debug,
                repaired: false,
            }),
            Err(source) => Err(SalvageError { source, debug }),
        };
    }

    let cleaned = extract_json_str(text);
    debug.cleaned_json = Some(preview(cleaned));
    if let Ok(value) = serde_json::from_str(cleaned) {
        return Ok(Salvaged {
            value,
            debug,
            repaired: false,
        });
    }

    let mut fixed = repair_json(cleaned);
    if level == RepairLevel::Aggressive {
        fixed = collapse_newlines(&fixed);
    }
    debug.fixed_json = Some(preview(&fixed));

    let mut outcome = serde_json::from_str::<Value>(&fixed);
    if outcome.is_err() && level == RepairLevel::Aggressive {
        if let Some(span) = GREEDY_OBJECT.find(&fixed) {
            outcome = serde_json::from_str(span.as_str());
        }
    }

    match outcome {
        Ok(value) => {
            log::warn!("[salvage] reply only parsed after repair ({level:?})");
            Ok(Salvaged {
                value,
                debug,
                repaired: true,
            })
        }
        Err(source) => Err(SalvageError { source, debug }),
    }
}
