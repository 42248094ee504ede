//! Courtside library - badminton doubles matchmaking through LLM backends.
//!
//! This crate provides:
//! - Room and player records (`room`)
//! - Prompt construction per backend style (`prompt`)
//! - Text-completion backends: Anthropic, Hugging Face, Ollama (`ai`)
//! - Recovery of JSON from free-text model replies (`salvage`)
//! - The parsed matchmaking record (`result`)
//! - The end-to-end pipeline (`matchmaking`)
//! - Configuration (`config`)
//!
//! Feature flags:
//! - `cli`: Command-line interface

pub mod ai;
pub mod config;
pub mod error;
pub mod matchmaking;
pub mod prompt;
pub mod result;
pub mod room;
pub mod salvage;

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use ai::{AnyBackend, Backend, BackendKind};
pub use matchmaking::{generate_matchmaking, MatchOptions, MatchmakingFailure};
pub use result::MatchmakingResult;
pub use room::{Player, Room, SkillTier};
