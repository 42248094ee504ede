use serde::Serialize;
use thiserror::Error;

/// Unified error type for callers of the library.
///
/// Serializes with a `type` tag so a front end can branch on the kind of
/// failure without parsing messages.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Room error: {message}")]
    Room { message: String },

    #[error("Backend error ({backend}): {message}")]
    Backend { message: String, backend: String },

    #[error("Matchmaking failed: {message}")]
    Matchmaking { message: String, model: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl AppError {
    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a Room error
    pub fn room(message: impl Into<String>) -> Self {
        Self::Room {
            message: message.into(),
        }
    }

    /// Create a Backend error naming the backend that failed
    pub fn backend(message: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            backend: backend.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a Backend error from a backend that failed to build or answer
    pub fn from_backend(err: crate::ai::BackendError, kind: crate::ai::BackendKind) -> Self {
        Self::backend(err.to_string(), kind.as_str())
    }

    /// Check if this error is recoverable (user can retry or take action)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Network calls and model output vary between attempts
            Self::Backend { .. } | Self::Matchmaking { .. } | Self::Io { .. } => true,
            // Bad input stays bad until the user fixes it
            Self::Config { .. } | Self::Room { .. } | Self::Parse { .. } => false,
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::Io(e) => AppError::io(e.to_string()),
            ConfigError::Json(e) => AppError::config(format!("JSON: {e}")),
            ConfigError::Home => AppError::config("Could not determine home directory"),
            ConfigError::Invalid(msg) => AppError::config(msg),
        }
    }
}

impl From<crate::room::RoomError> for AppError {
    fn from(err: crate::room::RoomError) -> Self {
        use crate::room::RoomError;
        match err {
            RoomError::Io(e) => AppError::io(e.to_string()),
            RoomError::Json(e) => AppError::room(e.to_string()),
        }
    }
}

impl From<crate::matchmaking::MatchmakingFailure> for AppError {
    fn from(failure: crate::matchmaking::MatchmakingFailure) -> Self {
        use crate::matchmaking::MatchmakingError;
        match failure.cause {
            MatchmakingError::NotEnoughPlayers(_) => AppError::room(failure.error),
            _ => AppError::Matchmaking {
                message: failure.error,
                model: failure.model_used,
            },
        }
    }
}

impl From<crate::salvage::SalvageError> for AppError {
    fn from(err: crate::salvage::SalvageError) -> Self {
        AppError::parse(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::io(err.to_string())
    }
}

// Convert to String for CLI command errors
impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = AppError::backend("timed out", "ollama");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"Backend\""));
        assert!(json.contains("\"message\":\"timed out\""));
        assert!(json.contains("\"backend\":\"ollama\""));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(AppError::backend("503", "huggingface").is_recoverable());
        assert!(AppError::io("reset").is_recoverable());
        assert!(!AppError::room("no players").is_recoverable());
        assert!(!AppError::config("bad backend").is_recoverable());
        assert!(!AppError::parse("bad json").is_recoverable());
    }

    #[test]
    fn test_from_config_error() {
        let err: AppError = crate::config::ConfigError::Invalid("Unknown backend 'x'".to_owned()).into();
        match err {
            AppError::Config { message } => assert_eq!(message, "Unknown backend 'x'"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_from_backend_names_the_backend() {
        let err = AppError::from_backend(
            crate::ai::BackendError::MissingApiKey("ANTHROPIC_API_KEY"),
            crate::ai::BackendKind::Anthropic,
        );
        assert_eq!(
            err.to_string(),
            "Backend error (anthropic): ANTHROPIC_API_KEY is not set"
        );

        let err = AppError::from_backend(
            crate::ai::BackendError::EmptyResponse,
            crate::ai::BackendKind::HuggingFace,
        );
        match err {
            AppError::Backend { backend, .. } => assert_eq!(backend, "huggingface"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_into_string() {
        let s: String = AppError::parse("oops").into();
        assert_eq!(s, "Parse error: oops");
    }
}
