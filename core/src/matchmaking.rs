//! The matchmaking pipeline: prompt, call, salvage, check.

use crate::ai::{Backend, BackendError};
use crate::prompt::{build_prompt, AnalysisLanguage};
use crate::result::MatchmakingResult;
use crate::room::Room;
use crate::salvage::{salvage, truncate_chars, DebugInfo, SalvageError};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;

/// A doubles match needs four players.
pub const MIN_PLAYERS: usize = 4;

/// How much of an unparseable reply is kept in the failure record.
pub const RAW_RESPONSE_CHARS: usize = 1000;

/// Replaces an analysis that was supposed to be Thai but contains no Thai
/// script ("the system could not produce a Thai analysis, please check the
/// prompt").
pub const THAI_ANALYSIS_NOTICE: &str =
    "ระบบไม่สามารถวิเคราะห์เป็นภาษาไทยได้ กรุณาตรวจสอบ prompt อีกครั้ง";

#[derive(Error, Debug)]
pub enum MatchmakingError {
    #[error("Room needs at least {MIN_PLAYERS} players, found {0}")]
    NotEnoughPlayers(usize),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Salvage(#[from] SalvageError),
    #[error("Unexpected result shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("No team data in result (expected 2 teams, found {0})")]
    MissingTeams(usize),
}

/// Failure record returned to callers in place of a result.
///
/// `raw_response` is only present when the model answered but the answer
/// could not be turned into a result.
#[derive(Error, Debug, Serialize)]
#[error("{error}")]
pub struct MatchmakingFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "DebugInfo::is_empty")]
    pub debug_info: DebugInfo,
    pub model_used: String,
    #[source]
    #[serde(skip)]
    pub cause: MatchmakingError,
}

impl MatchmakingFailure {
    fn new(cause: MatchmakingError, model: &str) -> Self {
        Self {
            error: cause.to_string(),
            raw_response: None,
            debug_info: DebugInfo::default(),
            model_used: model.to_owned(),
            cause,
        }
    }

    fn with_debug(mut self, debug: DebugInfo) -> Self {
        self.debug_info = debug;
        self
    }

    fn with_reply(mut self, reply: &str) -> Self {
        self.raw_response = Some(truncate_chars(reply, RAW_RESPONSE_CHARS).to_owned());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub language: AnalysisLanguage,
}

pub fn contains_thai(text: &str) -> bool {
    text.chars().any(|c| ('\u{0E00}'..='\u{0E7F}').contains(&c))
}

/// Ask `backend` to pick two balanced doubles teams from `room`.
pub async fn generate_matchmaking<B: Backend>(
    backend: &B,
    room: &Room,
    options: &MatchOptions,
) -> Result<MatchmakingResult, MatchmakingFailure> {
    let model = backend.model().to_owned();

    if room.players.len() < MIN_PLAYERS {
        return Err(MatchmakingFailure::new(
            MatchmakingError::NotEnoughPlayers(room.players.len()),
            &model,
        ));
    }

    let prompt = build_prompt(room, backend.style(), options.language);
    log::info!(
        "[generate_matchmaking] {} players, backend={}, model={model}",
        room.players.len(),
        backend.name()
    );

    let reply = backend.complete(&prompt).await.map_err(|e| {
        log::error!("[generate_matchmaking] {} request failed: {e}", backend.name());
        MatchmakingFailure::new(e.into(), &model)
    })?;

    let salvaged = match salvage(&reply, backend.repair_level()) {
        Ok(salvaged) => salvaged,
        Err(e) => {
            log::error!("[generate_matchmaking] JSON decode error: {e}");
            let debug = e.debug.clone();
            return Err(MatchmakingFailure::new(e.into(), &model)
                .with_debug(debug)
                .with_reply(&reply));
        }
    };
    log::debug!("[generate_matchmaking] debug trail: {:?}", salvaged.debug);

    let mut result = match MatchmakingResult::from_value(&salvaged.value, &model) {
        Ok(result) => result,
        Err(e) => {
            log::error!("[generate_matchmaking] reply has the wrong shape: {e}");
            return Err(MatchmakingFailure::new(e.into(), &model)
                .with_debug(salvaged.debug)
                .with_reply(&reply));
        }
    };

    if backend.checks_analysis_script()
        && options.language == AnalysisLanguage::Thai
        && !result.analysis.is_empty()
        && !contains_thai(&result.analysis)
    {
        log::warn!("[generate_matchmaking] analysis is not in Thai, replacing it");
        THAI_ANALYSIS_NOTICE.clone_into(&mut result.analysis);
    }

    if result.teams.len() < 2 {
        log::error!(
            "[generate_matchmaking] expected 2 teams, got {}",
            result.teams.len()
        );
        return Err(
            MatchmakingFailure::new(MatchmakingError::MissingTeams(result.teams.len()), &model)
                .with_debug(salvaged.debug),
        );
    }

    let unknown = result.unknown_player_ids(room);
    if !unknown.is_empty() {
        let ids: Vec<String> = unknown.iter().map(ToString::to_string).collect();
        log::warn!(
            "[generate_matchmaking] reply names players not in the room: {}",
            ids.join(", ")
        );
    }

    Ok(result)
}

/// Run the same room through several backends concurrently. Outcomes come
/// back in the order of `backends`.
pub async fn generate_all<B: Backend>(
    backends: &[B],
    room: &Room,
    options: &MatchOptions,
) -> Vec<Result<MatchmakingResult, MatchmakingFailure>> {
    log::info!("[generate_all] Running {} backends", backends.len());
    join_all(
        backends
            .iter()
            .map(|backend| generate_matchmaking(backend, room, options)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Prompt, PromptStyle};
    use crate::room::Player;
    use crate::salvage::RepairLevel;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String, ()>,
        level: RepairLevel,
        thai_check: bool,
        seen: Mutex<Vec<Prompt>>,
    }

    impl Canned {
        fn replying(text: &str, level: RepairLevel) -> Self {
            Self {
                reply: Ok(text.to_owned()),
                level,
                thai_check: false,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Backend for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-model"
        }
        fn style(&self) -> PromptStyle {
            PromptStyle::Compact
        }
        fn repair_level(&self) -> RepairLevel {
            self.level
        }
        fn checks_analysis_script(&self) -> bool {
            self.thai_check
        }
        async fn complete(&self, prompt: &Prompt) -> Result<String, BackendError> {
            self.seen.lock().unwrap().push(prompt.clone());
            self.reply.clone().map_err(|()| BackendError::Status {
                status: 500,
                body: "boom".to_owned(),
            })
        }
    }

    fn room(n: i64) -> Room {
        Room {
            id: Some(1),
            name: None,
            players: (1..=n)
                .map(|id| Player {
                    id,
                    name: format!("P{id}"),
                    skill: "S".to_owned(),
                    join_time: "19:00".to_owned(),
                    number_of_matches: 0,
                    number_of_shuttlecock: 0,
                })
                .collect(),
        }
    }

    const GOOD: &str = r#"{"teams": [
        {"team_name": "ทีมที่ 1", "players": [{"id": 1, "name": "P1", "skill": "S"}, {"id": 2, "name": "P2", "skill": "S"}], "compatibility_score": 80},
        {"team_name": "ทีมที่ 2", "players": [{"id": 3, "name": "P3", "skill": "S"}, {"id": 4, "name": "P4", "skill": "S"}], "compatibility_score": 80}
    ], "match": {"team1": "ทีมที่ 1", "team2": "ทีมที่ 2", "balance_score": 95}, "analysis": "Balanced"}"#;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_success() {
        let backend = Canned::replying(GOOD, RepairLevel::Strict);
        let result = block_on(generate_matchmaking(&backend, &room(4), &MatchOptions::default())).unwrap();
        assert_eq!(result.teams.len(), 2);
        assert_eq!(result.model_used, "canned-model");
        assert_eq!(result.analysis, "Balanced");
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_too_few_players_skips_backend() {
        let backend = Canned::replying(GOOD, RepairLevel::Strict);
        let failure = block_on(generate_matchmaking(&backend, &room(3), &MatchOptions::default()))
            .unwrap_err();
        assert!(matches!(failure.cause, MatchmakingError::NotEnoughPlayers(3)));
        assert!(backend.seen.lock().unwrap().is_empty());
        assert!(failure.raw_response.is_none());
    }

    #[test]
    fn test_backend_error_has_no_raw_response() {
        let backend = Canned {
            reply: Err(()),
            level: RepairLevel::Lenient,
            thai_check: false,
            seen: Mutex::new(Vec::new()),
        };
        let failure = block_on(generate_matchmaking(&backend, &room(4), &MatchOptions::default()))
            .unwrap_err();
        assert_eq!(failure.error, "API request failed with status 500: boom");
        assert!(failure.raw_response.is_none());
        assert!(failure.debug_info.is_empty());
        let json = serde_json::to_value(&failure).unwrap();
        assert!(json.get("raw_response").is_none());
        assert!(json.get("debug_info").is_none());
        assert_eq!(json["model_used"], "canned-model");
    }

    #[test]
    fn test_unparseable_reply_keeps_truncated_raw_text() {
        let reply = format!("Sorry, {}", "x".repeat(2000));
        let backend = Canned::replying(&reply, RepairLevel::Lenient);
        let failure = block_on(generate_matchmaking(&backend, &room(4), &MatchOptions::default()))
            .unwrap_err();
        assert!(failure.error.starts_with("Could not parse AI response as JSON"));
        assert_eq!(
            failure.raw_response.as_ref().unwrap().chars().count(),
            RAW_RESPONSE_CHARS
        );
        assert!(failure.debug_info.raw_response.as_ref().unwrap().ends_with("..."));
    }

    #[test]
    fn test_single_team_is_rejected() {
        let reply = r#"{"teams": [{"team_name": "A", "players": []}], "analysis": "x"}"#;
        let backend = Canned::replying(reply, RepairLevel::Strict);
        let failure = block_on(generate_matchmaking(&backend, &room(4), &MatchOptions::default()))
            .unwrap_err();
        assert!(matches!(failure.cause, MatchmakingError::MissingTeams(1)));
        assert!(failure.debug_info.cleaned_json.is_some());
    }

    #[test]
    fn test_non_thai_analysis_replaced_when_checked() {
        let mut backend = Canned::replying(GOOD, RepairLevel::Lenient);
        backend.thai_check = true;
        let result = block_on(generate_matchmaking(&backend, &room(4), &MatchOptions::default()))
            .unwrap();
        assert_eq!(result.analysis, THAI_ANALYSIS_NOTICE);

        let english = MatchOptions {
            language: AnalysisLanguage::English,
        };
        let result = block_on(generate_matchmaking(&backend, &room(4), &english)).unwrap();
        assert_eq!(result.analysis, "Balanced");
    }

    #[test]
    fn test_wrong_shape_keeps_reply_and_trail() {
        let reply = r#"Here: {"teams": "two balanced pairs", "analysis": "x"}"#;
        let backend = Canned::replying(reply, RepairLevel::Lenient);
        let failure = block_on(generate_matchmaking(&backend, &room(4), &MatchOptions::default()))
            .unwrap_err();
        assert!(matches!(failure.cause, MatchmakingError::Shape(_)));
        assert!(failure.error.starts_with("Unexpected result shape"));
        assert_eq!(failure.raw_response.as_deref(), Some(reply));
        assert_eq!(
            failure.debug_info.cleaned_json.as_deref(),
            Some(r#"{"teams": "two balanced pairs", "analysis": "x"}"#)
        );
        assert!(failure.debug_info.raw_response.is_some());
    }

    #[test]
    fn test_empty_analysis_left_alone_by_thai_check() {
        let reply = GOOD.replace(r#""analysis": "Balanced""#, r#""analysis": """#);
        let mut backend = Canned::replying(&reply, RepairLevel::Lenient);
        backend.thai_check = true;
        let result = block_on(generate_matchmaking(&backend, &room(4), &MatchOptions::default()))
            .unwrap();
        assert_eq!(result.analysis, "");
    }

    #[test]
    fn test_contains_thai() {
        assert!(contains_thai("ทีมที่ 1 balanced"));
        assert!(!contains_thai("balanced teams"));
    }

    #[test]
    fn test_generate_all_keeps_order() {
        let backends = vec![
            Canned::replying(GOOD, RepairLevel::Strict),
            Canned::replying("nope", RepairLevel::Strict),
        ];
        let outcomes = block_on(generate_all(&backends, &room(5), &MatchOptions::default()));
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
    }
}
