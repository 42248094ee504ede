//! The structured record recovered from a model reply.
//!
//! The shape is whatever the model chose to send back, so every field is
//! lenient: missing or null keys default, text fields accept numbers, scores
//! accept numbers or numeric strings, and player ids accept whatever the
//! model sent.

use crate::room::Room;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A player id as the model wrote it.
///
/// Whole floats such as `1.0` count as numbers. Any other non-string value
/// is kept as its JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PlayerId {
    Number(i64),
    Text(String),
    #[default]
    Missing,
}

impl PlayerId {
    /// Numeric form of the id, if it has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Missing => None,
        }
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => Self::Missing,
            Value::String(s) => Self::Text(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Number(i),
                None => match n.as_f64() {
                    Some(f) if f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15 => Self::Number(f as i64),
                    _ => Self::Text(n.to_string()),
                },
            },
            other => Self::Text(other.to_string()),
        })
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Missing => f.write_str("(none)"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPlayer {
    #[serde(default)]
    pub id: PlayerId,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub skill: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, deserialize_with = "loose_string")]
    pub team_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub players: Vec<TeamPlayer>,
    #[serde(default, deserialize_with = "loose_score")]
    pub compatibility_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(default, deserialize_with = "loose_string")]
    pub team1: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub team2: String,
    #[serde(default, deserialize_with = "loose_score")]
    pub balance_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchmakingResult {
    pub teams: Vec<Team>,
    #[serde(rename = "match")]
    pub match_summary: MatchSummary,
    pub analysis: String,
    pub model_used: String,
}

/// Accept any JSON value for a text field: `null` becomes empty, numbers and
/// other values become their JSON text.
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `85`, `85.5`, `"85"` or `null` for a score.
fn loose_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    })
}

impl MatchmakingResult {
    /// Build a result from a parsed reply, defaulting any missing section.
    pub fn from_value(value: &Value, model: &str) -> Result<Self, serde_json::Error> {
        let teams = match value.get("teams") {
            Some(Value::Null) | None => Vec::new(),
            Some(teams) => Vec::<Team>::deserialize(teams)?,
        };
        let match_summary = match value.get("match") {
            Some(Value::Null) | None => MatchSummary::default(),
            Some(summary) => MatchSummary::deserialize(summary)?,
        };
        let analysis = match value.get("analysis") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Ok(Self {
            teams,
            match_summary,
            analysis,
            model_used: model.to_owned(),
        })
    }

    /// Ids named in the teams that do not belong to anyone in the room.
    pub fn unknown_player_ids(&self, room: &Room) -> Vec<PlayerId> {
        self.teams
            .iter()
            .flat_map(|t| t.players.iter())
            .filter(|p| {
                p.id
                    .as_i64()
                    .and_then(|id| room.find_player(id))
                    .is_none()
            })
            .map(|p| p.id.clone())
            .collect()
    }
}
