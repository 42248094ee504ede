//! Room and player records as handed over by the caller.
//!
//! These are passed through the pipeline unchanged; the only derived data is
//! the per-tier summary used in prompts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid room JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordinal skill label, least to most skilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillTier {
    #[serde(rename = "BG")]
    Beginner,
    #[serde(rename = "N")]
    Novice,
    #[serde(rename = "S")]
    Standard,
    #[serde(rename = "P-")]
    ProMinus,
    #[serde(rename = "P/P+")]
    Pro,
    #[serde(rename = "C")]
    Competitive,
    #[serde(rename = "B/A")]
    National,
}

impl SkillTier {
    pub const ALL: [SkillTier; 7] = [
        SkillTier::Beginner,
        SkillTier::Novice,
        SkillTier::Standard,
        SkillTier::ProMinus,
        SkillTier::Pro,
        SkillTier::Competitive,
        SkillTier::National,
    ];

    /// Parse a skill label. `P`/`P+` fold into `P/P+` and `B`/`A` into `B/A`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "BG" => Some(Self::Beginner),
            "N" => Some(Self::Novice),
            "S" => Some(Self::Standard),
            "P-" => Some(Self::ProMinus),
            "P/P+" | "P" | "P+" => Some(Self::Pro),
            "C" => Some(Self::Competitive),
            "B/A" | "B" | "A" => Some(Self::National),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Beginner => "BG",
            Self::Novice => "N",
            Self::Standard => "S",
            Self::ProMinus => "P-",
            Self::Pro => "P/P+",
            Self::Competitive => "C",
            Self::National => "B/A",
        }
    }

    /// 1-based rank, used when the prompt lists tiers in order.
    pub fn rank(self) -> usize {
        self as usize + 1
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Beginner => {
                "Weakest tier. Connects with the shuttle only now and then and has almost no stroke fundamentals."
            }
            Self::Novice => {
                "Connects more often but not reliably on difficult shots; backhand, footwork and smashes are still weak."
            }
            Self::Standard => {
                "Consistent contact and a full set of basic strokes, though the technique may be self-taught. Usually long-time social players."
            }
            Self::ProMinus => {
                "Stronger than S and may have had coaching. More power and speed; shots are effective even when the form is rough."
            }
            Self::Pro => {
                "Former competitive player or badminton coach with complete fundamentals, power and speed."
            }
            Self::Competitive => "Current or former professional athlete with very high skill.",
            Self::National => "Strongest tier. National team or former national team player.",
        }
    }
}

impl fmt::Display for SkillTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A player waiting in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub skill: String,
    #[serde(default)]
    pub join_time: String,
    #[serde(default)]
    pub number_of_matches: u32,
    #[serde(default)]
    pub number_of_shuttlecock: u32,
}

impl Player {
    pub fn tier(&self) -> Option<SkillTier> {
        SkillTier::parse(&self.skill)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub players: Vec<Player>,
}

impl Room {
    pub fn from_json(json: &str) -> Result<Self, RoomError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, RoomError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn find_player(&self, id: i64) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Count players per skill label, ordered weakest to strongest.
    ///
    /// Known tiers use their canonical label; unrecognised labels are kept
    /// verbatim and sorted alphabetically after the known ones.
    pub fn skill_summary(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<(Option<SkillTier>, String), usize> = HashMap::new();
        for player in &self.players {
            let key = match player.tier() {
                Some(tier) => (Some(tier), tier.label().to_owned()),
                None => (None, player.skill.trim().to_owned()),
            };
            *counts.entry(key).or_insert(0) += 1;
        }

        let mut entries: Vec<_> = counts.into_iter().collect();
        entries.sort_by(|((ta, la), _), ((tb, lb), _)| {
            ta.is_none()
                .cmp(&tb.is_none())
                .then_with(|| ta.cmp(tb))
                .then_with(|| la.cmp(lb))
        });
        entries
            .into_iter()
            .map(|((_, label), count)| (label, count))
            .collect()
    }

    /// Weakest and strongest recognised tiers in the room.
    pub fn tier_spread(&self) -> Option<(SkillTier, SkillTier)> {
        let mut tiers = self.players.iter().filter_map(Player::tier);
        let first = tiers.next()?;
        Some(tiers.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: i64, skill: &str) -> Player {
        Player {
            id,
            name: format!("p{id}"),
            skill: skill.to_owned(),
            join_time: String::new(),
            number_of_matches: 0,
            number_of_shuttlecock: 0,
        }
    }

    #[test]
    fn test_tier_ordering() {
        assert!(SkillTier::Beginner < SkillTier::Novice);
        assert!(SkillTier::ProMinus < SkillTier::Pro);
        assert!(SkillTier::Competitive < SkillTier::National);
        assert_eq!(SkillTier::ALL.len(), 7);
        assert_eq!(SkillTier::Beginner.rank(), 1);
        assert_eq!(SkillTier::National.rank(), 7);
    }

    #[test]
    fn test_tier_parse_aliases() {
        assert_eq!(SkillTier::parse("bg"), Some(SkillTier::Beginner));
        assert_eq!(SkillTier::parse(" P- "), Some(SkillTier::ProMinus));
        assert_eq!(SkillTier::parse("P"), Some(SkillTier::Pro));
        assert_eq!(SkillTier::parse("P+"), Some(SkillTier::Pro));
        assert_eq!(SkillTier::parse("p/p+"), Some(SkillTier::Pro));
        assert_eq!(SkillTier::parse("A"), Some(SkillTier::National));
        assert_eq!(SkillTier::parse("X"), None);
        assert_eq!(SkillTier::Pro.to_string(), "P/P+");
    }

    #[test]
    fn test_room_from_json_defaults() {
        let room = Room::from_json(
            r#"{"players": [{"id": 1, "name": "Somchai", "skill": "S"}]}"#,
        )
        .unwrap();
        assert_eq!(room.id, None);
        assert_eq!(room.players[0].join_time, "");
        assert_eq!(room.players[0].number_of_matches, 0);
        assert_eq!(room.players[0].number_of_shuttlecock, 0);
    }

    #[test]
    fn test_room_from_json_rejects_missing_players() {
        assert!(Room::from_json(r#"{"id": 3}"#).is_err());
    }

    #[test]
    fn test_skill_summary_orders_by_tier() {
        let room = Room {
            id: None,
            name: None,
            players: vec![
                player(1, "P-"),
                player(2, "S"),
                player(3, "zz"),
                player(4, "s"),
                player(5, "BG"),
                player(6, "P+"),
            ],
        };
        let summary = room.skill_summary();
        assert_eq!(
            summary,
            vec![
                ("BG".to_owned(), 1),
                ("S".to_owned(), 2),
                ("P-".to_owned(), 1),
                ("P/P+".to_owned(), 1),
                ("zz".to_owned(), 1),
            ]
        );
    }

    #[test]
    fn test_tier_spread() {
        let room = Room {
            id: None,
            name: None,
            players: vec![player(1, "S"), player(2, "C"), player(3, "N"), player(4, "?")],
        };
        assert_eq!(
            room.tier_spread(),
            Some((SkillTier::Novice, SkillTier::Competitive))
        );
        assert_eq!(Room::default().tier_spread(), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.json");
        std::fs::write(
            &path,
            r#"{"id": 7, "name": "Court 2", "players": [{"id": 1, "name": "A", "skill": "N", "number_of_matches": 3}]}"#,
        )
        .unwrap();
        let room = Room::load(&path).unwrap();
        assert_eq!(room.id, Some(7));
        assert_eq!(room.find_player(1).unwrap().number_of_matches, 3);
        assert!(room.find_player(2).is_none());
    }
}
