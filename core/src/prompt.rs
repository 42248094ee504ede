use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::room::{Player, Room, SkillTier};

/// How much instruction a backend gets. Larger hosted models follow a long
/// rule set; small local models do better with a short one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Player selection rules, pairing rules, tier guide and schema.
    Detailed,
    /// Ranked tier guide, rule priorities, schema and a worked example.
    Instruct,
    /// Two pairing rules and the schema.
    Compact,
}

/// Language the model should write `analysis` and team names in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AnalysisLanguage {
    #[default]
    Thai,
    English,
}

impl AnalysisLanguage {
    pub fn team_name(self, n: usize) -> String {
        match self {
            Self::Thai => format!("ทีมที่ {n}"),
            Self::English => format!("Team {n}"),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Thai => "Thai",
            Self::English => "English",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Single-string form for instruction-tuned models that take no
    /// separate system message.
    pub fn to_instruct(&self) -> String {
        format!("<s>[INST] {}\n\n{} [/INST]</s>", self.system, self.user)
    }
}

pub fn player_line(player: &Player) -> String {
    format!(
        "Player {}: {} (Skill: {}, Matches: {}, Join Time: {})",
        player.id, player.name, player.skill, player.number_of_matches, player.join_time
    )
}

pub fn player_info(room: &Room) -> String {
    room.players
        .iter()
        .map(player_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn system_prompt(style: PromptStyle, language: AnalysisLanguage) -> String {
    let mut system = String::from("You are an expert badminton session organiser");
    if style != PromptStyle::Compact {
        system.push_str(" who pairs players into matches that suit each player's skill");
    }
    system.push_str(". Reply only with JSON in exactly the structure requested.");
    if style == PromptStyle::Instruct {
        let _ = write!(
            system,
            " All free text in the reply must be written in {}.",
            language.name()
        );
    }
    system
}

/// Per-tier head count and the weakest-to-strongest range.
fn write_room_summary(prompt: &mut String, room: &Room) {
    let counts: Vec<String> = room
        .skill_summary()
        .into_iter()
        .map(|(label, count)| format!("{label} x{count}"))
        .collect();
    let _ = writeln!(prompt, "Skill summary: {}", counts.join(", "));
    if let Some((lowest, highest)) = room.tier_spread() {
        let _ = writeln!(prompt, "Skill range in the room: {lowest} to {highest}");
    }
    prompt.push('\n');
}

fn write_tier_guide(prompt: &mut String, ranked: bool) {
    if ranked {
        prompt.push_str("Skill tiers, ordered from weakest to strongest:\n");
    } else {
        prompt.push_str("Skill tiers:\n");
    }
    for tier in SkillTier::ALL {
        if ranked {
            let _ = writeln!(prompt, "{}. {}: {}", tier.rank(), tier, tier.description());
        } else {
            let _ = writeln!(prompt, "{}: {}", tier, tier.description());
        }
    }
    prompt.push('\n');
}

fn write_pairing_examples(prompt: &mut String) {
    prompt.push_str(
        "Correct examples:\n\
         - Four players, two S and two P-: each team gets one S and one P-.\n\
         - Four players, one N, two S and one P-: one team gets P- with N, the other S with S. \
           P- is stronger than S and S is stronger than N, so this is balanced.\n\
         Incorrect example:\n\
         - Putting players of the same tier together so that one tier faces a different tier across the net.\n\n",
    );
}

fn write_schema(prompt: &mut String, language: AnalysisLanguage) {
    let team1 = language.team_name(1);
    let team2 = language.team_name(2);
    let _ = write!(
        prompt,
        "{{\n  \"teams\": [\n    {{\n      \"team_name\": \"{team1}\",\n      \"players\": [\n        \
         {{ \"id\": player_id, \"name\": \"player_name\", \"skill\": \"skill_level\" }},\n        \
         {{ \"id\": player_id, \"name\": \"player_name\", \"skill\": \"skill_level\" }}\n      ],\n      \
         \"compatibility_score\": 85\n    }},\n    {{\n      \"team_name\": \"{team2}\",\n      \"players\": [\n        \
         {{ \"id\": player_id, \"name\": \"player_name\", \"skill\": \"skill_level\" }},\n        \
         {{ \"id\": player_id, \"name\": \"player_name\", \"skill\": \"skill_level\" }}\n      ],\n      \
         \"compatibility_score\": 82\n    }}\n  ],\n  \"match\": {{\n    \"team1\": \"{team1}\",\n    \
         \"team2\": \"{team2}\",\n    \"balance_score\": 90\n  }},\n  \
         \"analysis\": \"why these players were chosen and paired this way\"\n}}\n\n"
    );
}

fn write_example(prompt: &mut String, language: AnalysisLanguage) {
    let team1 = language.team_name(1);
    let team2 = language.team_name(2);
    let analysis = match language {
        AnalysisLanguage::Thai => {
            "การจับคู่นี้สมดุลที่สุด เพราะทั้งสองทีมมีผู้เล่นทักษะ S และ P- ทีมละ 1 คน"
        }
        AnalysisLanguage::English => {
            "This is the most balanced pairing because each team has one S and one P- player."
        }
    };
    let _ = write!(
        prompt,
        "Example of a valid reply:\n{{\n  \"teams\": [\n    \
         {{ \"team_name\": \"{team1}\", \"players\": [{{ \"id\": 1, \"name\": \"Somchai\", \"skill\": \"S\" }}, \
         {{ \"id\": 3, \"name\": \"Somsri\", \"skill\": \"P-\" }}], \"compatibility_score\": 85 }},\n    \
         {{ \"team_name\": \"{team2}\", \"players\": [{{ \"id\": 2, \"name\": \"Somying\", \"skill\": \"S\" }}, \
         {{ \"id\": 4, \"name\": \"Sompong\", \"skill\": \"P-\" }}], \"compatibility_score\": 82 }}\n  ],\n  \
         \"match\": {{ \"team1\": \"{team1}\", \"team2\": \"{team2}\", \"balance_score\": 90 }},\n  \
         \"analysis\": \"{analysis}\"\n}}\n"
    );
}

fn write_detailed(prompt: &mut String, room: &Room, language: AnalysisLanguage) {
    let _ = write!(
        prompt,
        "Players in the room:\n\n{}\n\n",
        player_info(room)
    );
    write_room_summary(prompt, room);
    prompt.push_str("Pick players for the most balanced doubles match possible, based on skill.\n\n");
    prompt.push_str(
        "## Player selection rules\n\
         1. Choose 4 players of similar ability: the strongest and weakest may differ by at most one tier, \
            or all four may share a tier.\n\
         2. Ignore gender. Compare each player's match count against the rest of the room.\n\
         3. Compare join times: every 30 minutes since joining, a player should have had at least one match.\n\n\
         ## Team rules\n\
         1. Split the 4 chosen players so both teams are balanced, weighing the skill of each player.\n\n",
    );
    write_pairing_examples(prompt);
    write_tier_guide(prompt, false);
    prompt.push_str("Choose 2 pairs to play each other and reply with JSON in exactly this structure:\n");
    write_schema(prompt, language);
    let _ = write!(
        prompt,
        "Do not write anything outside the JSON. Name the teams \"{}\" and \"{}\" only. \
         Write the analysis in {} only.\n",
        language.team_name(1),
        language.team_name(2),
        language.name()
    );
}

fn write_instruct(prompt: &mut String, room: &Room, language: AnalysisLanguage) {
    let _ = write!(
        prompt,
        "Players in the room:\n\n{}\n\n",
        player_info(room)
    );
    write_room_summary(prompt, room);
    prompt.push_str(
        "Pair players for the most balanced doubles match possible, following these rules:\n\n\
         Rule 1 (most important): both teams must be balanced, judged by the skill of the chosen players.\n\n",
    );
    write_pairing_examples(prompt);
    prompt.push_str(
        "Rule 2: consider each player's match count compared with the whole room.\n\
         Rule 3: consider join time. Every 30 minutes since joining, a player should have had at least one match.\n\n",
    );
    write_tier_guide(prompt, true);
    prompt.push_str(
        "Skill does not have to be identical across the match, but should not differ by more than one tier.\n\n\
         You must reply with JSON in exactly this structure:\n",
    );
    write_schema(prompt, language);
    let _ = write!(
        prompt,
        "Important: reply with JSON only and no other text. Explain the pairing in the \"analysis\" field, \
         written in {}: how the players were chosen, why, and any further advice.\n\n",
        language.name()
    );
    write_example(prompt, language);
}

fn write_compact(prompt: &mut String, room: &Room, language: AnalysisLanguage) {
    let _ = write!(
        prompt,
        "Build the most balanced badminton doubles teams.\n\n\
         Rules:\n\
         1. Spread the different skill levels evenly.\n\
         2. Take match counts and join times into account.\n\n\
         Players:\n{}\n\n\
         Reply with JSON only, in this structure:\n",
        player_info(room)
    );
    write_schema(prompt, language);
    let _ = writeln!(prompt, "Write the analysis in {}.", language.name());
}

/// Build the system and user prompt for a room.
pub fn build_prompt(room: &Room, style: PromptStyle, language: AnalysisLanguage) -> Prompt {
    let mut user = String::new();
    match style {
        PromptStyle::Detailed => write_detailed(&mut user, room, language),
        PromptStyle::Instruct => write_instruct(&mut user, room, language),
        PromptStyle::Compact => write_compact(&mut user, room, language),
    }

    Prompt {
        system: system_prompt(style, language),
        user,
    }
}
