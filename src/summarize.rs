use crate::match_schema::Participant;
use serde::{Deserialize, Serialize};

/// Compact per-player record stored in the `matchData` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub champion_name: String,
    pub champion_id: i64,
    pub champ_level: i64,
    pub team_id: i64,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub gold_earned: i64,
    pub creep_score: i64,
    /// Inventory slots 0-5 in slot order; an empty string is an empty slot.
    pub items: Vec<String>,
    pub trinket: String,
    pub summoner_name: String,
    pub riot_id: String,
    pub summoner_spells: [String; 2],
    pub keystone: String,
    pub total_damage_dealt_to_champions: i64,
    pub vision_score: i64,
    pub win: bool,
}

impl From<&Participant> for ParticipantSummary {
    fn from(p: &Participant) -> Self {
        Self {
            champion_name: p.champion_name.clone(),
            champion_id: p.champion_id,
            champ_level: p.champ_level,
            team_id: p.team_id,
            kills: p.kills,
            deaths: p.deaths,
            assists: p.assists,
            gold_earned: p.gold_earned,
            creep_score: p.total_minions_killed.saturating_add(p.neutral_minions_killed),
            items: inventory(p),
            trinket: p.item6.clone(),
            summoner_name: p.summoner_name.clone(),
            riot_id: riot_id(&p.riot_id_game_name, &p.riot_id_tagline),
            summoner_spells: [p.summoner1_id.clone(), p.summoner2_id.clone()],
            keystone: keystone(p),
            total_damage_dealt_to_champions: p.total_damage_dealt_to_champions,
            vision_score: p.vision_score,
            win: p.win,
        }
    }
}

pub fn summarize(participants: &[Participant]) -> Vec<ParticipantSummary> {
    participants.iter().map(ParticipantSummary::from).collect()
}

fn inventory(p: &Participant) -> Vec<String> {
    [&p.item0, &p.item1, &p.item2, &p.item3, &p.item4, &p.item5]
        .into_iter()
        .cloned()
        .collect()
}

fn keystone(p: &Participant) -> String {
    p.perks
        .styles
        .first()
        .and_then(|style| style.selections.first())
        .map(|selection| selection.perk.clone())
        .unwrap_or_default()
}

/// `name#tag`, or whichever half is present.
pub fn riot_id(game_name: &str, tagline: &str) -> String {
    match (game_name.is_empty(), tagline.is_empty()) {
        (false, false) => format!("{}#{}", game_name, tagline),
        (false, true) => game_name.to_string(),
        (true, false) => tagline.to_string(),
        (true, true) => String::new(),
    }
}
