//! Typed model of a match-v5 style match document.
//!
//! Only the fields the ingester consumes are modelled; anything else in the
//! payload is ignored. Nested structures and identifiers degrade to empty
//! values when absent or `null`, so producer-side schema drift does not turn
//! into rejected matches.

use crate::error::SchemaError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchDocument {
    pub info: Info,
    pub metadata: Metadata,
}

#[derive(Deserialize)]
struct RawDocument {
    info: Option<Info>,
    #[serde(default, deserialize_with = "null_as_default")]
    metadata: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub match_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_creation: i64,
    /// Seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub game_duration: u64,
    pub game_end_timestamp: Option<i64>,
    pub game_start_timestamp: Option<i64>,
    pub game_version: Option<String>,
    pub game_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub queue_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub participants: Vec<Participant>,
}

impl Info {
    pub fn duration_seconds(&self) -> u64 {
        self.game_duration
    }

    /// Epoch milliseconds. Without `gameEndTimestamp` this is the start (or
    /// creation) time plus the duration.
    pub fn end_timestamp(&self) -> i64 {
        if let Some(end) = self.game_end_timestamp {
            return end;
        }

        let start = self.game_start_timestamp.unwrap_or(self.game_creation);
        let duration_ms =
            i64::try_from(self.game_duration.saturating_mul(1000)).unwrap_or(i64::MAX);
        start.saturating_add(duration_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Participant {
    #[serde(deserialize_with = "null_as_default")]
    pub puuid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub riot_id_game_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub riot_id_tagline: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summoner_name: String,

    #[serde(deserialize_with = "null_as_default")]
    pub kills: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub deaths: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub assists: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub gold_earned: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub champ_experience: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub champ_level: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub champion_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub champion_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub total_minions_killed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub neutral_minions_killed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_ally_jungle_minions_killed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_enemy_jungle_minions_killed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub vision_score: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_damage_dealt_to_champions: i64,

    #[serde(deserialize_with = "lenient_string")]
    pub item0: String,
    #[serde(deserialize_with = "lenient_string")]
    pub item1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub item2: String,
    #[serde(deserialize_with = "lenient_string")]
    pub item3: String,
    #[serde(deserialize_with = "lenient_string")]
    pub item4: String,
    #[serde(deserialize_with = "lenient_string")]
    pub item5: String,
    #[serde(deserialize_with = "lenient_string")]
    pub item6: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summoner1_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summoner2_id: String,

    #[serde(deserialize_with = "null_as_default")]
    pub win: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub team_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub perks: Perks,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Perks {
    #[serde(default, deserialize_with = "null_as_default")]
    pub styles: Vec<Style>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Style {
    #[serde(default, deserialize_with = "lenient_string")]
    pub style: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Selection {
    #[serde(default, deserialize_with = "lenient_string")]
    pub perk: String,
}

impl MatchDocument {
    pub fn primary_participant(&self) -> Option<&Participant> {
        self.info.participants.first()
    }

    /// Both participant lists are expected to line up, but producers have
    /// shipped documents where they do not.
    pub fn participant_lists_agree(&self) -> bool {
        self.metadata.participants.len() == self.info.participants.len()
    }
}

/// Decode one payload into a [`MatchDocument`].
///
/// Accepts the match object directly or a JSON string whose content is the
/// match object.
pub fn decode(payload: &[u8]) -> Result<MatchDocument, SchemaError> {
    let raw: RawDocument = if is_encoded_string(payload) {
        let inner: String = serde_json::from_slice(payload)?;
        serde_json::from_str(&inner)?
    } else {
        serde_json::from_slice(payload)?
    };

    let info = raw.info.ok_or(SchemaError::MissingInfo)?;
    if info.participants.is_empty() {
        return Err(SchemaError::NoParticipants);
    }

    Ok(MatchDocument {
        info,
        metadata: raw.metadata,
    })
}

fn is_encoded_string(payload: &[u8]) -> bool {
    payload
        .iter()
        .find(|byte| !byte.is_ascii_whitespace())
        .is_some_and(|byte| *byte == b'"')
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Identifiers show up as strings in some producers and numbers in others.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => value,
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    })
}
