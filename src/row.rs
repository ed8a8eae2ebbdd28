use crate::derive::DerivedFields;
use crate::error::MappingError;
use crate::match_schema::MatchDocument;
use crate::summarize::{ParticipantSummary, riot_id};
use serde::Serialize;

/// One `"matchHistory"` row. Serialized names are the column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRow {
    #[serde(rename = "gameID")]
    pub game_id: i64,
    #[serde(rename = "gameVersion")]
    pub game_version: String,
    #[serde(rename = "riotID")]
    pub riot_id: String,
    #[serde(rename = "gameDurationFormatted")]
    pub game_duration_formatted: String,
    #[serde(rename = "gameCreationEpochMs")]
    pub game_creation_epoch_ms: i64,
    #[serde(rename = "gameEndEpochMs")]
    pub game_end_epoch_ms: i64,
    #[serde(rename = "queueLabel")]
    pub queue_label: String,
    #[serde(rename = "gameDate")]
    pub game_date: String,
    /// JSON array of participant identifiers.
    #[serde(rename = "participantIDs")]
    pub participant_ids: String,
    /// JSON array of [`ParticipantSummary`].
    #[serde(rename = "matchData")]
    pub match_data: String,
}

impl MatchRow {
    pub fn participant_summaries(&self) -> Result<Vec<ParticipantSummary>, serde_json::Error> {
        serde_json::from_str(&self.match_data)
    }

    pub fn participant_id_list(&self) -> Result<Vec<String>, serde_json::Error> {
        serde_json::from_str(&self.participant_ids)
    }
}

pub fn map_row(
    doc: &MatchDocument,
    derived: &DerivedFields,
    summaries: &[ParticipantSummary],
) -> Result<MatchRow, MappingError> {
    let primary = doc
        .primary_participant()
        .ok_or(MappingError::NoPrimaryParticipant)?;
    if summaries.is_empty() {
        return Err(MappingError::NoPrimaryParticipant);
    }

    let game_id = doc.info.game_id.ok_or(MappingError::MissingField("gameId"))?;
    let game_version = doc
        .info
        .game_version
        .as_deref()
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or(MappingError::MissingField("gameVersion"))?;
    let game_date = derived
        .creation_date
        .clone()
        .ok_or(MappingError::CreationOutOfRange(doc.info.game_creation))?;

    let participant_ids = serde_json::to_string(&doc.metadata.participants).map_err(|source| {
        MappingError::Serialize {
            column: "participantIDs",
            source,
        }
    })?;
    let match_data = serde_json::to_string(summaries).map_err(|source| MappingError::Serialize {
        column: "matchData",
        source,
    })?;

    Ok(MatchRow {
        game_id,
        game_version: game_version.to_string(),
        riot_id: riot_id(&primary.riot_id_game_name, &primary.riot_id_tagline),
        game_duration_formatted: derived.formatted_duration.clone(),
        game_creation_epoch_ms: doc.info.game_creation,
        game_end_epoch_ms: doc.info.end_timestamp(),
        queue_label: derived.queue_label.clone(),
        game_date,
        participant_ids,
        match_data,
    })
}
