use thiserror::Error;

/// The payload is not a match document this ingester can accept.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload has no `info` section")]
    MissingInfo,

    #[error("`info.participants` is empty")]
    NoParticipants,
}

/// The decoded document cannot be assembled into a row.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("required field `{0}` is absent")]
    MissingField(&'static str),

    #[error("match has no primary participant")]
    NoPrimaryParticipant,

    #[error("creation timestamp {0} is outside the representable date range")]
    CreationOutOfRange(i64),

    #[error("failed to serialize `{column}`: {source}")]
    Serialize {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The storage collaborator refused or failed the insert.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("match {game_id} is already stored")]
    Duplicate { game_id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Database(_) | StorageError::Io(_))
    }
}

/// Terminal failure state of a single ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Rejected,
    PersistFailed,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("match rejected: {0}")]
    Schema(#[from] SchemaError),

    #[error("match rejected: {0}")]
    Mapping(#[from] MappingError),

    #[error("persist failed: {0}")]
    Storage(#[from] StorageError),
}

impl IngestionError {
    pub fn outcome(&self) -> FailureOutcome {
        match self {
            IngestionError::Schema(_) | IngestionError::Mapping(_) => FailureOutcome::Rejected,
            IngestionError::Storage(_) => FailureOutcome::PersistFailed,
        }
    }

    /// Only storage failures can succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestionError::Storage(err) => err.is_transient(),
            _ => false,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestionError::Schema(_))
    }
}

/// Failures talking to the Riot match API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("RIOT_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid API key header: {0}")]
    InvalidKey(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("too many requests for {url}")]
    RateLimited { url: String },

    #[error("request to {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}
