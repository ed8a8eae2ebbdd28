//! Storage collaborators for persisted match rows.
//!
//! Every store performs exactly one write per `persist` call and never
//! deduplicates; uniqueness on `gameID` is left to the backing store.

use crate::error::StorageError;
use crate::row::MatchRow;
use async_trait::async_trait;
use csv::{Writer, WriterBuilder};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn persist(&self, row: &MatchRow) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: MatchStore + ?Sized> MatchStore for Box<S> {
    async fn persist(&self, row: &MatchRow) -> Result<(), StorageError> {
        (**self).persist(row).await
    }
}

const CREATE_MATCH_HISTORY: &str = r#"
CREATE TABLE IF NOT EXISTS "matchHistory" (
    "gameID"                BIGINT PRIMARY KEY,
    "gameVersion"           TEXT NOT NULL,
    "riotID"                TEXT NOT NULL,
    "gameDurationFormatted" TEXT NOT NULL,
    "gameCreationEpochMs"   BIGINT NOT NULL,
    "gameEndEpochMs"        BIGINT NOT NULL,
    "queueLabel"            TEXT NOT NULL,
    "gameDate"              DATE NOT NULL,
    "participantIDs"        JSONB NOT NULL,
    "matchData"             JSONB NOT NULL,
    "ingestedAt"            TIMESTAMPTZ NOT NULL DEFAULT now()
)"#;

const INSERT_MATCH_HISTORY: &str = r#"
INSERT INTO "matchHistory" (
    "gameID", "gameVersion", "riotID", "gameDurationFormatted",
    "gameCreationEpochMs", "gameEndEpochMs", "queueLabel", "gameDate",
    "participantIDs", "matchData"
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8::date, $9::jsonb, $10::jsonb)"#;

/// PostgreSQL-backed store writing into `"matchHistory"`.
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_MATCH_HISTORY).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn persist(&self, row: &MatchRow) -> Result<(), StorageError> {
        let result = sqlx::query(INSERT_MATCH_HISTORY)
            .bind(row.game_id)
            .bind(&row.game_version)
            .bind(&row.riot_id)
            .bind(&row.game_duration_formatted)
            .bind(row.game_creation_epoch_ms)
            .bind(row.game_end_epoch_ms)
            .bind(&row.queue_label)
            .bind(&row.game_date)
            .bind(&row.participant_ids)
            .bind(&row.match_data)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Duplicate {
                    game_id: row.game_id,
                })
            }
            Err(err) => Err(StorageError::Database(err)),
        }
    }
}

/// Appends one CSV record per row.
pub struct CsvMatchStore {
    path: PathBuf,
    writer: Mutex<Writer<File>>,
}

impl CsvMatchStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let writer = WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MatchStore for CsvMatchStore {
    async fn persist(&self, row: &MatchRow) -> Result<(), StorageError> {
        let mut writer = self.writer.lock().map_err(|_| StorageError::Poisoned)?;
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps rows in memory, in persist order.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<MatchRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<MatchRow> {
        match self.rows.lock() {
            Ok(rows) => rows.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn persist(&self, row: &MatchRow) -> Result<(), StorageError> {
        self.rows
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .push(row.clone());
        Ok(())
    }
}
