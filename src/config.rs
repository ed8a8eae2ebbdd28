use crate::derive::QueueTable;
use crate::store::{CsvMatchStore, MatchStore, MemoryStore, PgMatchStore};
use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Postgres,
    Csv,
    Memory,
}

/// `ID=LABEL` entry added to the queue table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLabel {
    pub queue_id: i64,
    pub label: String,
}

impl FromStr for QueueLabel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (id, label) = raw
            .split_once('=')
            .ok_or_else(|| format!("expected ID=LABEL, got '{}'", raw))?;
        let queue_id = id
            .trim()
            .parse::<i64>()
            .map_err(|err| format!("invalid queue id '{}': {}", id.trim(), err))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(format!("queue {} has an empty label", queue_id));
        }

        Ok(Self {
            queue_id,
            label: label.to_string(),
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Where ingested rows are written
    #[arg(long, env = "MATCH_STORE", value_enum, default_value = "postgres")]
    pub store: StoreKind,

    /// PostgreSQL connection string (postgres store)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Output file (csv store)
    #[arg(long, env = "MATCH_CSV_PATH", default_value = "match_history.csv")]
    pub csv_path: PathBuf,

    /// Extra queue labels, e.g. `440=Ranked Flex`
    #[arg(
        long = "queue-label",
        env = "MATCH_QUEUE_LABELS",
        value_delimiter = ','
    )]
    pub queue_labels: Vec<QueueLabel>,

    /// Emit logs as JSON lines
    #[arg(long, env = "MATCH_LOG_JSON")]
    pub log_json: bool,
}

impl Settings {
    pub fn queue_table(&self) -> QueueTable {
        self.queue_labels
            .iter()
            .fold(QueueTable::default(), |table, entry| {
                table.with_label(entry.queue_id, entry.label.clone())
            })
    }

    pub async fn open_store(&self) -> Result<Box<dyn MatchStore>> {
        match self.store {
            StoreKind::Postgres => {
                let Some(url) = self.database_url.as_deref() else {
                    bail!("--database-url or DATABASE_URL is required for the postgres store");
                };
                let store = PgMatchStore::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL")?;
                store
                    .ensure_schema()
                    .await
                    .context("failed to create matchHistory table")?;
                info!("writing matches to PostgreSQL");
                Ok(Box::new(store))
            }
            StoreKind::Csv => {
                let store = CsvMatchStore::open(&self.csv_path).with_context(|| {
                    format!("failed to open {}", self.csv_path.display())
                })?;
                info!(path = %store.path().display(), "writing matches to CSV");
                Ok(Box::new(store))
            }
            StoreKind::Memory => {
                info!("keeping matches in memory, nothing will be saved");
                Ok(Box::new(MemoryStore::new()))
            }
        }
    }
}
