//! Batch drivers feeding many payloads through one [`Ingestor`].

use crate::ingest::{IngestReport, Ingestor};
use crate::riot_api::RiotClient;
use crate::store::MatchStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub async fn read_payload(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Ingests each file in order. A failing file is logged and counted, never
/// fatal for the rest of the batch.
pub async fn ingest_files<S: MatchStore>(ingestor: &Ingestor<S>, files: &[PathBuf]) -> IngestReport {
    let mut report = IngestReport::default();

    for path in files {
        let payload = match read_payload(path).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{:#}", err), "payload unavailable");
                report.record_unavailable();
                continue;
            }
        };

        let result = ingestor.ingest(&payload).await;
        if let Err(err) = &result {
            warn!(
                path = %path.display(),
                outcome = ?err.outcome(),
                error = %err,
                "payload not stored"
            );
        }
        report.record(&result);
    }

    report
}

pub async fn fetch_and_ingest<S: MatchStore>(
    ingestor: &Ingestor<S>,
    client: &RiotClient,
    match_ids: &[String],
) -> IngestReport {
    let mut report = IngestReport::default();
    let total = match_ids.len();

    for (idx, match_id) in match_ids.iter().enumerate() {
        info!("Downloading match {}/{}: {}", idx + 1, total, match_id);

        let payload = match client.get_match_payload(match_id).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(match_id = %match_id, error = %err, "failed to fetch match");
                report.record_unavailable();
                continue;
            }
        };

        let result = ingestor.ingest(&payload).await;
        if let Err(err) = &result {
            warn!(
                match_id = %match_id,
                outcome = ?err.outcome(),
                error = %err,
                "payload not stored"
            );
        }
        report.record(&result);
    }

    report
}

/// `.json` files directly inside `dir`, sorted by path. Entries that cannot
/// be read are logged and skipped.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
