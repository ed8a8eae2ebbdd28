use crate::derive::{DerivedFields, QueueTable};
use crate::error::{FailureOutcome, IngestionError};
use crate::match_schema::{self, MatchDocument};
use crate::row::{MatchRow, map_row};
use crate::store::MatchStore;
use crate::summarize::summarize;
use std::fmt;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Pipeline position of a single ingestion. Failures are reported through
/// [`IngestionError::outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Decoded,
    Derived,
    Mapped,
    Persisted,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Received => "received",
            IngestStage::Decoded => "decoded",
            IngestStage::Derived => "derived",
            IngestStage::Mapped => "mapped",
            IngestStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Runs decode, derive, summarize and map for one payload and hands the
/// resulting row to the store exactly once. Holds no per-request state, so a
/// single instance can serve concurrent ingestions.
pub struct Ingestor<S> {
    queues: QueueTable,
    store: S,
}

impl<S: MatchStore> Ingestor<S> {
    pub fn new(queues: QueueTable, store: S) -> Self {
        Self { queues, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn ingest(&self, payload: &[u8]) -> Result<MatchRow, IngestionError> {
        let span = info_span!("ingest", bytes = payload.len());
        self.run(payload).instrument(span).await
    }

    async fn run(&self, payload: &[u8]) -> Result<MatchRow, IngestionError> {
        let mut stage = IngestStage::Received;

        let PreparedMatch { match_id, row } = match self.prepare_tracked(payload, &mut stage) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(%stage, error = %err, "match rejected");
                return Err(err);
            }
        };

        if let Err(err) = self.store.persist(&row).await {
            error!(
                %stage,
                %match_id,
                game_id = row.game_id,
                retryable = err.is_transient(),
                error = %err,
                "failed to persist match"
            );
            return Err(err.into());
        }
        stage = IngestStage::Persisted;

        info!(
            %stage,
            %match_id,
            game_id = row.game_id,
            queue = %row.queue_label,
            duration = %row.game_duration_formatted,
            "match stored"
        );
        Ok(row)
    }

    /// The pure part of the pipeline: everything up to, but not including,
    /// the storage hand-off.
    pub fn prepare(&self, payload: &[u8]) -> Result<PreparedMatch, IngestionError> {
        let mut stage = IngestStage::Received;
        self.prepare_tracked(payload, &mut stage)
    }

    fn prepare_tracked(
        &self,
        payload: &[u8],
        stage: &mut IngestStage,
    ) -> Result<PreparedMatch, IngestionError> {
        let doc = match_schema::decode(payload)?;
        *stage = IngestStage::Decoded;
        debug!(
            %stage,
            match_id = %doc.metadata.match_id,
            participants = doc.info.participants.len(),
            "payload decoded"
        );
        check_participant_lists(&doc);

        let derived = DerivedFields::derive(&doc.info, &self.queues);
        let summaries = summarize(&doc.info.participants);
        *stage = IngestStage::Derived;
        debug!(
            %stage,
            queue = %derived.queue_label,
            duration = %derived.formatted_duration,
            "fields derived"
        );

        let row = map_row(&doc, &derived, &summaries)?;
        *stage = IngestStage::Mapped;
        debug!(%stage, game_id = row.game_id, "row mapped");

        Ok(PreparedMatch {
            match_id: doc.metadata.match_id,
            row,
        })
    }
}

/// A mapped row together with the producer's match id, which has no column
/// of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMatch {
    pub match_id: String,
    pub row: MatchRow,
}

/// Tally of a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub persisted: usize,
    pub rejected: usize,
    pub persist_failed: usize,
    /// Payloads that could not be read or fetched at all.
    pub unavailable: usize,
}

impl IngestReport {
    pub fn record(&mut self, result: &Result<MatchRow, IngestionError>) {
        match result {
            Ok(_) => self.persisted += 1,
            Err(err) => match err.outcome() {
                FailureOutcome::Rejected => self.rejected += 1,
                FailureOutcome::PersistFailed => self.persist_failed += 1,
            },
        }
    }

    pub fn record_unavailable(&mut self) {
        self.unavailable += 1;
    }

    pub fn failed(&self) -> usize {
        self.rejected + self.persist_failed + self.unavailable
    }
}

fn check_participant_lists(doc: &MatchDocument) {
    if !doc.participant_lists_agree() {
        warn!(
            match_id = %doc.metadata.match_id,
            metadata_participants = doc.metadata.participants.len(),
            info_participants = doc.info.participants.len(),
            "participant lists differ in length"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MappingError, SchemaError, StorageError};
    use crate::store::MemoryStore;
    use crate::test_support::{sample_match, to_payload};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MatchStore for FailingStore {
        async fn persist(&self, _row: &MatchRow) -> Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn ingestor() -> Ingestor<MemoryStore> {
        Ingestor::new(QueueTable::default(), MemoryStore::new())
    }

    #[tokio::test]
    async fn ingests_and_persists_one_row() {
        let ingestor = ingestor();
        let row = ingestor.ingest(&to_payload(&sample_match())).await.unwrap();

        assert_eq!(row.game_id, 7000000001);
        assert_eq!(row.riot_id, "Ahri#EUW");
        assert_eq!(row.game_duration_formatted, "30:45");
        assert_eq!(row.queue_label, "Ranked Solo/Duo");
        assert_eq!(row.game_date, "2023-11-14");
        assert_eq!(ingestor.store().rows(), vec![row]);
    }

    #[tokio::test]
    async fn empty_participants_are_rejected_without_persisting() {
        let ingestor = ingestor();
        let mut value = sample_match();
        value["info"]["participants"] = json!([]);

        let err = ingestor.ingest(&to_payload(&value)).await.unwrap_err();
        assert_matches!(err, IngestionError::Schema(SchemaError::NoParticipants));
        assert_eq!(err.outcome(), FailureOutcome::Rejected);
        assert_eq!(ingestor.store().len(), 0);
    }

    #[tokio::test]
    async fn garbage_is_rejected_without_persisting() {
        let ingestor = ingestor();
        let err = ingestor.ingest(b"\x00\xffnot json").await.unwrap_err();
        assert_matches!(err, IngestionError::Schema(SchemaError::Malformed(_)));
        assert_eq!(ingestor.store().len(), 0);
    }

    #[tokio::test]
    async fn mapping_failures_are_rejected_without_persisting() {
        let ingestor = ingestor();
        let mut value = sample_match();
        value["info"].as_object_mut().unwrap().remove("gameId");

        let err = ingestor.ingest(&to_payload(&value)).await.unwrap_err();
        assert_matches!(
            err,
            IngestionError::Mapping(MappingError::MissingField("gameId"))
        );
        assert_eq!(err.outcome(), FailureOutcome::Rejected);
        assert_eq!(ingestor.store().len(), 0);
    }

    #[tokio::test]
    async fn storage_failures_are_reported_once() {
        let ingestor = Ingestor::new(
            QueueTable::default(),
            FailingStore {
                calls: AtomicUsize::new(0),
            },
        );

        let err = ingestor.ingest(&to_payload(&sample_match())).await.unwrap_err();
        assert_matches!(err, IngestionError::Storage(StorageError::Database(_)));
        assert_eq!(err.outcome(), FailureOutcome::PersistFailed);
        assert!(err.is_retryable());
        assert_eq!(ingestor.store().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_payloads_are_not_deduplicated() {
        // Deduplication belongs to the store's uniqueness constraint.
        let ingestor = ingestor();
        let payload = to_payload(&sample_match());

        let first = ingestor.ingest(&payload).await.unwrap();
        let second = ingestor.ingest(&payload).await.unwrap();

        assert_eq!(first, second);
        let rows = ingestor.store().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
    }

    #[tokio::test]
    async fn mismatched_participant_lists_are_tolerated() {
        let ingestor = ingestor();
        let mut value = sample_match();
        value["metadata"]["participants"] = json!(["puuid-ahri"]);

        let row = ingestor.ingest(&to_payload(&value)).await.unwrap();
        assert_eq!(row.participant_id_list().unwrap(), ["puuid-ahri"]);
        assert_eq!(row.participant_summaries().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn configured_queue_labels_are_used() {
        let queues = QueueTable::default().with_label(440, "Ranked Flex");
        let ingestor = Ingestor::new(queues, MemoryStore::new());
        let mut value = sample_match();
        value["info"]["queueId"] = json!(440);

        let row = ingestor.ingest(&to_payload(&value)).await.unwrap();
        assert_eq!(row.queue_label, "Ranked Flex");
    }

    #[tokio::test]
    async fn concurrent_ingestions_are_independent() {
        let ingestor = Arc::new(ingestor());
        let mut handles = Vec::new();

        for game_id in 0..16i64 {
            let ingestor = Arc::clone(&ingestor);
            handles.push(tokio::spawn(async move {
                let mut value = sample_match();
                value["info"]["gameId"] = json!(game_id);
                ingestor.ingest(&to_payload(&value)).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut ids: Vec<_> = ingestor.store().rows().iter().map(|r| r.game_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn prepare_does_not_touch_the_store() {
        let ingestor = ingestor();
        let prepared = ingestor.prepare(&to_payload(&sample_match())).unwrap();
        assert_eq!(prepared.match_id, "EUW1_7000000001");
        assert_eq!(prepared.row.game_id, 7000000001);
        assert_eq!(ingestor.store().len(), 0);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stored_event_names_the_match() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        ingestor().ingest(&to_payload(&sample_match())).await.unwrap();

        let lines = logs.lines();
        let stored = lines
            .iter()
            .find(|line| line.contains("match stored"))
            .expect("no stored event");
        assert!(stored.contains("match_id=EUW1_7000000001"), "{stored}");
        assert!(stored.contains("game_id=7000000001"), "{stored}");
    }

    #[tokio::test]
    async fn report_counts_each_outcome() {
        let ingestor = ingestor();
        let mut report = IngestReport::default();

        report.record(&ingestor.ingest(&to_payload(&sample_match())).await);
        report.record(&ingestor.ingest(b"{}").await);
        report.record(&Err(StorageError::Duplicate { game_id: 1 }.into()));
        report.record_unavailable();

        assert_eq!(
            report,
            IngestReport {
                persisted: 1,
                rejected: 1,
                persist_failed: 1,
                unavailable: 1,
            }
        );
        assert_eq!(report.failed(), 3);
    }
}
