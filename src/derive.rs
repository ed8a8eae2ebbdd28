use crate::match_schema::Info;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Calendar format of the `gameDate` column. Dates are always rendered in UTC.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const UNKNOWN_QUEUE: &str = "Unknown";

pub const RANKED_SOLO_DUO: i64 = 420;

/// Presentation values computed from raw match fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedFields {
    pub formatted_duration: String,
    /// `None` when the creation timestamp cannot be represented as a date.
    pub creation_date: Option<String>,
    pub queue_label: String,
}

impl DerivedFields {
    pub fn derive(info: &Info, queues: &QueueTable) -> Self {
        Self {
            formatted_duration: format_duration(info.duration_seconds()),
            creation_date: format_date(info.game_creation),
            queue_label: queues.classify(info.queue_id).to_string(),
        }
    }
}

/// `MM:SS`; the minute field widens past two digits instead of wrapping.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn format_date(epoch_millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_millis)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
}

/// Queue id to human label lookup. Ids missing from the table are reported
/// as [`UNKNOWN_QUEUE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTable {
    labels: HashMap<i64, String>,
}

impl Default for QueueTable {
    fn default() -> Self {
        let mut labels = HashMap::new();
        labels.insert(RANKED_SOLO_DUO, "Ranked Solo/Duo".to_string());
        Self { labels }
    }
}

impl QueueTable {
    pub fn empty() -> Self {
        Self {
            labels: HashMap::new(),
        }
    }

    /// Add or replace a label. Blank labels are ignored so the table can never
    /// produce an empty string.
    pub fn with_label(mut self, queue_id: i64, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.labels.insert(queue_id, label.trim().to_string());
        }
        self
    }

    pub fn classify(&self, queue_id: i64) -> &str {
        self.labels
            .get(&queue_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_QUEUE)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

pub fn classify_queue(queue_id: i64) -> String {
    QueueTable::default().classify(queue_id).to_string()
}
