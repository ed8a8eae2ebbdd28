//! Match telemetry ingestion: decode a match document, derive presentation
//! fields, summarize participants and persist one `matchHistory` row.

pub mod batch;
pub mod config;
pub mod derive;
pub mod error;
pub mod ingest;
pub mod match_schema;
pub mod riot_api;
pub mod row;
pub mod store;
pub mod summarize;
#[cfg(test)]
mod test_support;

pub use error::{IngestionError, MappingError, SchemaError, StorageError};
pub use ingest::Ingestor;
pub use row::MatchRow;
