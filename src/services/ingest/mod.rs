//! Archive ingestion: batch-by-batch block fetching behind a bounded
//! queue.

mod error;
mod service;

pub use error::IngestError;
pub use service::{Ingest, IngestOptions, DEFAULT_ARCHIVE_POLL_INTERVAL};
