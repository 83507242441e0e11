//! Archive data source: the contract the ingest pipeline consumes, plus
//! the GraphQL-over-HTTP implementation.

mod client;
mod error;
mod http;

pub use client::{ArchiveClient, BlockQuery, BlockResponse, BlockSelection, EvmLogSelection};
pub use error::ArchiveError;
pub use http::HttpArchiveClient;
