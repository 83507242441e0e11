//! Service layer of the pipeline.
//!
//! - `archive`: GraphQL client for the indexing archive
//! - `batcher`: turns registered hooks into an ordered batch plan
//! - `chain`: runtime-versioned chain metadata resolution
//! - `ingest`: background block fetching with a bounded output queue
//! - `processor`: the registration surface and the mapping loop
//! - `store`: transactional store and watermark persistence

pub mod archive;
pub mod batcher;
pub mod chain;
pub mod ingest;
pub mod processor;
pub mod store;
