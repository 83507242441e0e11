//! Substrate block processing pipeline.
//!
//! A [`Processor`](services::processor::Processor) pulls blocks from an
//! indexing archive, filters them down to what the registered handlers
//! care about, and maps each block inside its own store transaction,
//! tracking a resume watermark as it goes.
//!
//! - `models`: ranges, chain data shapes, hooks and batch types
//! - `services`: archive client, batcher, ingest pipeline, processor, store
//! - `utils`: heap, metrics, logging and small formatting helpers

pub mod models;
pub mod services;
pub mod utils;
