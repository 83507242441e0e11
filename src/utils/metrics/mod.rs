//! Metrics for the processing pipeline.
//!
//! - This module contains the global Prometheus registry.
//! - Defines the sync progress gauges the ingest pipeline and the
//!   processing loop report into.
//!
//! Reporting is fire-and-forget: nothing in the pipeline ever blocks on a
//! gauge. Serving the registry over HTTP is left to the embedding
//! application.

use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};

lazy_static! {
	// Global Prometheus registry.
	pub static ref REGISTRY: Registry = Registry::new();

	// Height of the last block committed by the processing loop.
	pub static ref LAST_PROCESSED_BLOCK: Gauge = {
		let gauge = Gauge::with_opts(Opts::new(
			"sp_last_processed_block",
			"Height of the last processed block",
		))
		.unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Highest chain height reported by the archive.
	pub static ref CHAIN_HEIGHT: Gauge = {
		let gauge = Gauge::with_opts(Opts::new(
			"sp_chain_height",
			"Chain height as reported by the archive",
		))
		.unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Ingestion throughput in blocks per second.
	pub static ref INGEST_SPEED: Gauge = {
		let gauge = Gauge::with_opts(Opts::new(
			"sp_ingest_blocks_per_second",
			"Archive ingestion speed",
		))
		.unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Handler execution throughput in blocks per second.
	pub static ref MAPPING_SPEED: Gauge = {
		let gauge = Gauge::with_opts(Opts::new(
			"sp_mapping_blocks_per_second",
			"Block mapping speed",
		))
		.unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Estimated seconds until the processor catches up with the chain.
	pub static ref SYNC_ETA_SECONDS: Gauge = {
		let gauge = Gauge::with_opts(Opts::new("sp_sync_eta_seconds", "Sync ETA")).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Fraction of the requested block ranges already processed.
	pub static ref SYNC_RATIO: Gauge = {
		let gauge = Gauge::with_opts(Opts::new("sp_sync_ratio", "Sync progress ratio")).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};
}

/// Encodes the registry in the Prometheus text exposition format.
pub fn gather_metrics() -> Result<Vec<u8>, prometheus::Error> {
	let encoder = TextEncoder::new();
	let mut buffer = Vec::new();
	encoder.encode(&REGISTRY.gather(), &mut buffer)?;
	Ok(buffer)
}
