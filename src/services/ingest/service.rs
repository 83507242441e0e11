//! The ingestion pipeline.
//!
//! A spawned task walks the pending batch worklist front to back: it
//! waits (politely, on a poll interval) for the archive to reach each
//! batch's start, fetches bounded pages of block data with the filter
//! implied by the batch's handlers, joins referenced extrinsics, and
//! streams completed [`DataBatch`]es through a bounded queue towards the
//! processing loop. The queue depth bounds how far fetching runs ahead of
//! mapping; its `send` is the sole backpressure mechanism.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::error::IngestError;
use crate::models::{
	Batch, BlockData, ClosedRange, DataBatch, DataHandlers, Range, ANY_TOPICS, TOPICS_SEPARATOR,
};
use crate::services::archive::{
	ArchiveClient, BlockQuery, BlockSelection, EvmLogSelection,
};
use crate::utils::metrics;

/// How far fetching may run ahead of mapping.
const OUTPUT_QUEUE_DEPTH: usize = 3;

pub const DEFAULT_ARCHIVE_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct IngestOptions<A> {
	pub archive: A,
	/// Pending batches, disjoint and ascending. The worker owns this
	/// worklist: it advances the head batch's range as pages complete and
	/// shrinks the list from the front as ranges are fulfilled.
	pub batches: Vec<Batch>,
	/// Maximum number of blocks in a single fetch.
	pub batch_size: usize,
	pub poll_interval: Duration,
}

/// Handle to a running ingest task.
pub struct Ingest {
	out: mpsc::Receiver<DataBatch>,
	shutdown: watch::Sender<bool>,
	ingestion: JoinHandle<Result<(), IngestError>>,
}

impl Ingest {
	pub fn spawn<A: ArchiveClient + 'static>(options: IngestOptions<A>) -> Self {
		assert!(options.batch_size > 0, "batch size must be positive");
		let (out_tx, out_rx) = mpsc::channel(OUTPUT_QUEUE_DEPTH);
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let worker = IngestWorker {
			archive: options.archive,
			batches: options.batches.into(),
			archive_height: None,
			limit: options.batch_size,
			poll_interval: options.poll_interval,
			out: out_tx,
			shutdown: shutdown_rx,
		};
		Ingest {
			out: out_rx,
			shutdown: shutdown_tx,
			ingestion: tokio::spawn(worker.run()),
		}
	}

	/// Next completed data batch, or `None` once the stream has ended.
	/// Stream end does not imply success: `close` surfaces the error.
	pub async fn next_batch(&mut self) -> Option<DataBatch> {
		self.out.recv().await
	}

	/// Signals shutdown, awaits loop termination and surfaces any error
	/// the pipeline hit. A cooperative abort is not an error.
	pub async fn close(self) -> Result<(), IngestError> {
		let _ = self.shutdown.send(true);
		drop(self.out);
		match self.ingestion.await {
			Ok(Ok(())) | Ok(Err(IngestError::Aborted)) => Ok(()),
			Ok(Err(err)) => Err(err),
			Err(join_err) => Err(IngestError::consistency(format!(
				"ingestion task failed: {}",
				join_err
			))),
		}
	}
}

struct IngestWorker<A> {
	archive: A,
	batches: VecDeque<Batch>,
	/// Highest archive head seen so far; `None` until the first status
	/// response.
	archive_height: Option<u64>,
	limit: usize,
	poll_interval: Duration,
	out: mpsc::Sender<DataBatch>,
	shutdown: watch::Receiver<bool>,
}

impl<A: ArchiveClient> IngestWorker<A> {
	async fn run(mut self) -> Result<(), IngestError> {
		while let Some(front) = self.batches.front() {
			if *self.shutdown.borrow() {
				return Err(IngestError::Aborted);
			}
			let minimum = front.range.from;
			let archive_height = self.wait_for_height(minimum).await?;

			let fetch_start = Instant::now();
			let blocks = self.fetch_batch(archive_height).await?;

			let batch = self
				.batches
				.front_mut()
				.expect("worklist head checked above");
			validate_fetched(&batch.range, &blocks, self.limit, archive_height)?;

			let from = batch.range.from;
			let range_end = batch.range.end();
			let last_height = blocks.last().map(|b| b.block.height);
			let handlers = batch.handlers.clone();

			let to = match last_height {
				Some(last) if blocks.len() == self.limit && last < range_end => {
					// Page full below the range end: the completed slice
					// stops at the last fetched block.
					batch.range = Range::new(last + 1, batch.range.to);
					last
				}
				_ if archive_height < range_end => {
					// Caught up with the chain tip, range still open.
					batch.range = Range::new(archive_height + 1, batch.range.to);
					archive_height
				}
				_ => {
					let to = batch
						.range
						.to
						.expect("archive height reached the end of an open range");
					self.batches.pop_front();
					to
				}
			};

			if !blocks.is_empty() {
				let elapsed = fetch_start.elapsed().as_secs_f64();
				if elapsed > 0.0 {
					metrics::INGEST_SPEED.set(blocks.len() as f64 / elapsed);
				}
			}

			debug!(from, to, blocks = blocks.len(), "Ingested batch slice");

			let data_batch = DataBatch {
				range: ClosedRange { from, to },
				blocks,
				handlers,
			};
			tokio::select! {
				sent = self.out.send(data_batch) => {
					if sent.is_err() {
						// Consumer went away; treat like a shutdown.
						return Err(IngestError::Aborted);
					}
				}
				_ = self.shutdown.changed() => return Err(IngestError::Aborted),
			}
		}
		Ok(())
	}

	async fn fetch_batch(&mut self, archive_height: u64) -> Result<Vec<BlockData>, IngestError> {
		let batch = self
			.batches
			.front()
			.expect("fetch_batch requires a pending batch");
		let query = BlockQuery {
			from: batch.range.from,
			to: archive_height.min(batch.range.end()),
			limit: self.limit,
			selection: derive_selection(&batch.handlers),
		};
		let response = self
			.archive
			.fetch_blocks(&query)
			.await
			.map_err(IngestError::archive)?;
		self.set_archive_height(response.archive_height);
		let mut blocks = response.blocks;
		self.join_extrinsics(&mut blocks).await?;
		Ok(blocks)
	}

	/// Resolves the distinct extrinsic ids referenced by the fetched
	/// events and patches the full records into the events.
	async fn join_extrinsics(&self, blocks: &mut [BlockData]) -> Result<(), IngestError> {
		let mut ids: Vec<String> = Vec::new();
		for block in blocks.iter() {
			for event in &block.events {
				if let Some(id) = &event.extrinsic_id {
					if !ids.contains(id) {
						ids.push(id.clone());
					}
				}
			}
		}
		if ids.is_empty() {
			return Ok(());
		}

		let records = self
			.archive
			.resolve_extrinsics(&ids)
			.await
			.map_err(IngestError::archive)?;
		let by_id: HashMap<&str, _> = records.iter().map(|x| (x.id.as_str(), x)).collect();

		for block in blocks.iter_mut() {
			for event in &mut block.events {
				if let Some(id) = &event.extrinsic_id {
					let record = by_id.get(id.as_str()).ok_or_else(|| {
						IngestError::consistency(format!(
							"event {} references extrinsic {} which the archive did not resolve",
							event.id, id
						))
					})?;
					event.extrinsic = Some((*record).clone());
				}
			}
		}
		Ok(())
	}

	/// Blocks until the archive reaches `minimum`, polling its status on
	/// the configured interval. Not being there yet is not an error.
	async fn wait_for_height(&mut self, minimum: u64) -> Result<u64, IngestError> {
		loop {
			if let Some(height) = self.archive_height {
				if height >= minimum {
					return Ok(height);
				}
			}
			let head = self
				.archive
				.archive_height()
				.await
				.map_err(IngestError::archive)?;
			self.set_archive_height(head);
			if let Some(height) = self.archive_height {
				if height >= minimum {
					return Ok(height);
				}
			}
			debug!(minimum, head, "Waiting for the archive to catch up");
			tokio::select! {
				_ = tokio::time::sleep(self.poll_interval) => {}
				_ = self.shutdown.changed() => return Err(IngestError::Aborted),
			}
		}
	}

	fn set_archive_height(&mut self, head: u64) {
		let height = self.archive_height.map_or(head, |h| h.max(head));
		self.archive_height = Some(height);
		metrics::CHAIN_HEIGHT.set(height as f64);
	}
}

/// Archive-side selection implied by a batch's handlers: when a pre- or
/// post-block hook is present every block is required and no filter
/// applies; otherwise only blocks with matching events are worth
/// fetching. Selector lists are sorted so queries are deterministic.
fn derive_selection(handlers: &DataHandlers) -> Option<BlockSelection> {
	if !handlers.pre.is_empty() || !handlers.post.is_empty() {
		return None;
	}

	let mut events: Vec<_> = handlers.events.keys().cloned().collect();
	events.sort();

	let mut extrinsics: Vec<_> = handlers
		.extrinsics
		.iter()
		.map(|(event, by_extrinsic)| {
			let mut names: Vec<_> = by_extrinsic.keys().cloned().collect();
			names.sort();
			(event.clone(), names)
		})
		.collect();
	extrinsics.sort();

	let mut evm_logs: Vec<EvmLogSelection> = Vec::new();
	let mut contracts: Vec<_> = handlers.evm_logs.iter().collect();
	contracts.sort_by(|a, b| a.0.cmp(b.0));
	for (contract, by_topics) in contracts {
		let mut keys: Vec<_> = by_topics.keys().collect();
		keys.sort();
		for key in keys {
			let topics = if key == ANY_TOPICS {
				Vec::new()
			} else {
				key.split(TOPICS_SEPARATOR).map(str::to_string).collect()
			};
			evm_logs.push(EvmLogSelection {
				contract: contract.clone(),
				topics,
			});
		}
	}

	Some(BlockSelection {
		events,
		extrinsics,
		evm_logs,
	})
}

/// Internal-consistency checks over fetched data. A violation indicates a
/// corrupted range merge or an inconsistent archive, never retried.
fn validate_fetched(
	range: &Range,
	blocks: &[BlockData],
	limit: usize,
	archive_height: u64,
) -> Result<(), IngestError> {
	if blocks.is_empty() {
		return Ok(());
	}
	if blocks.len() > limit {
		return Err(IngestError::consistency(format!(
			"archive returned {} blocks for a limit of {}",
			blocks.len(),
			limit
		)));
	}
	let first = &blocks[0].block;
	if first.height < range.from {
		return Err(IngestError::consistency(format!(
			"first block {} precedes the requested range start {}",
			first.height, range.from
		)));
	}
	let last = &blocks[blocks.len() - 1].block;
	if last.height > range.end() {
		return Err(IngestError::consistency(format!(
			"last block {} exceeds the requested range end {}",
			last.height,
			range.end()
		)));
	}
	if last.height > archive_height {
		return Err(IngestError::consistency(format!(
			"last block {} exceeds the reported archive height {}",
			last.height, archive_height
		)));
	}
	for pair in blocks.windows(2) {
		if pair[0].block.height >= pair[1].block.height {
			return Err(IngestError::consistency(format!(
				"block heights out of order: {} then {}",
				pair[0].block.height, pair[1].block.height
			)));
		}
	}
	for block in blocks {
		for pair in block.events.windows(2) {
			if pair[0].index_in_block >= pair[1].index_in_block {
				return Err(IngestError::consistency(format!(
					"event indices out of order in block {}: {} then {}",
					block.block.height, pair[0].index_in_block, pair[1].index_in_block
				)));
			}
		}
	}
	Ok(())
}
