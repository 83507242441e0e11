//! The processor: registration surface and the block mapping loop.
//!
//! Client code registers hooks, then calls [`Processor::run`] with its
//! archive, database and chain collaborators. The run builds the merged
//! batch list, spawns the ingest pipeline and consumes its output: one
//! transaction per block, handlers dispatched in fixed order (pre, then
//! per event its named handlers, EVM log handlers and extrinsic handlers,
//! then post), watermark advanced with every commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use super::error::ProcessorError;
use super::progress::ProgressTracker;
use crate::models::{
	BlockContext, BlockData, BlockHandler, BlockHook, ContractAddress, DataBatch, DataHandlers,
	EventContext, EventHandler, EventHook, EvmLogContext, EvmLogHandler, EvmLogHook, EvmTopic,
	ExtrinsicHandler, ExtrinsicHook, Hooks, QualifiedName, Range, ANY_TOPICS, EVM_LOG_EVENT,
	EXTRINSIC_SUCCESS,
};
use crate::services::archive::ArchiveClient;
use crate::services::batcher::create_batches;
use crate::services::chain::{ChainContext, ChainManager, ChainSource};
use crate::services::ingest::{Ingest, IngestOptions, DEFAULT_ARCHIVE_POLL_INTERVAL};
use crate::services::store::{Database, Store};
use crate::utils::{format_time_interval, metrics};

const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Default)]
pub struct BlockHookOptions {
	pub range: Option<Range>,
}

#[derive(Default)]
pub struct EventHandlerOptions {
	pub range: Option<Range>,
}

#[derive(Default)]
pub struct ExtrinsicHandlerOptions {
	pub range: Option<Range>,
	/// Events arming the handler; defaults to `system.ExtrinsicSuccess`.
	pub trigger_events: Vec<QualifiedName>,
}

#[derive(Default)]
pub struct EvmLogHandlerOptions {
	pub range: Option<Range>,
	/// Topic filter values; empty matches any topic set.
	pub filter: Vec<EvmTopic>,
}

pub struct Processor {
	name: String,
	hooks: Hooks,
	block_range: Range,
	batch_size: usize,
	poll_interval: Duration,
	running: bool,
}

impl Processor {
	pub fn new(name: impl Into<String>) -> Self {
		Processor {
			name: name.into(),
			hooks: Hooks::default(),
			block_range: Range::all(),
			batch_size: DEFAULT_BATCH_SIZE,
			poll_interval: DEFAULT_ARCHIVE_POLL_INTERVAL,
			running: false,
		}
	}

	fn assert_not_running(&self) {
		assert!(
			!self.running,
			"settings modifications are not allowed after start of processing"
		);
	}

	pub fn set_block_range(&mut self, range: Range) {
		self.assert_not_running();
		self.block_range = range;
	}

	pub fn set_batch_size(&mut self, size: usize) {
		self.assert_not_running();
		assert!(size > 0, "batch size must be positive");
		self.batch_size = size;
	}

	pub fn set_archive_poll_interval(&mut self, interval: Duration) {
		self.assert_not_running();
		self.poll_interval = interval;
	}

	pub fn add_pre_hook(&mut self, options: BlockHookOptions, handler: BlockHandler) {
		self.assert_not_running();
		self.hooks.pre.push(BlockHook {
			range: options.range,
			handler,
		});
	}

	pub fn add_post_hook(&mut self, options: BlockHookOptions, handler: BlockHandler) {
		self.assert_not_running();
		self.hooks.post.push(BlockHook {
			range: options.range,
			handler,
		});
	}

	pub fn add_event_handler(
		&mut self,
		event: impl Into<QualifiedName>,
		options: EventHandlerOptions,
		handler: EventHandler,
	) {
		self.assert_not_running();
		self.hooks.event.push(EventHook {
			event: event.into(),
			range: options.range,
			handler,
		});
	}

	/// Registers a handler for an extrinsic, armed by the given trigger
	/// events (one hook per distinct trigger).
	pub fn add_extrinsic_handler(
		&mut self,
		extrinsic: impl Into<QualifiedName>,
		options: ExtrinsicHandlerOptions,
		handler: ExtrinsicHandler,
	) {
		self.assert_not_running();
		let extrinsic = extrinsic.into();
		let mut triggers = options.trigger_events;
		if triggers.is_empty() {
			triggers.push(EXTRINSIC_SUCCESS.to_string());
		}
		let mut seen: Vec<&QualifiedName> = Vec::new();
		for event in &triggers {
			if seen.contains(&event) {
				continue;
			}
			seen.push(event);
			self.hooks.extrinsic.push(ExtrinsicHook {
				event: event.clone(),
				extrinsic: extrinsic.clone(),
				range: options.range,
				handler: handler.clone(),
			});
		}
	}

	pub fn add_evm_log_handler(
		&mut self,
		contract_address: impl Into<ContractAddress>,
		options: EvmLogHandlerOptions,
		handler: EvmLogHandler,
	) {
		self.assert_not_running();
		self.hooks.evm_log.push(EvmLogHook {
			contract_address: contract_address.into(),
			topics: options.filter,
			range: options.range,
			handler,
		});
	}

	/// Runs the processor to the end of its block range (forever for an
	/// open-ended range). Resumes from the database watermark. Calling
	/// `run` on a processor that already ran is a no-op.
	pub async fn run<A, D, C>(
		&mut self,
		archive: A,
		database: &mut D,
		chain_source: C,
	) -> Result<(), ProcessorError>
	where
		A: ArchiveClient + 'static,
		D: Database,
		C: ChainSource,
	{
		if self.running {
			return Ok(());
		}
		self.running = true;

		let height_at_start = database.init().await.map_err(ProcessorError::store)?;
		if let Some(height) = height_at_start {
			metrics::LAST_PROCESSED_BLOCK.set(height as f64);
		}

		let resume_from = height_at_start.map_or(0, |h| h + 1);
		if self.block_range.end() < resume_from {
			info!(
				processor = %self.name,
				"Block range already processed, nothing to do"
			);
			return Ok(());
		}
		let run_range = Range::new(self.block_range.from.max(resume_from), self.block_range.to);

		let batches = create_batches(&self.hooks, run_range);
		let whole_range: Vec<Range> = create_batches(&self.hooks, self.block_range)
			.iter()
			.map(|b| b.range)
			.collect();
		let mut progress = ProgressTracker::new(
			whole_range,
			height_at_start,
			height_at_start.unwrap_or(0),
			Instant::now(),
		);

		let ingest = Ingest::spawn(IngestOptions {
			archive,
			batches,
			batch_size: self.batch_size,
			poll_interval: self.poll_interval,
		});
		let chain_manager = ChainManager::new(chain_source);

		info!(processor = %self.name, from = run_range.from, "Starting processing");
		self.process(ingest, &chain_manager, database, &mut progress)
			.await
	}

	async fn process<D: Database, C: ChainSource>(
		&self,
		mut ingest: Ingest,
		chain_manager: &ChainManager<C>,
		database: &mut D,
		progress: &mut ProgressTracker,
	) -> Result<(), ProcessorError> {
		let mut last_block: Option<u64> = None;
		while let Some(batch) = ingest.next_batch().await {
			let DataBatch {
				range,
				blocks,
				handlers,
			} = batch;
			let mapping_start = Instant::now();

			for block_data in &blocks {
				let height = block_data.block.height;
				assert_block_order(last_block, height);
				let chain = chain_manager
					.chain_for_block(&block_data.block)
					.await
					.map_err(ProcessorError::chain)?;
				let handlers = &handlers;
				let chain = &*chain;
				database
					.transact(
						height,
						Box::new(move |store| dispatch_block(handlers, block_data, chain, store)),
					)
					.await
					.map_err(ProcessorError::store)?;
				last_block = Some(height);
				metrics::LAST_PROCESSED_BLOCK.set(height as f64);
			}

			// An empty tail with no matching blocks still advances the
			// watermark, so a resumed run never re-scans those heights.
			if last_block.map_or(true, |h| h < range.to) {
				last_block = Some(range.to);
				database
					.set_height(range.to)
					.await
					.map_err(ProcessorError::store)?;
				metrics::LAST_PROCESSED_BLOCK.set(range.to as f64);
			}

			let now = Instant::now();
			if !blocks.is_empty() {
				let elapsed = (now - mapping_start).as_secs_f64();
				if elapsed > 0.0 {
					metrics::MAPPING_SPEED.set(blocks.len() as f64 / elapsed);
				}
			}
			progress.batch(now, range, metrics::CHAIN_HEIGHT.get() as u64);

			info!(
				processor = %self.name,
				last_block = last_block.unwrap_or(0),
				mapping_bps = metrics::MAPPING_SPEED.get().round(),
				ingest_bps = metrics::INGEST_SPEED.get().round(),
				eta = %format_time_interval(progress.sync_eta()),
				progress = format!("{}%", (progress.sync_ratio() * 100.0).round()),
				"Batch processed"
			);
		}
		ingest.close().await.map_err(ProcessorError::ingest)
	}
}

fn assert_block_order(last_block: Option<u64>, height: u64) {
	if let Some(last) = last_block {
		assert!(
			height > last,
			"block {} is not above the last processed height {}",
			height,
			last
		);
	}
}

/// Runs every applicable handler for one block, in fixed order, against
/// the transaction-scoped store.
fn dispatch_block(
	handlers: &DataHandlers,
	block_data: &BlockData,
	chain: &ChainContext,
	store: &mut dyn Store,
) -> anyhow::Result<()> {
	let block = &block_data.block;

	for pre in &handlers.pre {
		pre(&mut BlockContext {
			block,
			events: &block_data.events,
			chain,
			store,
		})?;
	}

	for event in &block_data.events {
		let extrinsic = event.extrinsic.as_ref();

		if let Some(event_handlers) = handlers.events.get(&event.name) {
			for handler in event_handlers {
				handler(&mut EventContext {
					block,
					event,
					extrinsic,
					chain,
					store,
				})?;
			}
		}

		if let Some(address) = event.evm_log_address.as_deref() {
			for handler in evm_log_handlers(&handlers.evm_logs, event) {
				handler(&mut EvmLogContext {
					contract_address: address,
					topics: &event.evm_log_topics,
					data: event.evm_log_data.as_deref(),
					tx_hash: event.evm_hash.as_deref(),
					block,
					event,
					extrinsic,
					chain,
					store,
				})?;
			}
		}

		if let Some(extrinsic) = extrinsic {
			if let Some(by_extrinsic) = handlers.extrinsics.get(&event.name) {
				if let Some(extrinsic_handlers) = by_extrinsic.get(&extrinsic.name) {
					for handler in extrinsic_handlers {
						handler(&mut EventContext {
							block,
							event,
							extrinsic: Some(extrinsic),
							chain,
							store,
						})?;
					}
				}
			}
		}
	}

	for post in &handlers.post {
		post(&mut BlockContext {
			block,
			events: &block_data.events,
			chain,
			store,
		})?;
	}

	Ok(())
}

/// Materialized ordered handler list for one EVM log event: wildcard
/// handlers first in registration order, then handlers keyed by each of
/// the event's topics. Deduplicated by handler identity, so a handler
/// matching several filters fires exactly once per event.
fn evm_log_handlers<'a>(
	evm_logs: &'a HashMap<ContractAddress, HashMap<String, Vec<EvmLogHandler>>>,
	event: &crate::models::EventRecord,
) -> Vec<&'a EvmLogHandler> {
	if event.name != EVM_LOG_EVENT {
		return Vec::new();
	}
	let Some(address) = &event.evm_log_address else {
		return Vec::new();
	};
	let Some(contract_handlers) = evm_logs.get(address) else {
		return Vec::new();
	};

	let mut selected: Vec<&EvmLogHandler> = Vec::new();
	if let Some(wildcard) = contract_handlers.get(ANY_TOPICS) {
		selected.extend(wildcard.iter());
	}
	for topic in &event.evm_log_topics {
		if let Some(topic_handlers) = contract_handlers.get(topic.as_str()) {
			for handler in topic_handlers {
				if !selected.iter().any(|s| Arc::ptr_eq(s, handler)) {
					selected.push(handler);
				}
			}
		}
	}
	selected
}
