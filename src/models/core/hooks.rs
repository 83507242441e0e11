//! Handler registration types and the contexts handlers execute against.
//!
//! A hook is one registered handler with an optional height range.
//! Handlers are shared closures; their identity (`Arc::ptr_eq`) is what
//! the EVM log dispatch dedups on, so the same registration fires at most
//! once per event no matter how many filters it matched.

use std::sync::Arc;

use crate::models::blockchain::{BlockHeader, EventRecord, Extrinsic, QualifiedName};
use crate::models::core::range::Range;
use crate::services::chain::ChainContext;
use crate::services::store::Store;

/// EVM contract address in its archive-normalized hex form.
pub type ContractAddress = String;

/// An EVM log topic value.
pub type EvmTopic = String;

/// Topic map key matching any topic set for the contract.
pub const ANY_TOPICS: &str = "*";

/// Separator joining topic values into a deterministic map key.
pub const TOPICS_SEPARATOR: char = '|';

/// Context passed to pre- and post-block handlers.
pub struct BlockContext<'a> {
	pub block: &'a BlockHeader,
	pub events: &'a [EventRecord],
	pub chain: &'a ChainContext,
	pub store: &'a mut dyn Store,
}

/// Context passed to event and extrinsic handlers.
pub struct EventContext<'a> {
	pub block: &'a BlockHeader,
	pub event: &'a EventRecord,
	pub extrinsic: Option<&'a Extrinsic>,
	pub chain: &'a ChainContext,
	pub store: &'a mut dyn Store,
}

/// Context passed to EVM log handlers.
pub struct EvmLogContext<'a> {
	pub contract_address: &'a str,
	pub topics: &'a [EvmTopic],
	pub data: Option<&'a str>,
	pub tx_hash: Option<&'a str>,
	pub block: &'a BlockHeader,
	pub event: &'a EventRecord,
	pub extrinsic: Option<&'a Extrinsic>,
	pub chain: &'a ChainContext,
	pub store: &'a mut dyn Store,
}

pub type BlockHandler = Arc<dyn Fn(&mut BlockContext) -> anyhow::Result<()> + Send + Sync>;
pub type EventHandler = Arc<dyn Fn(&mut EventContext) -> anyhow::Result<()> + Send + Sync>;
pub type ExtrinsicHandler = Arc<dyn Fn(&mut EventContext) -> anyhow::Result<()> + Send + Sync>;
pub type EvmLogHandler = Arc<dyn Fn(&mut EvmLogContext) -> anyhow::Result<()> + Send + Sync>;

pub struct BlockHook {
	pub range: Option<Range>,
	pub handler: BlockHandler,
}

pub struct EventHook {
	pub event: QualifiedName,
	pub range: Option<Range>,
	pub handler: EventHandler,
}

pub struct ExtrinsicHook {
	/// Event arming this hook, e.g. `system.ExtrinsicSuccess`.
	pub event: QualifiedName,
	pub extrinsic: QualifiedName,
	pub range: Option<Range>,
	pub handler: ExtrinsicHandler,
}

pub struct EvmLogHook {
	pub contract_address: ContractAddress,
	/// Topic filter values, empty meaning any topic set.
	pub topics: Vec<EvmTopic>,
	pub range: Option<Range>,
	pub handler: EvmLogHandler,
}

/// Everything registered on a processor, in registration order.
#[derive(Default)]
pub struct Hooks {
	pub pre: Vec<BlockHook>,
	pub post: Vec<BlockHook>,
	pub event: Vec<EventHook>,
	pub extrinsic: Vec<ExtrinsicHook>,
	pub evm_log: Vec<EvmLogHook>,
}

impl EvmLogHook {
	/// Topic map key for this hook: the joined topic values, or the
	/// wildcard marker when no filter was given.
	pub fn topics_key(&self) -> String {
		if self.topics.is_empty() {
			ANY_TOPICS.to_string()
		} else {
			self.topics.join(&TOPICS_SEPARATOR.to_string())
		}
	}
}
