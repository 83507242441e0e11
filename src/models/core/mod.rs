//! Core domain types: ranges, hooks, handler sets and batches.

mod batch;
mod hooks;
mod range;

pub use batch::{Batch, DataBatch, DataHandlers};
pub use hooks::{
	BlockContext, BlockHandler, BlockHook, ContractAddress, EventContext, EventHandler, EventHook,
	EvmLogContext, EvmLogHandler, EvmLogHook, EvmTopic, ExtrinsicHandler, ExtrinsicHook, Hooks,
	ANY_TOPICS, TOPICS_SEPARATOR,
};
pub use range::{ClosedRange, Range};
