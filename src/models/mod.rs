//! Domain models for the processing pipeline.
//!
//! - `core`: ranges, hooks, handler sets and batches
//! - `blockchain`: raw chain data as returned by the archive

pub mod blockchain;
pub mod core;

pub use blockchain::{
	BlockData, BlockHeader, EventRecord, Extrinsic, QualifiedName, EVM_LOG_EVENT,
	EXTRINSIC_SUCCESS,
};
pub use self::core::{
	Batch, BlockContext, BlockHandler, BlockHook, ClosedRange, ContractAddress, DataBatch,
	DataHandlers, EventContext, EventHandler, EventHook, EvmLogContext, EvmLogHandler, EvmLogHook,
	EvmTopic, ExtrinsicHandler, ExtrinsicHook, Hooks, Range, ANY_TOPICS, TOPICS_SEPARATOR,
};
