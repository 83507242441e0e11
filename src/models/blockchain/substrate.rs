//! Raw chain data as returned by the archive.
//!
//! Blocks, events and extrinsics are plain data carriers: the archive
//! client fills them in, the ingest pipeline joins extrinsics onto events,
//! and the processing loop hands them to registered handlers.

use serde::{Deserialize, Serialize};

/// Fully qualified event or extrinsic name, e.g. `balances.Transfer`.
pub type QualifiedName = String;

/// Event name under which EVM log records surface on the chain.
pub const EVM_LOG_EVENT: &str = "evm.Log";

/// Trigger event armed by default for extrinsic handlers.
pub const EXTRINSIC_SUCCESS: &str = "system.ExtrinsicSuccess";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
	pub id: String,
	pub height: u64,
	pub hash: String,
	pub parent_hash: String,
	/// Unix timestamp in milliseconds.
	pub timestamp: u64,
	pub state_root: Option<String>,
	pub extrinsics_root: Option<String>,
	pub runtime_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
	pub id: String,
	pub name: QualifiedName,
	pub params: serde_json::Value,
	pub index_in_block: u32,
	pub block_timestamp: u64,
	/// Reference returned by the block query; resolved into `extrinsic`
	/// by the ingest join.
	pub extrinsic_id: Option<String>,
	pub extrinsic: Option<Extrinsic>,
	pub evm_log_address: Option<String>,
	pub evm_log_topics: Vec<String>,
	pub evm_log_data: Option<String>,
	pub evm_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extrinsic {
	pub id: String,
	pub name: QualifiedName,
	pub index_in_block: u32,
	pub signer: Option<String>,
	pub args: serde_json::Value,
	pub hash: Option<String>,
	pub tip: Option<String>,
}

/// One block together with the events selected for it.
#[derive(Debug, Clone)]
pub struct BlockData {
	pub block: BlockHeader,
	pub events: Vec<EventRecord>,
}
