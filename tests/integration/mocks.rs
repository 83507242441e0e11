//! Shared test doubles and fixture builders for the integration suite.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use mockall::mock;
use serde_json::json;

use substrate_pipeline::models::{BlockData, BlockHeader, EventRecord, Extrinsic};
use substrate_pipeline::services::archive::{
	ArchiveClient, ArchiveError, BlockQuery, BlockResponse,
};

mock! {
	pub Archive {}

	#[async_trait]
	impl ArchiveClient for Archive {
		async fn archive_height(&self) -> Result<u64, ArchiveError>;
		async fn fetch_blocks(&self, query: &BlockQuery) -> Result<BlockResponse, ArchiveError>;
		async fn resolve_extrinsics(&self, ids: &[String]) -> Result<Vec<Extrinsic>, ArchiveError>;
	}
}

/// Stateful archive double backed by a fixed block set and a scripted
/// sequence of head heights (the last entry repeats forever).
pub struct ScriptedArchive {
	/// Head heights still to be reported.
	script: Mutex<VecDeque<u64>>,
	/// Last reported head; what block queries are answered against.
	head: Mutex<u64>,
	blocks: Vec<BlockData>,
	extrinsics: Vec<Extrinsic>,
	pub queries: Mutex<Vec<BlockQuery>>,
}

impl ScriptedArchive {
	pub fn new(heights: Vec<u64>, blocks: Vec<BlockData>, extrinsics: Vec<Extrinsic>) -> Self {
		assert!(!heights.is_empty(), "the height script must not be empty");
		ScriptedArchive {
			head: Mutex::new(heights[0]),
			script: Mutex::new(heights.into()),
			blocks,
			extrinsics,
			queries: Mutex::new(Vec::new()),
		}
	}

	fn next_height(&self) -> u64 {
		let mut head = self.head.lock().unwrap();
		if let Some(next) = self.script.lock().unwrap().pop_front() {
			*head = next;
		}
		*head
	}
}

#[async_trait]
impl ArchiveClient for ScriptedArchive {
	async fn archive_height(&self) -> Result<u64, ArchiveError> {
		Ok(self.next_height())
	}

	async fn fetch_blocks(&self, query: &BlockQuery) -> Result<BlockResponse, ArchiveError> {
		self.queries.lock().unwrap().push(query.clone());
		let archive_height = *self.head.lock().unwrap();
		let blocks = self
			.blocks
			.iter()
			.filter(|b| {
				b.block.height >= query.from
					&& b.block.height <= query.to
					&& b.block.height <= archive_height
			})
			.take(query.limit)
			.cloned()
			.collect();
		Ok(BlockResponse {
			archive_height,
			blocks,
		})
	}

	async fn resolve_extrinsics(&self, ids: &[String]) -> Result<Vec<Extrinsic>, ArchiveError> {
		Ok(self
			.extrinsics
			.iter()
			.filter(|x| ids.contains(&x.id))
			.cloned()
			.collect())
	}
}

pub fn header(height: u64) -> BlockHeader {
	BlockHeader {
		id: format!("{:010}-abcde", height),
		height,
		hash: format!("0x{:064x}", height),
		parent_hash: format!("0x{:064x}", height.wrapping_sub(1)),
		timestamp: 1_600_000_000_000 + height * 6_000,
		state_root: None,
		extrinsics_root: None,
		runtime_version: 1,
	}
}

pub fn event(height: u64, index_in_block: u32, name: &str) -> EventRecord {
	EventRecord {
		id: format!("{:010}-{:06}", height, index_in_block),
		name: name.to_string(),
		params: json!({ "amount": 100 }),
		index_in_block,
		block_timestamp: 1_600_000_000_000 + height * 6_000,
		extrinsic_id: None,
		extrinsic: None,
		evm_log_address: None,
		evm_log_topics: Vec::new(),
		evm_log_data: None,
		evm_hash: None,
	}
}

pub fn block(height: u64, events: Vec<EventRecord>) -> BlockData {
	BlockData {
		block: header(height),
		events,
	}
}

pub fn extrinsic(id: &str, name: &str) -> Extrinsic {
	Extrinsic {
		id: id.to_string(),
		name: name.to_string(),
		index_in_block: 1,
		signer: Some("5GrwvaEF...".to_string()),
		args: json!(["0xdeadbeef"]),
		hash: Some(format!("0x{:064x}", 7)),
		tip: None,
	}
}
