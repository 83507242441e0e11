//! Archive data source contract.
//!
//! Only field semantics and ordering guarantees are part of this
//! contract; transport and encoding belong to the implementation.

use async_trait::async_trait;

use super::error::ArchiveError;
use crate::models::{BlockData, Extrinsic, QualifiedName};

/// Archive-side selection of blocks worth fetching: a disjunction over
/// the registered event, extrinsic and EVM log selectors.
///
/// `None` at the query level means every block in range is required
/// (a pre- or post-block hook is present).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSelection {
	pub events: Vec<QualifiedName>,
	/// Trigger event paired with the extrinsic names it arms.
	pub extrinsics: Vec<(QualifiedName, Vec<QualifiedName>)>,
	pub evm_logs: Vec<EvmLogSelection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvmLogSelection {
	pub contract: String,
	/// Topic values the log must contain; empty matches any topic set.
	pub topics: Vec<String>,
}

impl BlockSelection {
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.extrinsics.is_empty() && self.evm_logs.is_empty()
	}
}

/// A bounded page request against the archive.
#[derive(Debug, Clone)]
pub struct BlockQuery {
	pub from: u64,
	pub to: u64,
	/// Maximum number of blocks to return.
	pub limit: usize,
	pub selection: Option<BlockSelection>,
}

/// One page of blocks plus the archive head known at response time.
#[derive(Debug)]
pub struct BlockResponse {
	pub archive_height: u64,
	/// Ascending by height; events ascending by in-block index.
	pub blocks: Vec<BlockData>,
}

/// External service indexing raw chain data, queryable by height range
/// and filter.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
	/// Current archive head height.
	async fn archive_height(&self) -> Result<u64, ArchiveError>;

	/// At most `query.limit` blocks in `[query.from, query.to]` matching
	/// the selection, ascending by height.
	async fn fetch_blocks(&self, query: &BlockQuery) -> Result<BlockResponse, ArchiveError>;

	/// Resolves extrinsic ids into full records. Order is unspecified.
	async fn resolve_extrinsics(&self, ids: &[String]) -> Result<Vec<Extrinsic>, ArchiveError>;
}
