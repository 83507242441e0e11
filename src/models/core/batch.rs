//! Batches: a height range bound to every handler applicable throughout it.

use std::collections::HashMap;

use crate::models::blockchain::{BlockData, QualifiedName};
use crate::models::core::hooks::{
	BlockHandler, ContractAddress, EventHandler, EvmLogHandler, ExtrinsicHandler,
};
use crate::models::core::range::{ClosedRange, Range};

/// The handler set attached to a batch.
///
/// Lists keep registration order; maps merge key-wise when batches are
/// coalesced.
#[derive(Clone, Default)]
pub struct DataHandlers {
	pub pre: Vec<BlockHandler>,
	pub post: Vec<BlockHandler>,
	pub events: HashMap<QualifiedName, Vec<EventHandler>>,
	/// Trigger event -> extrinsic -> handlers.
	pub extrinsics: HashMap<QualifiedName, HashMap<QualifiedName, Vec<ExtrinsicHandler>>>,
	/// Contract address -> topic key -> handlers.
	pub evm_logs: HashMap<ContractAddress, HashMap<String, Vec<EvmLogHandler>>>,
}

impl DataHandlers {
	/// Union of two handler sets: lists concatenated preserving each
	/// side's internal order, maps merged key-wise.
	pub fn merge(a: &DataHandlers, b: &DataHandlers) -> DataHandlers {
		DataHandlers {
			pre: concat(&a.pre, &b.pre),
			post: concat(&a.post, &b.post),
			events: merge_maps(&a.events, &b.events, |ha, hb| concat(ha, hb)),
			extrinsics: merge_maps(&a.extrinsics, &b.extrinsics, |ea, eb| {
				merge_maps(ea, eb, |ha, hb| concat(ha, hb))
			}),
			evm_logs: merge_maps(&a.evm_logs, &b.evm_logs, |ea, eb| {
				merge_maps(ea, eb, |ha, hb| concat(ha, hb))
			}),
		}
	}
}

fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
	let mut out = Vec::with_capacity(a.len() + b.len());
	out.extend_from_slice(a);
	out.extend_from_slice(b);
	out
}

fn merge_maps<V: Clone>(
	a: &HashMap<String, V>,
	b: &HashMap<String, V>,
	merge_items: impl Fn(&V, &V) -> V,
) -> HashMap<String, V> {
	let mut result = HashMap::with_capacity(a.len() + b.len());
	for (key, va) in a {
		match b.get(key) {
			Some(vb) => result.insert(key.clone(), merge_items(va, vb)),
			None => result.insert(key.clone(), va.clone()),
		};
	}
	for (key, vb) in b {
		result.entry(key.clone()).or_insert_with(|| vb.clone());
	}
	result
}

/// A height range bound to the handlers applicable throughout it.
///
/// After merging, batches are pairwise range-disjoint and height-ordered.
#[derive(Clone)]
pub struct Batch {
	pub range: Range,
	pub handlers: DataHandlers,
}

/// A batch whose range has been fully resolved, together with the blocks
/// actually fetched for that slice.
pub struct DataBatch {
	pub range: ClosedRange,
	pub blocks: Vec<BlockData>,
	pub handlers: DataHandlers,
}
