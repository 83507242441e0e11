//! Batch building and coalescing.
//!
//! Registered hooks start out as one singleton-handler batch per hook,
//! clipped to the run's global block range. The merge sweep then turns
//! that overlapping set into a minimal list of disjoint, height-ordered
//! batches, each carrying the union of every handler applicable in its
//! range.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{Batch, DataHandlers, Hooks, Range};
use crate::utils::Heap;

/// One singleton-handler batch per hook surviving intersection with
/// `block_range`, swept into a disjoint ordered set.
pub fn create_batches(hooks: &Hooks, block_range: Range) -> Vec<Batch> {
	let mut batches: Vec<Batch> = Vec::new();

	let clip = |range: &Option<Range>| -> Option<Range> {
		range.unwrap_or_else(Range::all).intersection(&block_range)
	};

	for hook in &hooks.pre {
		if let Some(range) = clip(&hook.range) {
			batches.push(Batch {
				range,
				handlers: DataHandlers {
					pre: vec![hook.handler.clone()],
					..Default::default()
				},
			});
		}
	}

	for hook in &hooks.post {
		if let Some(range) = clip(&hook.range) {
			batches.push(Batch {
				range,
				handlers: DataHandlers {
					post: vec![hook.handler.clone()],
					..Default::default()
				},
			});
		}
	}

	for hook in &hooks.event {
		if let Some(range) = clip(&hook.range) {
			let mut events = HashMap::new();
			events.insert(hook.event.clone(), vec![hook.handler.clone()]);
			batches.push(Batch {
				range,
				handlers: DataHandlers {
					events,
					..Default::default()
				},
			});
		}
	}

	for hook in &hooks.extrinsic {
		if let Some(range) = clip(&hook.range) {
			let mut by_extrinsic = HashMap::new();
			by_extrinsic.insert(hook.extrinsic.clone(), vec![hook.handler.clone()]);
			let mut extrinsics = HashMap::new();
			extrinsics.insert(hook.event.clone(), by_extrinsic);
			batches.push(Batch {
				range,
				handlers: DataHandlers {
					extrinsics,
					..Default::default()
				},
			});
		}
	}

	for hook in &hooks.evm_log {
		if let Some(range) = clip(&hook.range) {
			let mut by_topics = HashMap::new();
			by_topics.insert(hook.topics_key(), vec![hook.handler.clone()]);
			let mut evm_logs = HashMap::new();
			evm_logs.insert(hook.contract_address.clone(), by_topics);
			batches.push(Batch {
				range,
				handlers: DataHandlers {
					evm_logs,
					..Default::default()
				},
			});
		}
	}

	merge_batches(batches)
}

/// Sweeps overlapping batches into a disjoint, ascending set with unioned
/// handler sets. O(n log n) in the number of fragments produced.
pub fn merge_batches(batches: Vec<Batch>) -> Vec<Batch> {
	if batches.len() <= 1 {
		return batches;
	}

	let mut union: Vec<Batch> = Vec::new();
	let mut heap = Heap::new(|a: &Batch, b: &Batch| -> Ordering { a.range.from.cmp(&b.range.from) });
	heap.init(batches);

	let mut top = match heap.pop() {
		Some(batch) => batch,
		None => return union,
	};
	while let Some(next) = heap.pop() {
		match top.range.intersection(&next.range) {
			None => {
				union.push(top);
				top = next;
			}
			Some(overlap) => {
				for range in top.range.difference(&overlap) {
					heap.push(Batch {
						range,
						handlers: top.handlers.clone(),
					});
				}
				for range in next.range.difference(&overlap) {
					heap.push(Batch {
						range,
						handlers: next.handlers.clone(),
					});
				}
				heap.push(Batch {
					range: overlap,
					handlers: DataHandlers::merge(&top.handlers, &next.handlers),
				});
				top = heap.pop().expect("the merged batch was just pushed");
			}
		}
	}
	union.push(top);
	union
}

/// Number of chain blocks the given disjoint ascending ranges cover up to
/// `chain_height`. Progress-denominator computation only.
pub fn blocks_count(ranges: &[Range], chain_height: u64) -> u64 {
	let mut count = 0;
	for range in ranges {
		if chain_height < range.from {
			return count;
		}
		let to = range.end().min(chain_height);
		count += to - range.from + 1;
	}
	count
}
