//! Block height ranges and the range algebra used by the batch merger.
//!
//! Ranges are closed and inclusive over discrete block heights. An absent
//! upper bound means "until further notice", i.e. the range follows the
//! chain head.

use serde::{Deserialize, Serialize};

/// A possibly open-ended range of block heights.
///
/// Invariant: `from <= to` whenever `to` is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
	pub from: u64,
	pub to: Option<u64>,
}

/// A fully resolved range, as carried by a fetched data batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedRange {
	pub from: u64,
	pub to: u64,
}

impl Range {
	pub fn new(from: u64, to: Option<u64>) -> Self {
		if let Some(to) = to {
			debug_assert!(from <= to, "invalid range: {} > {}", from, to);
		}
		Range { from, to }
	}

	/// The whole chain, from genesis onwards.
	pub fn all() -> Self {
		Range { from: 0, to: None }
	}

	/// Concrete upper bound, `u64::MAX` for open-ended ranges.
	pub fn end(&self) -> u64 {
		self.to.unwrap_or(u64::MAX)
	}

	/// Overlap of two ranges, `None` when they are disjoint.
	///
	/// Touching ranges (`a.to + 1 == b.from`) do not intersect, heights
	/// are discrete.
	pub fn intersection(&self, other: &Range) -> Option<Range> {
		if self.end() < other.from || other.end() < self.from {
			return None;
		}
		let from = self.from.max(other.from);
		let to = match (self.to, other.to) {
			(None, None) => None,
			_ => Some(self.end().min(other.end())),
		};
		Some(Range { from, to })
	}

	/// The 0, 1 or 2 sub-ranges of `self` not covered by `minus`, in
	/// ascending order.
	///
	/// Callers guarantee `minus` lies within `self`.
	pub fn difference(&self, minus: &Range) -> Vec<Range> {
		let mut parts = Vec::with_capacity(2);
		if self.from < minus.from {
			parts.push(Range {
				from: self.from,
				to: Some(minus.from - 1),
			});
		}
		if let Some(minus_to) = minus.to {
			if minus_to < self.end() {
				parts.push(Range {
					from: minus_to + 1,
					to: self.to,
				});
			}
		}
		parts
	}
}
