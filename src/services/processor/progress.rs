//! Sync progress bookkeeping.
//!
//! Pure accounting over block counts and elapsed time. Every emitted
//! data batch progresses the tracker by its full range span (filtered-out
//! heights count as done), the denominator follows the chain head as it
//! grows, and a bounded sample window smooths the speed estimate.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::models::{ClosedRange, Range};
use crate::services::batcher::blocks_count;
use crate::utils::metrics;

const SPEED_WINDOW: usize = 50;

pub struct ProgressTracker {
	/// The whole run's batch ranges, disjoint and ascending.
	ranges: Vec<Range>,
	total: u64,
	progressed: u64,
	/// (instant, cumulative progressed) samples.
	window: VecDeque<(Instant, u64)>,
}

impl ProgressTracker {
	/// `watermark` is the height a resumed run starts after; blocks at or
	/// below it count as already progressed, so a resumed run reports the
	/// ratio of the whole configured work, not just the remainder.
	pub fn new(ranges: Vec<Range>, watermark: Option<u64>, chain_height: u64, now: Instant) -> Self {
		let progressed = watermark.map_or(0, |height| blocks_count(&ranges, height));
		let total = blocks_count(&ranges, chain_height).max(progressed);
		let mut window = VecDeque::with_capacity(SPEED_WINDOW + 1);
		window.push_back((now, progressed));
		ProgressTracker {
			ranges,
			total,
			progressed,
			window,
		}
	}

	/// Accounts one emitted data batch and refreshes the gauges.
	pub fn batch(&mut self, now: Instant, range: ClosedRange, chain_height: u64) {
		self.progressed += range.to - range.from + 1;
		self.total = blocks_count(&self.ranges, chain_height).max(self.progressed);
		self.window.push_back((now, self.progressed));
		if self.window.len() > SPEED_WINDOW {
			self.window.pop_front();
		}
		metrics::SYNC_ETA_SECONDS.set(self.sync_eta().as_secs_f64());
		metrics::SYNC_RATIO.set(self.sync_ratio());
	}

	pub fn sync_ratio(&self) -> f64 {
		if self.total == 0 {
			return 1.0;
		}
		self.progressed as f64 / self.total as f64
	}

	/// Estimated time to drain the remaining work at the windowed speed.
	/// Zero when done or when no speed estimate exists yet.
	pub fn sync_eta(&self) -> Duration {
		let remaining = self.total.saturating_sub(self.progressed);
		if remaining == 0 {
			return Duration::ZERO;
		}
		let speed = self.speed();
		if speed <= 0.0 {
			return Duration::ZERO;
		}
		Duration::from_secs_f64(remaining as f64 / speed)
	}

	/// Blocks per second over the sample window.
	fn speed(&self) -> f64 {
		let (first, last) = match (self.window.front(), self.window.back()) {
			(Some(first), Some(last)) if first.0 < last.0 => (first, last),
			_ => return 0.0,
		};
		let elapsed = (last.0 - first.0).as_secs_f64();
		(last.1 - first.1) as f64 / elapsed
	}
}
