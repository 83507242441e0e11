//! Shared leaf utilities.
//!
//! - `heap`: comparator-based binary heap used by the batch merger
//! - `logging`: tracing subscriber setup
//! - `metrics`: Prometheus registry and sync gauges
//! - `time`: interval formatting for the status line

pub mod heap;
pub mod logging;
pub mod metrics;
pub mod time;

pub use heap::Heap;
pub use time::format_time_interval;
