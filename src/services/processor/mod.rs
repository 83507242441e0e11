//! The top-level processing service.

mod error;
mod progress;
mod service;

pub use error::ProcessorError;
pub use progress::ProgressTracker;
pub use service::{
	BlockHookOptions, EventHandlerOptions, EvmLogHandlerOptions, ExtrinsicHandlerOptions,
	Processor,
};
