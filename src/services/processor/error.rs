use std::error::Error;
use std::fmt;

use log::error;

use crate::services::chain::ChainError;
use crate::services::ingest::IngestError;
use crate::services::store::StoreError;

/// Errors terminating a processor run.
///
/// Handler failures surface as `Store` errors: the enclosing block
/// transaction rolls back and propagates the handler's failure. The last
/// committed height remains the durable resume point.
#[derive(Debug)]
pub enum ProcessorError {
	Ingest(IngestError),
	Store(StoreError),
	Chain(ChainError),
}

impl ProcessorError {
	fn format_message(&self) -> String {
		match self {
			Self::Ingest(err) => format!("Ingestion error: {}", err),
			Self::Store(err) => format!("Store error: {}", err),
			Self::Chain(err) => format!("Chain error: {}", err),
		}
	}

	pub fn ingest(err: IngestError) -> Self {
		let error = Self::Ingest(err);
		error!("{}", error.format_message());
		error
	}

	pub fn store(err: StoreError) -> Self {
		let error = Self::Store(err);
		error!("{}", error.format_message());
		error
	}

	pub fn chain(err: ChainError) -> Self {
		let error = Self::Chain(err);
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for ProcessorError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for ProcessorError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Ingest(err) => Some(err),
			Self::Store(err) => Some(err),
			Self::Chain(err) => Some(err),
		}
	}
}
