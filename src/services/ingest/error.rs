use std::error::Error;
use std::fmt;

use log::error;

use crate::services::archive::ArchiveError;

/// Errors terminating the ingest pipeline.
#[derive(Debug)]
pub enum IngestError {
	/// Archive transport failure or archive-reported query error.
	Archive(ArchiveError),

	/// Fetched data violating an internal-consistency invariant:
	/// batch limit exceeded, heights or event indices out of order, or a
	/// range outside the batch's declared bounds. Never retried.
	Consistency(String),

	/// The pipeline was shut down cooperatively. Not a failure:
	/// `Ingest::close` swallows it.
	Aborted,
}

impl IngestError {
	fn format_message(&self) -> String {
		match self {
			Self::Archive(err) => format!("Archive error: {}", err),
			Self::Consistency(msg) => format!("Consistency error: {}", msg),
			Self::Aborted => "Ingestion aborted".to_string(),
		}
	}

	pub fn archive(err: ArchiveError) -> Self {
		let error = Self::Archive(err);
		error!("{}", error.format_message());
		error
	}

	pub fn consistency(msg: impl Into<String>) -> Self {
		let error = Self::Consistency(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for IngestError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for IngestError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Archive(err) => Some(err),
			_ => None,
		}
	}
}
