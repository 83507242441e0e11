use thiserror::Error;

/// Errors from the archive data source.
///
/// All of these are fatal for the run: the ingest pipeline performs no
/// retry above the height-poll wait.
#[derive(Debug, Error)]
pub enum ArchiveError {
	#[error("Archive request failed: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("Got http {status}, body: {body}")]
	Http { status: u16, body: String },

	#[error("Archive query error: {0}")]
	Query(String),

	#[error("Malformed archive response: {0}")]
	Malformed(String),
}
