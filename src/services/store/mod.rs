//! Transactional store collaborators.
//!
//! The processing loop never talks to a database directly: it opens one
//! transaction per block through the [`Database`] trait and hands the
//! scoped [`Store`] to handlers. A transaction either commits atomically,
//! advancing the watermark with it, or rolls back and propagates the
//! handler's failure.
//!
//! [`MemoryDatabase`] is the reference implementation, useful for tests
//! and dry runs; production embeddings provide their own.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Store initialization failed: {0}")]
	Init(String),

	#[error("Transaction at block {height} failed: {source}")]
	Transaction {
		height: u64,
		#[source]
		source: anyhow::Error,
	},

	#[error("Watermark may only advance (current {current}, requested {requested})")]
	WatermarkRegression { current: u64, requested: u64 },

	#[error("Store backend error: {0}")]
	Backend(String),
}

/// Mutable store scoped to one block transaction.
pub trait Store: Send {
	fn get(&self, key: &str) -> Option<&serde_json::Value>;
	fn set(&mut self, key: &str, value: serde_json::Value);
	fn remove(&mut self, key: &str) -> Option<serde_json::Value>;
}

/// Closure executed inside a block transaction.
pub type TxClosure<'a> = Box<dyn FnOnce(&mut dyn Store) -> anyhow::Result<()> + Send + 'a>;

/// The durable store behind a processor run.
///
/// The watermark persisted by `transact`/`set_height` is the single piece
/// of cross-run state; it only ever increases.
#[async_trait]
pub trait Database: Send {
	/// Opens the store and returns the last persisted watermark, if any.
	async fn init(&mut self) -> Result<Option<u64>, StoreError>;

	/// Runs `f` against a scoped store and commits atomically together
	/// with the watermark `height`, or rolls back and propagates `f`'s
	/// failure.
	async fn transact<'a>(&mut self, height: u64, f: TxClosure<'a>) -> Result<(), StoreError>;

	/// Persists the watermark without a data transaction.
	async fn set_height(&mut self, height: u64) -> Result<(), StoreError>;
}

/// In-memory JSON key-value store with real transaction semantics.
#[derive(Default)]
pub struct MemoryDatabase {
	data: HashMap<String, serde_json::Value>,
	height: Option<u64>,
}

impl MemoryDatabase {
	pub fn new() -> Self {
		MemoryDatabase::default()
	}

	/// Committed value for `key`, outside any transaction.
	pub fn committed(&self, key: &str) -> Option<&serde_json::Value> {
		self.data.get(key)
	}

	pub fn height(&self) -> Option<u64> {
		self.height
	}

	fn check_watermark(&self, requested: u64) -> Result<(), StoreError> {
		match self.height {
			Some(current) if requested <= current => {
				Err(StoreError::WatermarkRegression { current, requested })
			}
			_ => Ok(()),
		}
	}
}

struct MemoryTx {
	data: HashMap<String, serde_json::Value>,
}

impl Store for MemoryTx {
	fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.data.get(key)
	}

	fn set(&mut self, key: &str, value: serde_json::Value) {
		self.data.insert(key.to_string(), value);
	}

	fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
		self.data.remove(key)
	}
}

#[async_trait]
impl Database for MemoryDatabase {
	async fn init(&mut self) -> Result<Option<u64>, StoreError> {
		Ok(self.height)
	}

	async fn transact<'a>(&mut self, height: u64, f: TxClosure<'a>) -> Result<(), StoreError> {
		self.check_watermark(height)?;
		let mut tx = MemoryTx {
			data: self.data.clone(),
		};
		f(&mut tx).map_err(|source| StoreError::Transaction { height, source })?;
		self.data = tx.data;
		self.height = Some(height);
		Ok(())
	}

	async fn set_height(&mut self, height: u64) -> Result<(), StoreError> {
		self.check_watermark(height)?;
		self.height = Some(height);
		Ok(())
	}
}
