//! Chain metadata resolution.
//!
//! Handlers decode chain data through a [`ChainContext`], which carries
//! whatever codec/type information the chain needs at a given runtime
//! version. Contexts are produced by a [`ChainSource`] and cached by
//! runtime version in the [`ChainManager`], so a long run touching
//! millions of blocks loads each runtime's metadata once.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::BlockHeader;

#[derive(Debug, Error)]
pub enum ChainError {
	#[error("Failed to load chain metadata for runtime version {version}: {message}")]
	MetadataUnavailable { version: u32, message: String },
}

/// Codec/type information for blocks of one runtime version.
#[derive(Debug, Clone)]
pub struct ChainContext {
	pub runtime_version: u32,
	/// Opaque chain metadata, owned by the embedding application.
	pub metadata: serde_json::Value,
}

/// Produces chain contexts; side-effect free from the pipeline's view.
#[async_trait]
pub trait ChainSource: Send + Sync {
	async fn load_chain(&self, block: &BlockHeader) -> Result<ChainContext, ChainError>;
}

/// A source for chains whose decoding needs no per-version metadata.
pub struct StaticChainSource;

#[async_trait]
impl ChainSource for StaticChainSource {
	async fn load_chain(&self, block: &BlockHeader) -> Result<ChainContext, ChainError> {
		Ok(ChainContext {
			runtime_version: block.runtime_version,
			metadata: serde_json::Value::Null,
		})
	}
}

/// Caches chain contexts by runtime version.
pub struct ChainManager<S> {
	source: S,
	cache: Mutex<HashMap<u32, Arc<ChainContext>>>,
}

impl<S: ChainSource> ChainManager<S> {
	pub fn new(source: S) -> Self {
		ChainManager {
			source,
			cache: Mutex::new(HashMap::new()),
		}
	}

	pub async fn chain_for_block(
		&self,
		block: &BlockHeader,
	) -> Result<Arc<ChainContext>, ChainError> {
		let mut cache = self.cache.lock().await;
		if let Some(chain) = cache.get(&block.runtime_version) {
			return Ok(chain.clone());
		}
		debug!(
			runtime_version = block.runtime_version,
			height = block.height,
			"Loading chain metadata"
		);
		let chain = Arc::new(self.source.load_chain(block).await?);
		cache.insert(block.runtime_version, chain.clone());
		Ok(chain)
	}
}
