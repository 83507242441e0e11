//! Raw chain data models.

mod substrate;

pub use substrate::{
	BlockData, BlockHeader, EventRecord, Extrinsic, QualifiedName, EVM_LOG_EVENT,
	EXTRINSIC_SUCCESS,
};
