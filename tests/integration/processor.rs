//! End-to-end processor runs against an in-memory database and a
//! scripted archive.

use std::sync::{Arc, Mutex};

use serde_json::json;

use substrate_pipeline::models::Range;
use substrate_pipeline::services::chain::StaticChainSource;
use substrate_pipeline::services::processor::{
	BlockHookOptions, EventHandlerOptions, ExtrinsicHandlerOptions, Processor, ProcessorError,
};
use substrate_pipeline::services::store::{Database, MemoryDatabase};

use super::mocks::{block, event, extrinsic, MockArchive, ScriptedArchive};

type CallLog = Arc<Mutex<Vec<String>>>;

fn transfer_blocks(heights: &[u64]) -> Vec<substrate_pipeline::models::BlockData> {
	heights
		.iter()
		.map(|&h| block(h, vec![event(h, 0, "balances.Transfer")]))
		.collect()
}

#[tokio::test]
async fn maps_each_block_in_order_and_commits_the_watermark() {
	let archive = ScriptedArchive::new(vec![12], transfer_blocks(&[10, 11, 12]), vec![]);
	let mut db = MemoryDatabase::new();
	let calls: CallLog = Arc::new(Mutex::new(Vec::new()));

	let mut processor = Processor::new("test");
	processor.set_block_range(Range::new(10, Some(12)));
	{
		let calls = calls.clone();
		processor.add_pre_hook(
			BlockHookOptions::default(),
			Arc::new(move |ctx| {
				calls.lock().unwrap().push(format!("pre:{}", ctx.block.height));
				Ok(())
			}),
		);
	}
	{
		let calls = calls.clone();
		processor.add_event_handler(
			"balances.Transfer",
			EventHandlerOptions::default(),
			Arc::new(move |ctx| {
				calls
					.lock()
					.unwrap()
					.push(format!("event:{}", ctx.block.height));
				ctx.store
					.set(&format!("transfers:{}", ctx.block.height), json!(1));
				Ok(())
			}),
		);
	}
	{
		let calls = calls.clone();
		processor.add_post_hook(
			BlockHookOptions::default(),
			Arc::new(move |ctx| {
				calls
					.lock()
					.unwrap()
					.push(format!("post:{}", ctx.block.height));
				Ok(())
			}),
		);
	}

	processor
		.run(archive, &mut db, StaticChainSource)
		.await
		.unwrap();

	assert_eq!(
		*calls.lock().unwrap(),
		vec![
			"pre:10", "event:10", "post:10", "pre:11", "event:11", "post:11", "pre:12",
			"event:12", "post:12",
		]
	);
	assert_eq!(db.height(), Some(12));
	for h in 10..=12 {
		assert_eq!(db.committed(&format!("transfers:{}", h)), Some(&json!(1)));
	}
}

#[tokio::test]
async fn resumes_after_the_persisted_watermark() {
	let archive = ScriptedArchive::new(vec![12], transfer_blocks(&[10, 11, 12]), vec![]);
	let mut db = MemoryDatabase::new();
	db.set_height(10).await.unwrap();
	let calls: CallLog = Arc::new(Mutex::new(Vec::new()));

	let mut processor = Processor::new("test");
	processor.set_block_range(Range::new(10, Some(12)));
	{
		let calls = calls.clone();
		processor.add_event_handler(
			"balances.Transfer",
			EventHandlerOptions::default(),
			Arc::new(move |ctx| {
				calls.lock().unwrap().push(ctx.block.height.to_string());
				Ok(())
			}),
		);
	}

	processor
		.run(archive, &mut db, StaticChainSource)
		.await
		.unwrap();

	assert_eq!(*calls.lock().unwrap(), vec!["11", "12"]);
	assert_eq!(db.height(), Some(12));
}

#[tokio::test]
async fn finished_range_returns_without_touching_the_archive() {
	// No expectations are set, so any archive call would panic.
	let archive = MockArchive::new();
	let mut db = MemoryDatabase::new();
	db.set_height(50).await.unwrap();

	let mut processor = Processor::new("test");
	processor.set_block_range(Range::new(10, Some(12)));
	processor
		.run(archive, &mut db, StaticChainSource)
		.await
		.unwrap();
	assert_eq!(db.height(), Some(50));
}

#[tokio::test]
async fn failing_handler_rolls_back_its_block_and_stops_the_run() {
	let archive = ScriptedArchive::new(vec![12], transfer_blocks(&[10, 11, 12]), vec![]);
	let mut db = MemoryDatabase::new();

	let mut processor = Processor::new("test");
	processor.set_block_range(Range::new(10, Some(12)));
	processor.add_event_handler(
		"balances.Transfer",
		EventHandlerOptions::default(),
		Arc::new(|ctx| {
			ctx.store
				.set(&format!("transfers:{}", ctx.block.height), json!(1));
			if ctx.block.height == 11 {
				anyhow::bail!("decoding failed");
			}
			Ok(())
		}),
	);

	let err = processor
		.run(archive, &mut db, StaticChainSource)
		.await
		.unwrap_err();
	assert!(matches!(err, ProcessorError::Store(_)));
	assert_eq!(db.height(), Some(10));
	assert_eq!(db.committed("transfers:10"), Some(&json!(1)));
	assert_eq!(db.committed("transfers:11"), None);
}

#[tokio::test]
async fn advances_the_watermark_through_empty_tails() {
	// No block matches above 12, yet the watermark must reach the range
	// end so a restart does not re-scan the tail.
	let archive = ScriptedArchive::new(vec![20], transfer_blocks(&[10, 12]), vec![]);
	let mut db = MemoryDatabase::new();

	let mut processor = Processor::new("test");
	processor.set_block_range(Range::new(10, Some(20)));
	processor.add_event_handler(
		"balances.Transfer",
		EventHandlerOptions::default(),
		Arc::new(|_| Ok(())),
	);
	processor
		.run(archive, &mut db, StaticChainSource)
		.await
		.unwrap();
	assert_eq!(db.height(), Some(20));
}

#[tokio::test]
async fn running_twice_is_a_no_op() {
	let archive = ScriptedArchive::new(vec![12], transfer_blocks(&[10, 11, 12]), vec![]);
	let mut db = MemoryDatabase::new();

	let mut processor = Processor::new("test");
	processor.set_block_range(Range::new(10, Some(12)));
	processor.add_event_handler(
		"balances.Transfer",
		EventHandlerOptions::default(),
		Arc::new(|_| Ok(())),
	);
	processor
		.run(archive, &mut db, StaticChainSource)
		.await
		.unwrap();
	assert_eq!(db.height(), Some(12));

	// Any call on the unconfigured mock would panic.
	processor
		.run(MockArchive::new(), &mut db, StaticChainSource)
		.await
		.unwrap();
	assert_eq!(db.height(), Some(12));
}

#[tokio::test]
async fn extrinsic_handlers_fire_on_their_trigger_event() {
	let mut success = event(7, 1, "system.ExtrinsicSuccess");
	success.extrinsic_id = Some("0000000007-000001".to_string());
	let archive = ScriptedArchive::new(
		vec![9],
		vec![block(7, vec![success])],
		vec![extrinsic("0000000007-000001", "balances.transfer")],
	);
	let mut db = MemoryDatabase::new();
	let calls: CallLog = Arc::new(Mutex::new(Vec::new()));

	let mut processor = Processor::new("test");
	processor.set_block_range(Range::new(0, Some(9)));
	{
		let calls = calls.clone();
		processor.add_extrinsic_handler(
			"balances.transfer",
			ExtrinsicHandlerOptions::default(),
			Arc::new(move |ctx| {
				let extrinsic = ctx.extrinsic.unwrap();
				calls.lock().unwrap().push(extrinsic.name.clone());
				Ok(())
			}),
		);
	}
	processor
		.run(archive, &mut db, StaticChainSource)
		.await
		.unwrap();
	assert_eq!(*calls.lock().unwrap(), vec!["balances.transfer"]);
	assert_eq!(db.height(), Some(9));
}
