//! Ingest pipeline tests against scripted and mocked archives.

use std::sync::Arc;
use std::time::Duration;

use substrate_pipeline::models::{Batch, BlockHook, DataHandlers, Hooks, Range};
use substrate_pipeline::services::batcher::create_batches;
use substrate_pipeline::services::ingest::{Ingest, IngestError, IngestOptions};

use super::mocks::{block, event, extrinsic, MockArchive, ScriptedArchive};
use substrate_pipeline::services::archive::BlockResponse;

fn post_hook_batches(range: Range) -> Vec<Batch> {
	let mut hooks = Hooks::default();
	hooks.post.push(BlockHook {
		range: None,
		handler: Arc::new(|_| Ok(())),
	});
	create_batches(&hooks, range)
}

fn options<A>(archive: A, batches: Vec<Batch>, batch_size: usize) -> IngestOptions<A> {
	IngestOptions {
		archive,
		batches,
		batch_size,
		poll_interval: Duration::from_millis(10),
	}
}

#[tokio::test]
async fn splits_a_range_at_the_archive_head_and_resumes() {
	// The archive first reports height 15, so a batch over [10, 20] must
	// come out as [10, 15] followed by [16, 20] once the head moves on.
	let archive = ScriptedArchive::new(
		vec![15, 25],
		vec![
			block(10, vec![event(10, 0, "balances.Transfer")]),
			block(12, vec![]),
			block(17, vec![]),
			block(20, vec![event(20, 2, "balances.Transfer")]),
		],
		vec![],
	);
	let batches = post_hook_batches(Range::new(10, Some(20)));
	let mut ingest = Ingest::spawn(options(archive, batches, 100));

	let first = ingest.next_batch().await.unwrap();
	assert_eq!((first.range.from, first.range.to), (10, 15));
	let heights: Vec<u64> = first.blocks.iter().map(|b| b.block.height).collect();
	assert_eq!(heights, vec![10, 12]);

	let second = ingest.next_batch().await.unwrap();
	assert_eq!((second.range.from, second.range.to), (16, 20));
	let heights: Vec<u64> = second.blocks.iter().map(|b| b.block.height).collect();
	assert_eq!(heights, vec![17, 20]);

	assert!(ingest.next_batch().await.is_none());
	ingest.close().await.unwrap();
}

#[tokio::test]
async fn full_pages_advance_in_limit_sized_slices() {
	let blocks = (0..=10).map(|h| block(h, vec![])).collect();
	let archive = ScriptedArchive::new(vec![10], blocks, vec![]);
	let batches = post_hook_batches(Range::new(0, Some(10)));
	let mut ingest = Ingest::spawn(options(archive, batches, 4));

	let mut slices = Vec::new();
	while let Some(batch) = ingest.next_batch().await {
		slices.push((batch.range.from, batch.range.to, batch.blocks.len()));
	}
	assert_eq!(slices, vec![(0, 3, 4), (4, 7, 4), (8, 10, 3)]);
	ingest.close().await.unwrap();
}

#[tokio::test]
async fn joins_referenced_extrinsics_onto_events() {
	let mut transfer = event(5, 2, "balances.Transfer");
	transfer.extrinsic_id = Some("0000000005-000001".to_string());
	let archive = ScriptedArchive::new(
		vec![9],
		vec![block(5, vec![transfer])],
		vec![extrinsic("0000000005-000001", "balances.transfer")],
	);
	let batches = post_hook_batches(Range::new(0, Some(9)));
	let mut ingest = Ingest::spawn(options(archive, batches, 100));

	let batch = ingest.next_batch().await.unwrap();
	let joined = batch.blocks[0].events[0].extrinsic.as_ref().unwrap();
	assert_eq!(joined.name, "balances.transfer");

	assert!(ingest.next_batch().await.is_none());
	ingest.close().await.unwrap();
}

#[tokio::test]
async fn close_aborts_a_pipeline_stuck_behind_the_archive() {
	// The archive never reaches the batch start; close must still return
	// promptly and without error.
	let archive = ScriptedArchive::new(vec![5], vec![], vec![]);
	let batches = post_hook_batches(Range::new(100, Some(200)));
	let ingest = Ingest::spawn(options(archive, batches, 100));

	tokio::time::sleep(Duration::from_millis(30)).await;
	ingest.close().await.unwrap();
}

#[tokio::test]
async fn surfaces_inconsistent_archive_data_as_an_error() {
	let mut archive = MockArchive::new();
	archive.expect_archive_height().returning(|| Ok(100));
	archive.expect_fetch_blocks().returning(|_| {
		// Block 5 precedes the requested range start.
		Ok(BlockResponse {
			archive_height: 100,
			blocks: vec![block(5, vec![])],
		})
	});
	let batches = post_hook_batches(Range::new(10, Some(20)));
	let mut ingest = Ingest::spawn(options(archive, batches, 100));

	assert!(ingest.next_batch().await.is_none());
	let err = ingest.close().await.unwrap_err();
	assert!(matches!(err, IngestError::Consistency(_)));
}
