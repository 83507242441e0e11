//! HTTP archive client.
//!
//! Speaks the archive's GraphQL dialect: one status query for the head
//! height, one paged block query carrying the selector disjunction
//! filter, and one lookup query resolving extrinsic ids. Responses are
//! decoded through private DTOs and mapped into the crate's models.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::client::{ArchiveClient, BlockQuery, BlockResponse, BlockSelection};
use super::error::ArchiveError;
use crate::models::{BlockData, BlockHeader, EventRecord, Extrinsic};

use async_trait::async_trait;

pub struct HttpArchiveClient {
	client: Client,
	url: Url,
}

impl HttpArchiveClient {
	pub fn new(url: Url) -> Self {
		HttpArchiveClient {
			client: Client::new(),
			url,
		}
	}

	async fn request<T: serde::de::DeserializeOwned>(&self, query: String) -> Result<T, ArchiveError> {
		let response = self
			.client
			.post(self.url.clone())
			.json(&serde_json::json!({ "query": query }))
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(ArchiveError::Http {
				status: status.as_u16(),
				body,
			});
		}

		let body: GraphqlResponse<T> = response.json().await?;
		if let Some(error) = body.errors.into_iter().next() {
			return Err(ArchiveError::Query(error.message));
		}
		body.data
			.ok_or_else(|| ArchiveError::Malformed("response carries neither data nor errors".into()))
	}
}

#[async_trait]
impl ArchiveClient for HttpArchiveClient {
	async fn archive_height(&self) -> Result<u64, ArchiveError> {
		let data: StatusData = self
			.request("query { indexerStatus { head } }".to_string())
			.await?;
		Ok(data.indexer_status.head)
	}

	async fn fetch_blocks(&self, query: &BlockQuery) -> Result<BlockResponse, ArchiveError> {
		let data: BlocksData = self.request(build_block_query(query)).await?;
		let mut blocks = Vec::with_capacity(data.blocks.len());
		for dto in data.blocks {
			blocks.push(dto.into_block_data()?);
		}
		Ok(BlockResponse {
			archive_height: data.indexer_status.head,
			blocks,
		})
	}

	async fn resolve_extrinsics(&self, ids: &[String]) -> Result<Vec<Extrinsic>, ArchiveError> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}
		let data: ExtrinsicsData = self.request(build_extrinsic_query(ids)).await?;
		Ok(data.extrinsics.into_iter().map(|e| e.into_extrinsic()).collect())
	}
}

fn quoted_list(values: impl IntoIterator<Item = impl AsRef<str>>) -> String {
	values
		.into_iter()
		.map(|v| format!("\"{}\"", v.as_ref()))
		.collect::<Vec<_>>()
		.join(", ")
}

/// The `where` expression selecting blocks: the height window, refined by
/// the selector disjunction when no block-level hook forces a full scan.
fn build_block_where(query: &BlockQuery) -> String {
	let height = format!("height: {{_gte: {}, _lte: {}}}", query.from, query.to);

	let selection = match &query.selection {
		Some(selection) if !selection.is_empty() => selection,
		_ => return format!("{{{}}}", height),
	};

	let mut or: Vec<String> = Vec::new();
	for name in &selection.events {
		or.push(format!("events: {{_contains: [{{name: \"{}\"}}]}}", name));
	}
	for evm in &selection.evm_logs {
		let topics = if evm.topics.is_empty() {
			String::new()
		} else {
			format!(
				", evmLogTopics: {{_contains: [{}]}}",
				quoted_list(&evm.topics)
			)
		};
		or.push(format!(
			"substrate_events: {{evmLogAddress: {{_eq: \"{}\"}}{}}}",
			evm.contract, topics
		));
	}
	let mut extrinsic_names: Vec<&String> = Vec::new();
	for (_, names) in &selection.extrinsics {
		for name in names {
			if !extrinsic_names.contains(&name) {
				extrinsic_names.push(name);
			}
		}
	}
	for name in extrinsic_names {
		or.push(format!(
			"extrinsics: {{_contains: [{{name: \"{}\"}}]}}",
			name
		));
	}

	if or.len() == 1 {
		format!("{{{} {}}}", height, or[0])
	} else {
		let clauses = or
			.iter()
			.map(|f| format!("{{{}}}", f))
			.collect::<Vec<_>>()
			.join(", ");
		format!("{{_and: [{{{}}}, {{_or: [{}]}}]}}", height, clauses)
	}
}

/// The `where` expression selecting events within matched blocks.
fn build_event_where(selection: Option<&BlockSelection>) -> String {
	let selection = match selection {
		Some(selection) if !selection.is_empty() => selection,
		_ => return String::new(),
	};

	let mut or: Vec<String> = Vec::new();
	if !selection.events.is_empty() {
		or.push(format!("name: {{_in: [{}]}}", quoted_list(&selection.events)));
	}
	for (event, extrinsics) in &selection.extrinsics {
		or.push(format!(
			"name: {{_eq: \"{}\"}}, extrinsic: {{name: {{_in: [{}]}}}}",
			event,
			quoted_list(extrinsics)
		));
	}
	if !selection.evm_logs.is_empty() {
		let contracts: Vec<&str> = selection
			.evm_logs
			.iter()
			.map(|e| e.contract.as_str())
			.collect();
		or.push(format!("evmLogAddress: {{_in: [{}]}}", quoted_list(contracts)));
	}

	if or.len() == 1 {
		format!(" where: {{{}}}", or[0])
	} else {
		let clauses = or
			.iter()
			.map(|exp| format!("{{{}}}", exp))
			.collect::<Vec<_>>()
			.join(", ");
		format!(" where: {{_or: [{}]}}", clauses)
	}
}

fn build_block_query(query: &BlockQuery) -> String {
	format!(
		"query {{ \
			indexerStatus {{ head }} \
			substrate_block(limit: {} order_by: {{height: asc}} where: {}) {{ \
				id hash height timestamp parentHash stateRoot extrinsicsRoot runtimeVersion \
				substrate_events(order_by: {{indexInBlock: asc}}{}) {{ \
					id name params indexInBlock \
					evmLogAddress evmLogData evmLogTopics evmHash \
					extrinsic {{ id }} \
				}} \
			}} \
		}}",
		query.limit,
		build_block_where(query),
		build_event_where(query.selection.as_ref())
	)
}

fn build_extrinsic_query(ids: &[String]) -> String {
	format!(
		"query {{ \
			substrate_extrinsic(where: {{id: {{_in: [{}]}}}}) {{ \
				id name indexInBlock signer args hash tip \
			}} \
		}}",
		quoted_list(ids)
	)
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
	data: Option<T>,
	#[serde(default)]
	errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
	message: String,
}

#[derive(Deserialize)]
struct StatusData {
	#[serde(rename = "indexerStatus")]
	indexer_status: IndexerStatus,
}

#[derive(Deserialize)]
struct IndexerStatus {
	head: u64,
}

#[derive(Deserialize)]
struct BlocksData {
	#[serde(rename = "indexerStatus")]
	indexer_status: IndexerStatus,
	#[serde(rename = "substrate_block", default)]
	blocks: Vec<BlockDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockDto {
	id: String,
	hash: String,
	height: u64,
	/// Unix milliseconds, serialized as a decimal string.
	timestamp: String,
	parent_hash: String,
	state_root: Option<String>,
	extrinsics_root: Option<String>,
	runtime_version: u32,
	#[serde(rename = "substrate_events", default)]
	events: Vec<EventDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDto {
	id: String,
	name: String,
	#[serde(default)]
	params: serde_json::Value,
	index_in_block: u32,
	#[serde(default)]
	evm_log_address: Option<String>,
	#[serde(default)]
	evm_log_topics: Vec<String>,
	#[serde(default)]
	evm_log_data: Option<String>,
	#[serde(default)]
	evm_hash: Option<String>,
	#[serde(default)]
	extrinsic: Option<ExtrinsicRefDto>,
}

#[derive(Deserialize)]
struct ExtrinsicRefDto {
	id: String,
}

#[derive(Deserialize)]
struct ExtrinsicsData {
	#[serde(rename = "substrate_extrinsic", default)]
	extrinsics: Vec<ExtrinsicDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtrinsicDto {
	id: String,
	name: String,
	index_in_block: u32,
	#[serde(default)]
	signer: Option<String>,
	#[serde(default)]
	args: serde_json::Value,
	#[serde(default)]
	hash: Option<String>,
	#[serde(default)]
	tip: Option<String>,
}

impl BlockDto {
	fn into_block_data(self) -> Result<BlockData, ArchiveError> {
		let timestamp: u64 = self.timestamp.parse().map_err(|_| {
			ArchiveError::Malformed(format!(
				"block {} carries a non-numeric timestamp: {}",
				self.id, self.timestamp
			))
		})?;
		let block = BlockHeader {
			id: self.id,
			height: self.height,
			hash: self.hash,
			parent_hash: self.parent_hash,
			timestamp,
			state_root: self.state_root,
			extrinsics_root: self.extrinsics_root,
			runtime_version: self.runtime_version,
		};
		let events = self
			.events
			.into_iter()
			.map(|e| EventRecord {
				id: e.id,
				name: e.name,
				params: e.params,
				index_in_block: e.index_in_block,
				block_timestamp: timestamp,
				extrinsic_id: e.extrinsic.map(|x| x.id),
				extrinsic: None,
				evm_log_address: e.evm_log_address,
				evm_log_topics: e.evm_log_topics,
				evm_log_data: e.evm_log_data,
				evm_hash: e.evm_hash,
			})
			.collect();
		Ok(BlockData { block, events })
	}
}

impl ExtrinsicDto {
	fn into_extrinsic(self) -> Extrinsic {
		Extrinsic {
			id: self.id,
			name: self.name,
			index_in_block: self.index_in_block,
			signer: self.signer,
			args: self.args,
			hash: self.hash,
			tip: self.tip,
		}
	}
}
