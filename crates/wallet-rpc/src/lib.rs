//! Node RPC transport for the ledger wallet.
//!
//! This module talks to a ledger node over HTTP with CBOR encoded bodies. It
//! translates HTTP statuses into domain outcomes: every request yields either
//! the decoded value, [`RpcError::NotFound`] or [`RpcError::Protocol`]. No
//! retries happen at this layer.

use alloy_primitives::Address;
use async_trait::async_trait;
use minicbor::Decode;
use thiserror::Error;
use wallet_types::payloads::evm::{CallEvmRequest, EvmProcessingDetails};
use wallet_types::{codec, CodecError, RoundInfo, TransactionOrder, TxHash, TxRecordProof};

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod rest;
}

pub use implementations::rest::RestClient;

/// Path prefix of the node REST API.
pub const API_PATH_PREFIX: &str = "/api/v1";

/// Errors that can occur while talking to a node.
#[derive(Debug, Error)]
pub enum RpcError {
	/// The node responded with 404.
	#[error("not found")]
	NotFound,
	/// The node responded with an unexpected status, an undecodable body, or
	/// could not be reached at all (`status` is `None`).
	#[error("{message}")]
	Protocol { status: Option<u16>, message: String },
	/// The request body could not be encoded; no request was sent.
	#[error("failed to encode request: {0}")]
	Encoding(#[from] CodecError),
	/// The client could not be constructed.
	#[error("invalid client configuration: {0}")]
	Configuration(String),
}

impl RpcError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, RpcError::NotFound)
	}

	/// HTTP status of a protocol error, if the node responded at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			RpcError::Protocol { status, .. } => *status,
			_ => None,
		}
	}
}

/// Shape a successful response body is decoded into.
///
/// Any CBOR decodable type is a shape; [`Empty`] accepts a response whose
/// body carries nothing of interest.
pub trait ResponseShape: Sized {
	fn from_body(body: &[u8]) -> Result<Self, CodecError>;
}

impl<T> ResponseShape for T
where
	T: for<'b> Decode<'b, ()>,
{
	fn from_body(body: &[u8]) -> Result<Self, CodecError> {
		codec::decode_from_slice(body)
	}
}

/// Response shape of requests whose success status carries no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Empty;

impl ResponseShape for Empty {
	fn from_body(_body: &[u8]) -> Result<Self, CodecError> {
		Ok(Empty)
	}
}

/// Partition independent node API.
#[async_trait]
pub trait NodeClient: Send + Sync {
	/// Submits a transaction order. The node answers 202 without a body.
	async fn post_transaction(&self, order: &TransactionOrder) -> Result<(), RpcError>;

	/// Latest round of the node.
	async fn get_round_info(&self) -> Result<RoundInfo, RpcError>;

	/// Record and proof of a transaction, `None` while it is not indexed.
	async fn get_tx_proof(&self, tx_hash: &TxHash) -> Result<Option<TxRecordProof>, RpcError>;
}

/// Account state of an EVM address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmBalance {
	/// Balance in wei, as the decimal string the node reports.
	pub balance: String,
	pub counter: u64,
}

/// EVM partition sub-API.
#[async_trait]
pub trait EvmNodeClient: NodeClient {
	async fn get_balance(&self, address: &Address) -> Result<EvmBalance, RpcError>;

	/// Nonce of the next transaction sent from `address`.
	async fn get_transaction_count(&self, address: &Address) -> Result<u64, RpcError>;

	/// Executes a call without persisting its effects.
	async fn call(&self, request: &CallEvmRequest) -> Result<EvmProcessingDetails, RpcError>;

	/// Gas price in wei, as a decimal string.
	async fn get_gas_price(&self) -> Result<String, RpcError>;
}
