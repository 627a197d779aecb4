//! Wallet flows for the ledger wallet.
//!
//! This module composes key lookup, fee checks, transaction building and
//! confirmation into the operations a user runs against a partition: EVM
//! balance queries, calls and transactions, and adding validator assignment
//! records to the orchestration partition.

use thiserror::Error;
use wallet_account::AccountError;
use wallet_delivery::DeliveryError;
use wallet_fees::FeeError;
use wallet_rpc::RpcError;
use wallet_txbuilder::BuildError;
use wallet_types::CodecError;

pub mod context;
pub mod evm;
pub mod orchestration;

pub use context::{PartitionSettings, TxContext};
pub use evm::{EvmTxRequest, EvmTxResult, EvmWallet};
pub use orchestration::OrchestrationWallet;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
	#[error("account key read failed: {0}")]
	Account(#[from] AccountError),
	/// A node request failed outside of transaction confirmation.
	#[error("{operation} failed: {source}")]
	Rpc {
		operation: String,
		#[source]
		source: RpcError,
	},
	#[error(transparent)]
	Fee(#[from] FeeError),
	#[error("failed to create transaction: {0}")]
	Build(#[from] BuildError),
	#[error("failed to send transaction: {0}")]
	Delivery(#[from] DeliveryError),
	/// The node returned a response that could not be interpreted.
	#[error("invalid node response: {0}")]
	InvalidResponse(String),
	#[error(transparent)]
	Codec(#[from] CodecError),
}

impl WalletError {
	pub(crate) fn rpc(operation: impl Into<String>) -> impl FnOnce(RpcError) -> Self {
		let operation = operation.into();
		move |source| WalletError::Rpc { operation, source }
	}
}
