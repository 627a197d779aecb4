//! Transaction submission and confirmation for the ledger wallet.
//!
//! The node offers no push notifications, so confirmation is a polling loop
//! over the latest round and the transaction proof. The loop is driven by the
//! explicit [`ConfirmationState`] machine and ends in one of the
//! [`ConfirmationOutcome`]s. Timeouts, execution failures and local
//! cancellation are outcomes the caller branches on, not errors.

use thiserror::Error;
use wallet_rpc::RpcError;
use wallet_types::{CodecError, TxHash};

pub mod poller;
pub mod state;

pub use poller::{ConfirmationPoller, PollConfig, DEFAULT_POLL_INTERVAL};
pub use state::{ConfirmationOutcome, ConfirmationState, PendingTransaction, PollEvent};

/// Errors that can occur while delivering a transaction.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The order could not be encoded for hashing or submission.
	#[error("failed to encode transaction: {0}")]
	Encoding(#[from] CodecError),
	/// A node request failed.
	#[error("{operation} failed for transaction {tx_hash}: {source}")]
	Rpc {
		operation: &'static str,
		tx_hash: TxHash,
		#[source]
		source: RpcError,
	},
}

impl DeliveryError {
	pub(crate) fn rpc(operation: &'static str, tx_hash: TxHash) -> impl FnOnce(RpcError) -> Self {
		move |source| DeliveryError::Rpc {
			operation,
			tx_hash,
			source,
		}
	}
}
