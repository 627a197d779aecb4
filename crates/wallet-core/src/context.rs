//! Partition independent plumbing shared by the wallet flows.

use crate::WalletError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wallet_account::{AccountKey, KeyProvider};
use wallet_delivery::{ConfirmationOutcome, ConfirmationPoller, PollConfig};
use wallet_rpc::NodeClient;
use wallet_txbuilder::{ensure_timeout, timeout_after, DEFAULT_TX_TIMEOUT_ROUNDS};
use wallet_types::{NetworkId, PartitionId, TransactionOrder};

/// Where orders go and how long to wait for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSettings {
	pub network_id: NetworkId,
	pub partition_id: PartitionId,
	pub poll: PollConfig,
	/// Rounds between the latest round and an order's timeout.
	pub timeout_rounds: u64,
}

/// Key material, node access and confirmation settings of a wallet.
#[derive(Clone)]
pub struct TxContext {
	node: Arc<dyn NodeClient>,
	keys: Arc<dyn KeyProvider>,
	poller: ConfirmationPoller,
	settings: PartitionSettings,
}

impl TxContext {
	pub fn new(
		node: Arc<dyn NodeClient>,
		keys: Arc<dyn KeyProvider>,
		settings: PartitionSettings,
	) -> Self {
		Self {
			poller: ConfirmationPoller::new(node.clone(), settings.poll),
			node,
			keys,
			settings,
		}
	}

	pub fn network_id(&self) -> NetworkId {
		self.settings.network_id
	}

	pub fn partition_id(&self) -> PartitionId {
		self.settings.partition_id
	}

	pub fn account_key(&self, account_number: u64) -> Result<AccountKey, WalletError> {
		Ok(self.keys.account_key(account_number)?)
	}

	/// Timeout round for an order built now.
	pub async fn next_timeout(&self) -> Result<u64, WalletError> {
		let round = self
			.node
			.get_round_info()
			.await
			.map_err(WalletError::rpc("fetch round info"))?
			.round_number;
		let timeout = timeout_after(round, self.settings.timeout_rounds)?;
		ensure_timeout(timeout, round, DEFAULT_TX_TIMEOUT_ROUNDS)?;
		Ok(timeout)
	}

	/// Submits the order and waits for its outcome.
	pub async fn confirm(
		&self,
		order: &TransactionOrder,
		cancel: &CancellationToken,
	) -> Result<ConfirmationOutcome, WalletError> {
		Ok(self.poller.confirm(order, cancel).await?)
	}
}
