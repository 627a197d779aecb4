//! Orchestration partition wallet.

use crate::context::{PartitionSettings, TxContext};
use crate::WalletError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use wallet_account::KeyProvider;
use wallet_delivery::ConfirmationOutcome;
use wallet_rpc::NodeClient;
use wallet_txbuilder::{new_add_var_tx, TxParams};
use wallet_types::payloads::orchestration::{var_unit_id, ValidatorAssignmentRecord};
use wallet_types::{truncate_id, PartitionId, ShardId};

/// Wallet of the orchestration partition.
#[derive(Clone)]
pub struct OrchestrationWallet {
	ctx: TxContext,
}

impl OrchestrationWallet {
	pub fn new(
		node: Arc<dyn NodeClient>,
		keys: Arc<dyn KeyProvider>,
		settings: PartitionSettings,
	) -> Self {
		Self {
			ctx: TxContext::new(node, keys, settings),
		}
	}

	/// Adds a validator assignment record for a shard of the managed
	/// partition and waits for the outcome.
	#[instrument(skip_all, fields(partition = managed_partition_id, epoch = var.epoch_number))]
	pub async fn add_var(
		&self,
		managed_partition_id: PartitionId,
		shard_id: &ShardId,
		var: ValidatorAssignmentRecord,
		max_fee: u64,
		account_number: u64,
		cancel: &CancellationToken,
	) -> Result<ConfirmationOutcome, WalletError> {
		let key = self.ctx.account_key(account_number)?;
		let unit_id = var_unit_id(managed_partition_id, shard_id);
		let params = TxParams {
			unit_id: unit_id.clone(),
			network_id: self.ctx.network_id(),
			partition_id: self.ctx.partition_id(),
			timeout: self.ctx.next_timeout().await?,
			max_fee,
			fee_credit_record_id: None,
		};
		tracing::info!(
			unit_id = %truncate_id(&unit_id.to_hex()),
			timeout = params.timeout,
			"Adding validator assignment record"
		);
		let order = new_add_var_tx(var, params, Some(&key))?;
		self.ctx.confirm(&order, cancel).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::Mutex;
	use wallet_account::{AccountKey, LocalKeyStore};
	use wallet_delivery::PollConfig;
	use wallet_rpc::RpcError;
	use wallet_types::payloads::orchestration::{AddVarAttributes, ValidatorInfo};
	use wallet_types::record::{ServerMetadata, TxProof, TxRecord};
	use wallet_types::{RoundInfo, TransactionOrder, TxHash, TxRecordProof};

	const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[derive(Default)]
	struct RecordingNode {
		posted: Mutex<Vec<TransactionOrder>>,
	}

	#[async_trait]
	impl NodeClient for RecordingNode {
		async fn post_transaction(&self, order: &TransactionOrder) -> Result<(), RpcError> {
			self.posted.lock().unwrap().push(order.clone());
			Ok(())
		}

		async fn get_round_info(&self) -> Result<RoundInfo, RpcError> {
			Ok(RoundInfo::indexed(7))
		}

		async fn get_tx_proof(&self, _tx_hash: &TxHash) -> Result<Option<TxRecordProof>, RpcError> {
			let order = self.posted.lock().unwrap().last().cloned();
			Ok(order.map(|order| TxRecordProof {
				tx_record: TxRecord {
					transaction_order: order.to_bytes().unwrap(),
					server_metadata: ServerMetadata {
						success_indicator: 1,
						..Default::default()
					},
				},
				tx_proof: TxProof::default(),
			}))
		}
	}

	fn settings() -> PartitionSettings {
		PartitionSettings {
			network_id: 3,
			partition_id: 4,
			poll: PollConfig::default(),
			timeout_rounds: 10,
		}
	}

	fn var() -> ValidatorAssignmentRecord {
		ValidatorAssignmentRecord {
			network_id: 3,
			partition_id: 5,
			epoch_number: 1,
			epoch_start_round: 100,
			validators: vec![ValidatorInfo {
				node_id: "node-1".to_string(),
				sig_key: vec![2; 33],
				stake: 1,
			}],
			..Default::default()
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_add_var() {
		let node = Arc::new(RecordingNode::default());
		let keys = LocalKeyStore::from_keys(vec![
			AccountKey::from_bytes(&hex::decode(TEST_KEY).unwrap()).unwrap()
		]);
		let wallet = OrchestrationWallet::new(node.clone(), Arc::new(keys), settings());

		let outcome = wallet
			.add_var(5, &ShardId::root(), var(), 0, 1, &CancellationToken::new())
			.await
			.unwrap();
		assert!(outcome.is_confirmed());

		let posted = node.posted.lock().unwrap();
		assert_eq!(posted.len(), 1);
		let order = &posted[0];
		assert_eq!(order.network_id(), 3);
		assert_eq!(order.partition_id(), 4);
		assert_eq!(order.timeout(), 17);
		assert_eq!(order.unit_id(), &var_unit_id(5, &ShardId::root()));
		assert!(order.owner_proof().is_some_and(|proof| !proof.is_empty()));
		let attributes: AddVarAttributes = order.unmarshal_attributes().unwrap();
		assert_eq!(attributes.var, var());
	}

	#[tokio::test]
	async fn test_add_var_unknown_account() {
		let node = Arc::new(RecordingNode::default());
		let wallet =
			OrchestrationWallet::new(node.clone(), Arc::new(LocalKeyStore::default()), settings());
		let err = wallet
			.add_var(5, &ShardId::root(), var(), 0, 1, &CancellationToken::new())
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "account key read failed: account does not exist");
		assert!(node.posted.lock().unwrap().is_empty());
	}
}
