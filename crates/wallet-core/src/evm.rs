//! EVM partition wallet.
//!
//! Fee credit on the EVM partition is the account balance itself, reported
//! in wei and converted to canonical units before any fee comparison.

use crate::context::{PartitionSettings, TxContext};
use crate::WalletError;
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use wallet_account::KeyProvider;
use wallet_delivery::ConfirmationOutcome;
use wallet_fees::{available_balance, check_sufficiency, parse_native_amount, FeeCalculator};
use wallet_rpc::{EvmNodeClient, RpcError};
use wallet_txbuilder::new_evm_tx;
use wallet_types::payloads::evm::{
	account_unit_id, CallEvmRequest, EvmProcessingDetails, EvmTxAttributes,
};
use wallet_types::{codec, truncate_id, FeeCreditBill};

/// What to execute on the EVM partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvmTxRequest {
	/// Call target, `None` deploys `data` as a contract.
	pub to: Option<Address>,
	pub data: Vec<u8>,
	/// Value in wei.
	pub value: U256,
	pub gas: u64,
	/// Fee limit in canonical units, defaults to the estimated fee.
	pub max_fee: Option<u64>,
}

/// Result of an EVM transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTxResult {
	pub outcome: ConfirmationOutcome,
	/// Decoded execution outcome. `None` when the order was not processed or
	/// the node reported details in another shape, see
	/// [`ConfirmationOutcome::processing_details`] for the raw bytes.
	pub details: Option<EvmProcessingDetails>,
}

impl EvmTxResult {
	/// True when the order was included and the EVM execution succeeded.
	pub fn success(&self) -> bool {
		self.outcome.is_confirmed()
			&& self
				.details
				.as_ref()
				.is_none_or(|details| details.error().is_none())
	}

	pub fn actual_fee(&self) -> Option<u64> {
		self.outcome.actual_fee()
	}
}

/// Wallet of the EVM partition.
pub struct EvmWallet<C> {
	client: Arc<C>,
	ctx: TxContext,
	fees: FeeCalculator,
}

impl<C: EvmNodeClient + 'static> EvmWallet<C> {
	pub fn new(
		client: Arc<C>,
		keys: Arc<dyn KeyProvider>,
		settings: PartitionSettings,
		fees: FeeCalculator,
	) -> Self {
		Self {
			ctx: TxContext::new(client.clone(), keys, settings),
			client,
			fees,
		}
	}

	/// Fee credit of an address, `None` when the node does not know it.
	pub async fn get_fee_credit_bill(
		&self,
		address: &Address,
	) -> Result<Option<FeeCreditBill>, WalletError> {
		let balance = match self.client.get_balance(address).await {
			Ok(balance) => balance,
			Err(RpcError::NotFound) => return Ok(None),
			Err(e) => return Err(WalletError::rpc(format!("read balance of {address}"))(e)),
		};
		let wei = parse_native_amount(&balance.balance).map_err(|_| {
			WalletError::InvalidResponse(format!(
				"account {address} has invalid balance {:?}",
				balance.balance
			))
		})?;
		Ok(Some(FeeCreditBill {
			id: account_unit_id(address),
			value: self.fees.to_canonical(wei)?,
			counter: balance.counter,
		}))
	}

	/// Fee credit of a wallet account.
	pub async fn get_balance(
		&self,
		account_number: u64,
	) -> Result<Option<FeeCreditBill>, WalletError> {
		let key = self.ctx.account_key(account_number)?;
		self.get_fee_credit_bill(&key.address()).await
	}

	/// Executes a call from the account without persisting its effects.
	pub async fn evm_call(
		&self,
		account_number: u64,
		request: &EvmTxRequest,
	) -> Result<EvmProcessingDetails, WalletError> {
		let key = self.ctx.account_key(account_number)?;
		let call = CallEvmRequest {
			from: key.address(),
			to: request.to,
			data: request.data.clone(),
			value: request.value,
			gas: request.gas,
		};
		self.client
			.call(&call)
			.await
			.map_err(WalletError::rpc("evm call"))
	}

	/// Sends an EVM transaction from the account and waits for its outcome.
	///
	/// The transaction is only submitted when the account's fee credit covers
	/// `gas * gasPrice`.
	#[instrument(skip_all, fields(account = account_number, gas = request.gas))]
	pub async fn send_evm_tx(
		&self,
		account_number: u64,
		request: &EvmTxRequest,
		cancel: &CancellationToken,
	) -> Result<EvmTxResult, WalletError> {
		let key = self.ctx.account_key(account_number)?;
		let from = key.address();

		let bill = self.get_fee_credit_bill(&from).await?;
		let gas_price = self
			.client
			.get_gas_price()
			.await
			.map_err(WalletError::rpc("fetch gas price"))?;
		let gas_price = parse_native_amount(&gas_price)
			.map_err(|e| WalletError::InvalidResponse(format!("gas price: {e}")))?;
		let required = self.fees.estimate_required_fee(request.gas, gas_price)?;
		check_sufficiency(available_balance(bill.as_ref()), required)?;

		let nonce = self
			.client
			.get_transaction_count(&from)
			.await
			.map_err(WalletError::rpc(format!("read nonce of {from}")))?;
		let timeout = self.ctx.next_timeout().await?;
		let attributes = EvmTxAttributes {
			from,
			to: request.to,
			data: request.data.clone(),
			value: request.value,
			gas: request.gas,
			nonce,
		};
		let order = new_evm_tx(
			&attributes,
			self.ctx.network_id(),
			self.ctx.partition_id(),
			timeout,
			request.max_fee.unwrap_or(required),
			Some(&key),
		)?;
		tracing::info!(
			from = %truncate_id(&from.to_string()),
			nonce,
			fee = required,
			timeout,
			"Sending evm transaction"
		);

		let outcome = self.ctx.confirm(&order, cancel).await?;
		let details = outcome.processing_details().and_then(decode_details);
		Ok(EvmTxResult { outcome, details })
	}
}

/// Decodes EVM processing details. Nodes report rejections that never
/// reached the EVM in other shapes, which stay available verbatim on the
/// outcome.
fn decode_details(bytes: &[u8]) -> Option<EvmProcessingDetails> {
	if bytes.is_empty() {
		return None;
	}
	match codec::decode_from_slice(bytes) {
		Ok(details) => Some(details),
		Err(e) => {
			tracing::warn!(error = %e, len = bytes.len(), "Processing details are not evm details");
			None
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::PartitionSettings;
	use async_trait::async_trait;
	use wallet_account::{AccountKey, LocalKeyStore};
	use wallet_delivery::PollConfig;
	use wallet_fees::FeeError;
	use wallet_rpc::{EvmBalance, NodeClient};
	use wallet_types::record::{
		ServerMetadata, TxProof, TxRecord, TX_STATUS_FAILED, TX_STATUS_SUCCESSFUL,
	};
	use wallet_types::{RoundInfo, TransactionOrder, TxHash, TxRecordProof};

	const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	struct StubEvmNode {
		fail: bool,
		balance: Option<&'static str>,
		gas_price: &'static str,
		/// Rejects orders with this message instead of executing them.
		rejection: Option<&'static str>,
	}

	impl Default for StubEvmNode {
		fn default() -> Self {
			Self {
				fail: false,
				balance: Some("100000000000000"),
				gas_price: "100",
				rejection: None,
			}
		}
	}

	impl StubEvmNode {
		fn check(&self) -> Result<(), RpcError> {
			if self.fail {
				return Err(RpcError::Protocol {
					status: Some(500),
					message: "something bad happened".to_string(),
				});
			}
			Ok(())
		}
	}

	#[async_trait]
	impl NodeClient for StubEvmNode {
		async fn post_transaction(&self, _order: &TransactionOrder) -> Result<(), RpcError> {
			self.check()
		}

		async fn get_round_info(&self) -> Result<RoundInfo, RpcError> {
			self.check()?;
			Ok(RoundInfo::indexed(3))
		}

		async fn get_tx_proof(&self, _tx_hash: &TxHash) -> Result<Option<TxRecordProof>, RpcError> {
			self.check()?;
			let (success_indicator, processing_details) = match self.rejection {
				Some(message) => (TX_STATUS_FAILED, codec::encode_to_vec(&message).unwrap()),
				None => {
					let details = EvmProcessingDetails {
						error_details: "execution reverted".to_string(),
						..Default::default()
					};
					(TX_STATUS_SUCCESSFUL, codec::encode_to_vec(&details).unwrap())
				},
			};
			Ok(Some(TxRecordProof {
				tx_record: TxRecord {
					transaction_order: vec![],
					server_metadata: ServerMetadata {
						actual_fee: 1,
						target_units: vec![],
						success_indicator,
						processing_details,
					},
				},
				tx_proof: TxProof::default(),
			}))
		}
	}

	#[async_trait]
	impl EvmNodeClient for StubEvmNode {
		async fn get_balance(&self, _address: &Address) -> Result<EvmBalance, RpcError> {
			self.check()?;
			match self.balance {
				Some(balance) => Ok(EvmBalance {
					balance: balance.to_string(),
					counter: 0,
				}),
				None => Err(RpcError::NotFound),
			}
		}

		async fn get_transaction_count(&self, _address: &Address) -> Result<u64, RpcError> {
			self.check()?;
			Ok(1)
		}

		async fn call(&self, _request: &CallEvmRequest) -> Result<EvmProcessingDetails, RpcError> {
			self.check()?;
			Ok(EvmProcessingDetails {
				error_details: "actual execution failed".to_string(),
				..Default::default()
			})
		}

		async fn get_gas_price(&self) -> Result<String, RpcError> {
			self.check()?;
			Ok(self.gas_price.to_string())
		}
	}

	fn wallet(node: StubEvmNode, with_key: bool) -> EvmWallet<StubEvmNode> {
		let keys = if with_key {
			LocalKeyStore::from_keys(vec![
				AccountKey::from_bytes(&hex::decode(TEST_KEY).unwrap()).unwrap()
			])
		} else {
			LocalKeyStore::default()
		};
		let settings = PartitionSettings {
			network_id: 3,
			partition_id: 3,
			poll: PollConfig::default(),
			timeout_rounds: 10,
		};
		EvmWallet::new(
			Arc::new(node),
			Arc::new(keys),
			settings,
			FeeCalculator::default(),
		)
	}

	#[tokio::test]
	async fn test_evm_call() {
		let request = EvmTxRequest::default();

		let err = wallet(StubEvmNode::default(), false)
			.evm_call(1, &request)
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "account key read failed: account does not exist");

		let w = wallet(StubEvmNode::default(), true);
		let details = w.evm_call(1, &request).await.unwrap();
		assert_eq!(details.error(), Some("actual execution failed"));

		let err = w.evm_call(0, &request).await.unwrap_err();
		assert!(err.to_string().contains("invalid account number: 0"));

		let failing = StubEvmNode {
			fail: true,
			..Default::default()
		};
		let err = wallet(failing, true).evm_call(1, &request).await.unwrap_err();
		assert!(err.to_string().contains("something bad happened"));
	}

	#[tokio::test]
	async fn test_get_balance() {
		let bill = wallet(StubEvmNode::default(), true)
			.get_balance(1)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(bill.value, 10_000);

		let unknown = StubEvmNode {
			balance: None,
			..Default::default()
		};
		assert_eq!(wallet(unknown, true).get_balance(1).await.unwrap(), None);

		let invalid = StubEvmNode {
			balance: Some("lots"),
			..Default::default()
		};
		let err = wallet(invalid, true).get_balance(1).await.unwrap_err();
		assert!(matches!(err, WalletError::InvalidResponse(_)));

		let err = wallet(StubEvmNode::default(), true)
			.get_balance(0)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("invalid account number: 0"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_send_evm_tx() {
		let request = EvmTxRequest {
			gas: 21_000,
			..Default::default()
		};
		let cancel = CancellationToken::new();

		let err = wallet(StubEvmNode::default(), false)
			.send_evm_tx(1, &request, &cancel)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("account does not exist"));

		let result = wallet(StubEvmNode::default(), true)
			.send_evm_tx(1, &request, &cancel)
			.await
			.unwrap();
		assert!(result.outcome.is_confirmed());
		assert_eq!(result.actual_fee(), Some(1));
		assert_eq!(
			result.details.as_ref().and_then(|d| d.error()),
			Some("execution reverted")
		);
		assert!(!result.success());

		let failing = StubEvmNode {
			fail: true,
			..Default::default()
		};
		let err = wallet(failing, true)
			.send_evm_tx(1, &request, &cancel)
			.await
			.unwrap_err();
		assert!(err.to_string().contains("something bad happened"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_send_evm_tx_rejected_by_node() {
		let rejecting = StubEvmNode {
			rejection: Some("insufficient funds"),
			..Default::default()
		};
		let request = EvmTxRequest {
			gas: 21_000,
			..Default::default()
		};
		let result = wallet(rejecting, true)
			.send_evm_tx(1, &request, &CancellationToken::new())
			.await
			.unwrap();

		assert!(matches!(
			result.outcome,
			ConfirmationOutcome::ExecutionFailed { .. }
		));
		assert_eq!(result.details, None);
		assert_eq!(result.actual_fee(), Some(1));
		assert!(!result.success());
		let raw = result.outcome.processing_details().unwrap();
		assert_eq!(
			codec::decode_from_slice::<String>(raw).unwrap(),
			"insufficient funds"
		);
	}

	#[tokio::test]
	async fn test_send_evm_tx_fee_gate() {
		let cancel = CancellationToken::new();
		let request = EvmTxRequest {
			gas: 1,
			..Default::default()
		};

		let no_bill = StubEvmNode {
			balance: None,
			gas_price: "100000000000",
			..Default::default()
		};
		let err = wallet(no_bill, true)
			.send_evm_tx(1, &request, &cancel)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			WalletError::Fee(FeeError::InsufficientFunds {
				required: 10,
				available: 0
			})
		));

		let low_balance = StubEvmNode {
			balance: Some("100000"),
			gas_price: "100000000000",
			..Default::default()
		};
		let err = wallet(low_balance, true)
			.send_evm_tx(1, &request, &cancel)
			.await
			.unwrap_err();
		assert!(err
			.to_string()
			.contains("insufficient fee credit balance for transaction"));
	}
}
