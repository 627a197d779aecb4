//! Submission and polling loop.

use crate::state::{ConfirmationOutcome, ConfirmationState, PendingTransaction, PollEvent};
use crate::DeliveryError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use wallet_rpc::{NodeClient, RpcError};
use wallet_types::{truncate_id, TransactionOrder, TxRecordProof};

/// Default delay between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polling cadence and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
	pub interval: Duration,
	/// Wall-clock limit of a single poll loop, on top of the timeout round.
	pub deadline: Option<Duration>,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			interval: DEFAULT_POLL_INTERVAL,
			deadline: None,
		}
	}
}

/// Submits orders and polls the node until each reaches an outcome.
///
/// Holds nothing but a shared transport handle, so one poller can drive any
/// number of concurrent confirmations.
#[derive(Clone)]
pub struct ConfirmationPoller {
	client: Arc<dyn NodeClient>,
	config: PollConfig,
}

impl ConfirmationPoller {
	pub fn new(client: Arc<dyn NodeClient>, config: PollConfig) -> Self {
		Self { client, config }
	}

	/// Records the latest round and posts the order.
	///
	/// The post is the last request, so an error means the node did not
	/// accept the order. The post is attempted exactly once.
	#[instrument(skip_all, fields(unit_id = %order.unit_id()))]
	pub async fn submit(&self, order: &TransactionOrder) -> Result<PendingTransaction, DeliveryError> {
		let tx_hash = order.hash()?;
		let round = self
			.client
			.get_round_info()
			.await
			.map_err(DeliveryError::rpc("fetch round info", tx_hash))?;
		self.client
			.post_transaction(order)
			.await
			.map_err(DeliveryError::rpc("submit transaction", tx_hash))?;

		tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_hex()),
			round = round.round_number,
			timeout = order.timeout(),
			"Submitted transaction"
		);
		Ok(PendingTransaction {
			tx_hash,
			timeout: order.timeout(),
			submitted_round: round.round_number,
		})
	}

	/// Polls until the transaction resolves.
	///
	/// Cancellation is honored between requests and while waiting for the
	/// next poll, never in the middle of a request. Cancelling does not
	/// retract the submitted order.
	#[instrument(skip_all, fields(tx_hash = %truncate_id(&pending.tx_hash.to_hex()), timeout = pending.timeout))]
	pub async fn poll(
		&self,
		pending: &PendingTransaction,
		cancel: &CancellationToken,
	) -> Result<ConfirmationOutcome, DeliveryError> {
		let deadline = self.config.deadline.map(|limit| Instant::now() + limit);
		let mut state = ConfirmationState::new(*pending);
		tracing::info!("Waiting for confirmation");

		loop {
			if cancel.is_cancelled() {
				state = state.on_event(PollEvent::Cancelled);
			} else if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
				state = state.on_event(PollEvent::DeadlineExceeded);
			} else {
				let info = self
					.client
					.get_round_info()
					.await
					.map_err(DeliveryError::rpc("fetch round info", pending.tx_hash))?;
				let proof = self.fetch_proof(pending).await?;
				tracing::debug!(
					round = info.round_number,
					indexer_lag = info.indexer_lag(),
					found = proof.is_some(),
					polls = state.polls(),
					"Polled transaction"
				);
				state = state.on_event(PollEvent::Tick {
					round: info.round_number,
					proof,
				});
			}

			if let ConfirmationState::Resolved(outcome) = state {
				log_outcome(&outcome);
				return Ok(outcome);
			}

			tokio::select! {
				_ = cancel.cancelled() => {}
				_ = tokio::time::sleep(self.config.interval) => {}
			}
		}
	}

	/// Submits the order and polls it to an outcome.
	pub async fn confirm(
		&self,
		order: &TransactionOrder,
		cancel: &CancellationToken,
	) -> Result<ConfirmationOutcome, DeliveryError> {
		let pending = self.submit(order).await?;
		self.poll(&pending, cancel).await
	}

	async fn fetch_proof(
		&self,
		pending: &PendingTransaction,
	) -> Result<Option<TxRecordProof>, DeliveryError> {
		match self.client.get_tx_proof(&pending.tx_hash).await {
			Ok(proof) => Ok(proof),
			Err(RpcError::NotFound) => Ok(None),
			Err(e) => Err(DeliveryError::rpc("fetch transaction proof", pending.tx_hash)(e)),
		}
	}
}

fn log_outcome(outcome: &ConfirmationOutcome) {
	match outcome {
		ConfirmationOutcome::Confirmed { proof } => tracing::info!(
			actual_fee = proof.server_metadata().actual_fee,
			"Transaction confirmed"
		),
		ConfirmationOutcome::ExecutionFailed { proof } => tracing::warn!(
			actual_fee = proof.server_metadata().actual_fee,
			"Transaction processed but failed"
		),
		ConfirmationOutcome::TimedOut {
			timeout, last_round, ..
		} => tracing::warn!(
			timeout,
			last_round,
			"Confirmation timed out, the transaction may still be included"
		),
		ConfirmationOutcome::Aborted { last_round, .. } => tracing::info!(
			last_round,
			"Confirmation aborted, the submitted transaction was not retracted"
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicU64, Ordering};
	use std::sync::Mutex;
	use wallet_types::record::{ServerMetadata, TxProof, TxRecord, TX_STATUS_FAILED};
	use wallet_types::{ClientMetadata, Payload, RoundInfo, TxHash, UnitId};

	/// Node stub whose round advances on every round query.
	struct StubNode {
		round: AtomicU64,
		round_step: u64,
		proof_polls: AtomicU64,
		/// The proof appears after this many failed lookups.
		found_after: Option<u64>,
		success_indicator: u64,
		posted: Mutex<Vec<TxHash>>,
	}

	impl StubNode {
		fn new(found_after: Option<u64>, success_indicator: u64, round_step: u64) -> Self {
			Self {
				round: AtomicU64::new(100),
				round_step,
				proof_polls: AtomicU64::new(0),
				found_after,
				success_indicator,
				posted: Mutex::new(Vec::new()),
			}
		}
	}

	#[async_trait]
	impl NodeClient for StubNode {
		async fn post_transaction(&self, order: &TransactionOrder) -> Result<(), RpcError> {
			self.posted.lock().unwrap().push(order.hash().unwrap());
			Ok(())
		}

		async fn get_round_info(&self) -> Result<RoundInfo, RpcError> {
			let round = self.round.fetch_add(self.round_step, Ordering::SeqCst);
			Ok(RoundInfo::indexed(round))
		}

		async fn get_tx_proof(&self, _tx_hash: &TxHash) -> Result<Option<TxRecordProof>, RpcError> {
			let polls = self.proof_polls.fetch_add(1, Ordering::SeqCst);
			match self.found_after {
				Some(n) if polls >= n => Ok(Some(TxRecordProof {
					tx_record: TxRecord {
						transaction_order: vec![],
						server_metadata: ServerMetadata {
							actual_fee: 1,
							success_indicator: self.success_indicator,
							processing_details: b"reverted".to_vec(),
							..Default::default()
						},
					},
					tx_proof: TxProof::default(),
				})),
				_ => Err(RpcError::NotFound),
			}
		}
	}

	fn order(timeout: u64) -> TransactionOrder {
		TransactionOrder::unsigned(Payload {
			network_id: 3,
			partition_id: 3,
			unit_id: UnitId(vec![1; 20]),
			payload_type: 1,
			attributes: vec![0x80],
			client_metadata: ClientMetadata {
				timeout,
				max_transaction_fee: 1,
				fee_credit_record_id: None,
			},
		})
	}

	fn poller(node: &Arc<StubNode>, config: PollConfig) -> ConfirmationPoller {
		ConfirmationPoller::new(node.clone(), config)
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirmed_after_n_plus_one_polls() {
		let node = Arc::new(StubNode::new(Some(3), 1, 1));
		let order = order(110);
		let outcome = poller(&node, PollConfig::default())
			.confirm(&order, &CancellationToken::new())
			.await
			.unwrap();

		assert!(outcome.is_confirmed());
		assert_eq!(outcome.processing_details(), Some(&b"reverted"[..]));
		assert_eq!(node.proof_polls.load(Ordering::SeqCst), 4);
		assert!(node.round.load(Ordering::SeqCst) < 110);
		assert_eq!(*node.posted.lock().unwrap(), vec![order.hash().unwrap()]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_timed_out_when_round_passes_timeout() {
		let node = Arc::new(StubNode::new(None, 1, 2));
		let outcome = poller(&node, PollConfig::default())
			.confirm(&order(110), &CancellationToken::new())
			.await
			.unwrap();

		match outcome {
			ConfirmationOutcome::TimedOut {
				timeout, last_round, ..
			} => {
				assert_eq!(timeout, 110);
				assert!(last_round > 110);
			}
			other => panic!("unexpected outcome: {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_execution_failed_carries_details() {
		let node = Arc::new(StubNode::new(Some(0), TX_STATUS_FAILED, 1));
		let outcome = poller(&node, PollConfig::default())
			.confirm(&order(110), &CancellationToken::new())
			.await
			.unwrap();

		assert!(matches!(outcome, ConfirmationOutcome::ExecutionFailed { .. }));
		assert_eq!(
			outcome.processing_details().map(String::from_utf8_lossy).as_deref(),
			Some("reverted")
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_deadline_is_timed_out() {
		let node = Arc::new(StubNode::new(None, 1, 0));
		let config = PollConfig {
			interval: Duration::from_millis(500),
			deadline: Some(Duration::from_secs(2)),
		};
		let outcome = poller(&node, config)
			.confirm(&order(110), &CancellationToken::new())
			.await
			.unwrap();

		assert!(matches!(outcome, ConfirmationOutcome::TimedOut { .. }));
		assert_eq!(node.proof_polls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_aborts() {
		let node = Arc::new(StubNode::new(None, 1, 0));
		let poller = poller(&node, PollConfig::default());
		let pending = poller.submit(&order(110)).await.unwrap();

		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(1200)).await;
			trigger.cancel();
		});

		let outcome = poller.poll(&pending, &cancel).await.unwrap();
		assert_eq!(
			outcome,
			ConfirmationOutcome::Aborted {
				tx_hash: pending.tx_hash,
				last_round: 100,
			}
		);
		assert_eq!(node.proof_polls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_cancelled_before_first_poll() {
		let node = Arc::new(StubNode::new(Some(0), 1, 1));
		let poller = poller(&node, PollConfig::default());
		let pending = poller.submit(&order(110)).await.unwrap();

		let cancel = CancellationToken::new();
		cancel.cancel();
		let outcome = poller.poll(&pending, &cancel).await.unwrap();
		assert!(matches!(outcome, ConfirmationOutcome::Aborted { .. }));
		assert_eq!(node.proof_polls.load(Ordering::SeqCst), 0);
	}

	struct FailingNode;

	#[async_trait]
	impl NodeClient for FailingNode {
		async fn post_transaction(&self, _order: &TransactionOrder) -> Result<(), RpcError> {
			Err(RpcError::Protocol {
				status: Some(500),
				message: "500 Internal Server Error, boom".to_string(),
			})
		}

		async fn get_round_info(&self) -> Result<RoundInfo, RpcError> {
			Ok(RoundInfo::indexed(1))
		}

		async fn get_tx_proof(&self, _tx_hash: &TxHash) -> Result<Option<TxRecordProof>, RpcError> {
			Ok(None)
		}
	}

	/// Node that accepts every order but cannot report its round.
	#[derive(Default)]
	struct NoRoundNode {
		posts: AtomicU64,
	}

	#[async_trait]
	impl NodeClient for NoRoundNode {
		async fn post_transaction(&self, _order: &TransactionOrder) -> Result<(), RpcError> {
			self.posts.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}

		async fn get_round_info(&self) -> Result<RoundInfo, RpcError> {
			Err(RpcError::Protocol {
				status: None,
				message: "connection reset".to_string(),
			})
		}

		async fn get_tx_proof(&self, _tx_hash: &TxHash) -> Result<Option<TxRecordProof>, RpcError> {
			Ok(None)
		}
	}

	#[tokio::test]
	async fn test_round_failure_sends_nothing() {
		let node = Arc::new(NoRoundNode::default());
		let poller = ConfirmationPoller::new(node.clone(), PollConfig::default());
		let err = poller
			.confirm(&order(110), &CancellationToken::new())
			.await
			.unwrap_err();

		assert!(err.to_string().contains("fetch round info"));
		assert_eq!(node.posts.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_submit_records_round_before_post() {
		let node = Arc::new(StubNode::new(None, 1, 5));
		let pending = poller(&node, PollConfig::default())
			.submit(&order(110))
			.await
			.unwrap();

		assert_eq!(pending.submitted_round, 100);
		assert_eq!(node.round.load(Ordering::SeqCst), 105);
		assert_eq!(node.posted.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_submit_error_has_context() {
		let poller = ConfirmationPoller::new(Arc::new(FailingNode), PollConfig::default());
		let err = poller
			.confirm(&order(110), &CancellationToken::new())
			.await
			.unwrap_err();
		let message = err.to_string();
		assert!(message.contains("submit transaction"));
		assert!(message.contains("boom"));
	}
}
