//! Confirmation state machine.

use wallet_types::{TxHash, TxRecordProof};

/// An order accepted by the node and not yet resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
	pub tx_hash: TxHash,
	/// Round after which the node drops the order.
	pub timeout: u64,
	/// Latest round observed when the order was submitted.
	pub submitted_round: u64,
}

/// Terminal result of confirming a transaction.
///
/// Only `Confirmed` means the order's effects are final. Neither `TimedOut`
/// nor `Aborted` retracts the submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
	/// The node processed the order successfully. Payload specific failures,
	/// such as a reverted contract call, may still be reported in the
	/// processing details.
	Confirmed { proof: TxRecordProof },
	/// The node processed the order but reported failure.
	ExecutionFailed { proof: TxRecordProof },
	/// No proof appeared before the timeout round or the local deadline. The
	/// node may still include the order if its timeout round has not passed.
	TimedOut {
		tx_hash: TxHash,
		timeout: u64,
		last_round: u64,
	},
	/// Polling was cancelled locally.
	Aborted { tx_hash: TxHash, last_round: u64 },
}

impl ConfirmationOutcome {
	pub fn proof(&self) -> Option<&TxRecordProof> {
		match self {
			Self::Confirmed { proof } | Self::ExecutionFailed { proof } => Some(proof),
			_ => None,
		}
	}

	/// Processing details exactly as reported by the node.
	pub fn processing_details(&self) -> Option<&[u8]> {
		self.proof()
			.map(|proof| proof.server_metadata().processing_details.as_slice())
	}

	/// Fee charged for a processed order, in canonical units.
	pub fn actual_fee(&self) -> Option<u64> {
		self.proof().map(|proof| proof.server_metadata().actual_fee)
	}

	pub fn is_confirmed(&self) -> bool {
		matches!(self, Self::Confirmed { .. })
	}
}

/// Observation fed into the state machine.
#[derive(Debug, Clone)]
pub enum PollEvent {
	/// Result of one polling round trip.
	Tick {
		round: u64,
		proof: Option<TxRecordProof>,
	},
	DeadlineExceeded,
	Cancelled,
}

/// State of a transaction between submission and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationState {
	Submitted(PendingTransaction),
	Polling {
		pending: PendingTransaction,
		/// Completed polling round trips.
		polls: u64,
		last_round: u64,
	},
	Resolved(ConfirmationOutcome),
}

impl ConfirmationState {
	pub fn new(pending: PendingTransaction) -> Self {
		Self::Submitted(pending)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Resolved(_))
	}

	pub fn outcome(&self) -> Option<&ConfirmationOutcome> {
		match self {
			Self::Resolved(outcome) => Some(outcome),
			_ => None,
		}
	}

	/// Number of completed polls.
	pub fn polls(&self) -> u64 {
		match self {
			Self::Polling { polls, .. } => *polls,
			_ => 0,
		}
	}

	/// Applies an event. A resolved state ignores every event.
	pub fn on_event(self, event: PollEvent) -> Self {
		let (pending, polls, last_round) = match self {
			Self::Resolved(_) => return self,
			Self::Submitted(pending) => (pending, 0, pending.submitted_round),
			Self::Polling {
				pending,
				polls,
				last_round,
			} => (pending, polls, last_round),
		};
		let outcome = match event {
			PollEvent::Tick {
				proof: Some(proof), ..
			} => {
				if proof.server_metadata().is_successful() {
					ConfirmationOutcome::Confirmed { proof }
				} else {
					ConfirmationOutcome::ExecutionFailed { proof }
				}
			}
			PollEvent::Tick { round, proof: None } if round > pending.timeout => {
				ConfirmationOutcome::TimedOut {
					tx_hash: pending.tx_hash,
					timeout: pending.timeout,
					last_round: round,
				}
			}
			PollEvent::Tick { round, proof: None } => {
				return Self::Polling {
					pending,
					polls: polls + 1,
					last_round: round.max(last_round),
				}
			}
			PollEvent::DeadlineExceeded => ConfirmationOutcome::TimedOut {
				tx_hash: pending.tx_hash,
				timeout: pending.timeout,
				last_round,
			},
			PollEvent::Cancelled => ConfirmationOutcome::Aborted {
				tx_hash: pending.tx_hash,
				last_round,
			},
		};
		Self::Resolved(outcome)
	}
}
