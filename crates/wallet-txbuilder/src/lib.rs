//! Transaction order assembly for the ledger wallet.
//!
//! Attributes are serialized into their canonical form first, the payload is
//! assembled around them, and only then is the owner proof computed over the
//! signing bytes. The signing key is always passed in explicitly.

use thiserror::Error;
use wallet_account::{AccountError, AccountKey};
use wallet_types::payloads::evm::{self, EvmTxAttributes};
use wallet_types::payloads::orchestration::{AddVarAttributes, ValidatorAssignmentRecord};
use wallet_types::{
	codec, ClientMetadata, CodecError, NetworkId, PartitionId, Payload, TransactionOrder,
	TxAttributes, UnitId,
};

/// Rounds added to the latest round to get a transaction timeout.
pub const DEFAULT_TX_TIMEOUT_ROUNDS: u64 = 10;

/// Errors that can occur while building a transaction order.
#[derive(Debug, Error)]
pub enum BuildError {
	#[error("failed to encode transaction: {0}")]
	Encoding(#[from] CodecError),
	#[error("failed to sign transaction: {0}")]
	Key(#[from] AccountError),
	/// The timeout does not leave the node enough rounds to include the order.
	#[error("timeout round {timeout} must exceed round {observed_round} by at least {margin}")]
	UnsafeTimeout {
		timeout: u64,
		observed_round: u64,
		margin: u64,
	},
}

/// Addressing and client metadata of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
	pub unit_id: UnitId,
	pub network_id: NetworkId,
	pub partition_id: PartitionId,
	/// Round after which the node must drop the order.
	pub timeout: u64,
	/// Maximum fee in canonical units.
	pub max_fee: u64,
	pub fee_credit_record_id: Option<UnitId>,
}

/// Timeout round `margin` rounds after `round`.
pub fn timeout_after(round: u64, margin: u64) -> Result<u64, BuildError> {
	round.checked_add(margin).ok_or(BuildError::UnsafeTimeout {
		timeout: u64::MAX,
		observed_round: round,
		margin,
	})
}

/// Rejects a timeout closer than `margin` rounds to the observed round.
pub fn ensure_timeout(timeout: u64, observed_round: u64, margin: u64) -> Result<(), BuildError> {
	match observed_round.checked_add(margin) {
		Some(min) if timeout >= min => Ok(()),
		_ => Err(BuildError::UnsafeTimeout {
			timeout,
			observed_round,
			margin,
		}),
	}
}

/// Builds a transaction order, signing it when `key` is given.
///
/// Without a key the order is returned unsigned so the proof can be attached
/// elsewhere.
pub fn build<A: TxAttributes>(
	attributes: &A,
	params: TxParams,
	key: Option<&AccountKey>,
) -> Result<TransactionOrder, BuildError> {
	let payload = Payload {
		network_id: params.network_id,
		partition_id: params.partition_id,
		unit_id: params.unit_id,
		payload_type: A::PAYLOAD_TYPE,
		attributes: codec::encode_to_vec(attributes)?,
		client_metadata: ClientMetadata {
			timeout: params.timeout,
			max_transaction_fee: params.max_fee,
			fee_credit_record_id: params.fee_credit_record_id,
		},
	};
	let order = TransactionOrder::unsigned(payload);
	let Some(key) = key else {
		return Ok(order);
	};
	let proof = key.owner_proof(&order.signing_bytes()?)?;
	tracing::debug!(
		unit_id = %order.unit_id(),
		payload_type = order.payload_type(),
		signer = %key.address(),
		"signed transaction order"
	);
	Ok(order.with_owner_proof(proof))
}

/// Order adding a validator assignment record to the orchestration partition.
pub fn new_add_var_tx(
	var: ValidatorAssignmentRecord,
	params: TxParams,
	key: Option<&AccountKey>,
) -> Result<TransactionOrder, BuildError> {
	build(&AddVarAttributes { var }, params, key)
}

/// Order executing an EVM transaction. The unit is the sender's account.
pub fn new_evm_tx(
	attributes: &EvmTxAttributes,
	network_id: NetworkId,
	partition_id: PartitionId,
	timeout: u64,
	max_fee: u64,
	key: Option<&AccountKey>,
) -> Result<TransactionOrder, BuildError> {
	let params = TxParams {
		unit_id: evm::account_unit_id(&attributes.from),
		network_id,
		partition_id,
		timeout,
		max_fee,
		fee_credit_record_id: None,
	};
	build(attributes, params, key)
}
