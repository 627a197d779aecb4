//! Common types module for the ledger wallet.
//!
//! This module defines the data model shared by every wallet component:
//! transaction orders and their canonical CBOR contract, unit identifiers,
//! execution records and proofs, round information, fee credit bills and the
//! payload attribute types of the supported partitions.

/// Fee credit bill representation.
pub mod bill;
/// Canonical CBOR helpers shared by the encoders in this crate.
pub mod codec;
/// Payload attribute types for the supported partitions.
pub mod payloads;
/// Transaction execution records and inclusion proofs.
pub mod record;
/// Consensus round information.
pub mod round;
/// Secure string type for private key material.
pub mod secret_string;
/// Transaction orders and hashes.
pub mod transaction;
/// Unit and shard identifiers.
pub mod unit;
/// Utility functions for display formatting.
pub mod utils;

pub use bill::FeeCreditBill;
pub use codec::CodecError;
pub use record::{ServerMetadata, TxProof, TxRecord, TxRecordProof};
pub use round::RoundInfo;
pub use secret_string::SecretString;
pub use transaction::{
	ClientMetadata, NetworkId, PartitionId, Payload, PayloadType, TransactionOrder, TxAttributes,
	TxHash, TX_ORDER_VERSION,
};
pub use unit::{ShardId, UnitId};
pub use utils::{format_amount, truncate_id, with_0x_prefix, without_0x_prefix};
