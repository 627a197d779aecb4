//! Transaction orders and hashes.
//!
//! A [`TransactionOrder`] is immutable: it is assembled from a [`Payload`] and
//! can only gain proofs by being consumed, so no field can change after a
//! proof was computed over it.

use crate::codec::{self, decode_opt_bytes, encode_opt_bytes, expect_array, CodecError};
use crate::unit::UnitId;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier of the ledger network.
pub type NetworkId = u16;
/// Identifier of a partition within the network.
pub type PartitionId = u32;
/// Partition specific transaction type.
pub type PayloadType = u16;

/// Version of the canonical transaction order layout produced by this crate.
pub const TX_ORDER_VERSION: u32 = 1;

/// Attributes that can be carried by a transaction order.
///
/// Each implementation defines its canonical field order through its
/// `minicbor::Encode` implementation.
pub trait TxAttributes: Encode<()> {
	/// Payload type the node dispatches these attributes on.
	const PAYLOAD_TYPE: PayloadType;
}

/// Hash of a canonically encoded transaction order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
	pub fn to_hex(&self) -> String {
		hex::encode(self.0)
	}
}

impl fmt::Display for TxHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", self.to_hex())
	}
}

impl fmt::Debug for TxHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TxHash(0x{})", self.to_hex())
	}
}

/// Client supplied limits of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMetadata {
	/// Round number after which the node must not include the transaction.
	pub timeout: u64,
	/// Maximum fee the client is willing to pay, in canonical units.
	pub max_transaction_fee: u64,
	/// Fee credit record paying for the transaction, if any.
	pub fee_credit_record_id: Option<UnitId>,
}

/// Signed part of a transaction order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
	pub network_id: NetworkId,
	pub partition_id: PartitionId,
	pub unit_id: UnitId,
	pub payload_type: PayloadType,
	/// Canonical CBOR bytes of the payload specific attributes.
	pub attributes: Vec<u8>,
	pub client_metadata: ClientMetadata,
}

/// A transaction order ready to be submitted to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOrder {
	version: u32,
	payload: Payload,
	owner_proof: Option<Vec<u8>>,
	fee_proof: Option<Vec<u8>>,
}

impl TransactionOrder {
	/// Creates an order without any proofs.
	pub fn unsigned(payload: Payload) -> Self {
		Self {
			version: TX_ORDER_VERSION,
			payload,
			owner_proof: None,
			fee_proof: None,
		}
	}

	/// Attaches the owner proof, consuming the order.
	pub fn with_owner_proof(self, proof: Vec<u8>) -> Self {
		Self {
			owner_proof: Some(proof),
			..self
		}
	}

	/// Attaches the fee proof, consuming the order.
	pub fn with_fee_proof(self, proof: Vec<u8>) -> Self {
		Self {
			fee_proof: Some(proof),
			..self
		}
	}

	pub fn version(&self) -> u32 {
		self.version
	}

	pub fn payload(&self) -> &Payload {
		&self.payload
	}

	pub fn network_id(&self) -> NetworkId {
		self.payload.network_id
	}

	pub fn partition_id(&self) -> PartitionId {
		self.payload.partition_id
	}

	pub fn unit_id(&self) -> &UnitId {
		&self.payload.unit_id
	}

	pub fn payload_type(&self) -> PayloadType {
		self.payload.payload_type
	}

	pub fn timeout(&self) -> u64 {
		self.payload.client_metadata.timeout
	}

	pub fn max_fee(&self) -> u64 {
		self.payload.client_metadata.max_transaction_fee
	}

	pub fn fee_credit_record_id(&self) -> Option<&UnitId> {
		self.payload.client_metadata.fee_credit_record_id.as_ref()
	}

	pub fn owner_proof(&self) -> Option<&[u8]> {
		self.owner_proof.as_deref()
	}

	pub fn fee_proof(&self) -> Option<&[u8]> {
		self.fee_proof.as_deref()
	}

	/// Decodes the attributes into the expected payload specific type.
	pub fn unmarshal_attributes<T>(&self) -> Result<T, CodecError>
	where
		T: for<'b> Decode<'b, ()>,
	{
		codec::decode_from_slice(&self.payload.attributes)
	}

	/// Bytes covered by the owner proof: the version and the payload,
	/// excluding both proof fields.
	pub fn signing_bytes(&self) -> Result<Vec<u8>, CodecError> {
		let mut e = Encoder::new(Vec::new());
		e.array(2)
			.and_then(|e| e.u32(self.version))
			.and_then(|e| e.encode(&self.payload))
			.map_err(|e| CodecError::Encode(e.to_string()))?;
		Ok(e.into_writer())
	}

	/// Full canonical encoding of the order, as submitted to the node.
	pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
		codec::encode_to_vec(self)
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
		codec::decode_from_slice(bytes)
	}

	/// SHA-256 over the full canonical encoding.
	pub fn hash(&self) -> Result<TxHash, CodecError> {
		Ok(TxHash(Sha256::digest(self.to_bytes()?).into()))
	}
}

impl<C> Encode<C> for ClientMetadata {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		_ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(3)?.u64(self.timeout)?.u64(self.max_transaction_fee)?;
		encode_opt_bytes(e, self.fee_credit_record_id.as_ref().map(|id| id.as_bytes()))
	}
}

impl<'b, C> Decode<'b, C> for ClientMetadata {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 3, "client metadata")?;
		Ok(Self {
			timeout: d.u64()?,
			max_transaction_fee: d.u64()?,
			fee_credit_record_id: decode_opt_bytes(d)?.map(UnitId),
		})
	}
}

impl<C> Encode<C> for Payload {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(6)?
			.u16(self.network_id)?
			.u32(self.partition_id)?
			.bytes(self.unit_id.as_bytes())?
			.u16(self.payload_type)?
			.bytes(&self.attributes)?;
		self.client_metadata.encode(e, ctx)
	}
}

impl<'b, C> Decode<'b, C> for Payload {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 6, "payload")?;
		Ok(Self {
			network_id: d.u16()?,
			partition_id: d.u32()?,
			unit_id: UnitId(d.bytes()?.to_vec()),
			payload_type: d.u16()?,
			attributes: d.bytes()?.to_vec(),
			client_metadata: ClientMetadata::decode(d, ctx)?,
		})
	}
}

impl<C> Encode<C> for TransactionOrder {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(4)?.u32(self.version)?;
		self.payload.encode(e, ctx)?;
		encode_opt_bytes(e, self.owner_proof.as_deref())?;
		encode_opt_bytes(e, self.fee_proof.as_deref())
	}
}

impl<'b, C> Decode<'b, C> for TransactionOrder {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 4, "transaction order")?;
		let version = d.u32()?;
		if version != TX_ORDER_VERSION {
			return Err(decode::Error::message(format!(
				"unsupported transaction order version {version}"
			)));
		}
		Ok(Self {
			version,
			payload: Payload::decode(d, ctx)?,
			owner_proof: decode_opt_bytes(d)?,
			fee_proof: decode_opt_bytes(d)?,
		})
	}
}
