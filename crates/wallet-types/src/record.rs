//! Transaction execution records and inclusion proofs.
//!
//! Ledger inclusion and payload execution are two separate dimensions:
//! `success_indicator` reports whether the node processed the order
//! successfully, while `processing_details` carries the payload specific
//! execution outcome (e.g. a reverted contract call) and is never
//! interpreted here.

use crate::codec::{expect_array, tee};
use crate::unit::UnitId;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

/// Value of `success_indicator` reported for an order the node rejected.
pub const TX_STATUS_FAILED: u64 = 0;
/// Value of `success_indicator` reported for a successfully processed order.
pub const TX_STATUS_SUCCESSFUL: u64 = 1;

/// Execution metadata the node attaches to a processed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerMetadata {
	/// Fee charged by the node, in canonical units.
	pub actual_fee: u64,
	/// Units modified by the transaction.
	pub target_units: Vec<UnitId>,
	pub success_indicator: u64,
	/// Payload specific execution outcome, kept verbatim.
	pub processing_details: Vec<u8>,
}

impl ServerMetadata {
	pub fn is_successful(&self) -> bool {
		self.success_indicator != TX_STATUS_FAILED
	}
}

/// Record of a processed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
	/// Canonical bytes of the processed transaction order.
	pub transaction_order: Vec<u8>,
	pub server_metadata: ServerMetadata,
}

/// Inclusion proof of a transaction, retained as its raw CBOR item.
///
/// The wallet does not verify proofs; it only hands them to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxProof(pub Vec<u8>);

/// A transaction record together with its inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecordProof {
	pub tx_record: TxRecord,
	pub tx_proof: TxProof,
}

impl TxRecordProof {
	pub fn server_metadata(&self) -> &ServerMetadata {
		&self.tx_record.server_metadata
	}
}

impl<C> Encode<C> for ServerMetadata {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		_ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(4)?
			.u64(self.actual_fee)?
			.array(self.target_units.len() as u64)?;
		for unit in &self.target_units {
			e.bytes(unit.as_bytes())?;
		}
		e.u64(self.success_indicator)?
			.bytes(&self.processing_details)?;
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for ServerMetadata {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 4, "server metadata")?;
		let actual_fee = d.u64()?;
		let len = d
			.array()?
			.ok_or_else(|| decode::Error::message("target units: expected definite array"))?;
		let target_units = (0..len)
			.map(|_| d.bytes().map(UnitId::from))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			actual_fee,
			target_units,
			success_indicator: d.u64()?,
			processing_details: d.bytes()?.to_vec(),
		})
	}
}

impl<C> Encode<C> for TxRecord {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(2)?.bytes(&self.transaction_order)?;
		self.server_metadata.encode(e, ctx)
	}
}

impl<'b, C> Decode<'b, C> for TxRecord {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 2, "transaction record")?;
		Ok(Self {
			transaction_order: d.bytes()?.to_vec(),
			server_metadata: ServerMetadata::decode(d, ctx)?,
		})
	}
}

impl<C> Encode<C> for TxRecordProof {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(2)?;
		self.tx_record.encode(e, ctx)?;
		e.writer_mut()
			.write_all(&self.tx_proof.0)
			.map_err(encode::Error::write)?;
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for TxRecordProof {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 2, "transaction record proof")?;
		let tx_record = TxRecord::decode(d, ctx)?;
		let (_, raw_proof) = tee(d, |d| d.skip())?;
		Ok(Self {
			tx_record,
			tx_proof: TxProof(raw_proof.to_vec()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::codec::{decode_from_slice, encode_to_vec};

	fn proof_item() -> Vec<u8> {
		let mut e = Encoder::new(Vec::new());
		e.array(2).unwrap().u64(12).unwrap().bytes(&[0xaa; 4]).unwrap();
		e.into_writer()
	}

	#[test]
	fn test_record_proof_round_trip() {
		let proof = TxRecordProof {
			tx_record: TxRecord {
				transaction_order: vec![1, 2, 3],
				server_metadata: ServerMetadata {
					actual_fee: 2,
					target_units: vec![UnitId(vec![5; 20])],
					success_indicator: TX_STATUS_SUCCESSFUL,
					processing_details: b"details".to_vec(),
				},
			},
			tx_proof: TxProof(proof_item()),
		};

		let bytes = encode_to_vec(&proof).unwrap();
		let decoded: TxRecordProof = decode_from_slice(&bytes).unwrap();
		assert_eq!(decoded, proof);
		assert!(decoded.server_metadata().is_successful());
	}

	#[test]
	fn test_zero_indicator_is_failure() {
		let metadata = ServerMetadata {
			success_indicator: TX_STATUS_FAILED,
			..Default::default()
		};
		assert!(!metadata.is_successful());
	}
}
