//! Orchestration partition payloads.
//!
//! The orchestration partition stores validator assignment records, which
//! describe the validator set of a partition shard for an epoch.

use crate::codec::expect_array;
use crate::transaction::{NetworkId, PartitionId, PayloadType, TxAttributes};
use crate::unit::{ShardId, UnitId};
use crate::utils::without_0x_prefix;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Partition id the orchestration partition runs under by default.
pub const DEFAULT_PARTITION_ID: PartitionId = 4;

/// Unit type tag of validator assignment record units.
pub const VAR_UNIT_TYPE: u8 = 1;

/// Payload type of the "add validator assignment record" transaction.
pub const PAYLOAD_TYPE_ADD_VAR: PayloadType = 1;

/// Unit id of the validator assignment record of a partition shard.
pub fn var_unit_id(partition_id: PartitionId, shard_id: &ShardId) -> UnitId {
	UnitId::for_partition_shard(partition_id, shard_id, VAR_UNIT_TYPE)
}

/// A validator participating in a partition shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
	pub node_id: String,
	/// Public key the validator signs blocks with.
	#[serde(with = "hex_bytes")]
	pub sig_key: Vec<u8>,
	pub stake: u64,
}

/// Validator set of a partition shard for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatorAssignmentRecord {
	pub network_id: NetworkId,
	pub partition_id: PartitionId,
	#[serde(default)]
	pub shard_id: ShardId,
	pub epoch_number: u64,
	pub epoch_start_round: u64,
	pub validators: Vec<ValidatorInfo>,
}

/// Attributes of the "add validator assignment record" transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddVarAttributes {
	pub var: ValidatorAssignmentRecord,
}

impl TxAttributes for AddVarAttributes {
	const PAYLOAD_TYPE: PayloadType = PAYLOAD_TYPE_ADD_VAR;
}

/// `[nodeID, sigKey, stake]`
impl<C> Encode<C> for ValidatorInfo {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		_ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(3)?
			.str(&self.node_id)?
			.bytes(&self.sig_key)?
			.u64(self.stake)?;
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for ValidatorInfo {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 3, "validator info")?;
		Ok(Self {
			node_id: d.str()?.to_string(),
			sig_key: d.bytes()?.to_vec(),
			stake: d.u64()?,
		})
	}
}

/// `[networkID, partitionID, shardID, epochNumber, epochStartRound, [ValidatorInfo]]`
impl<C> Encode<C> for ValidatorAssignmentRecord {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(6)?
			.u16(self.network_id)?
			.u32(self.partition_id)?
			.bytes(&self.shard_id.to_bytes())?
			.u64(self.epoch_number)?
			.u64(self.epoch_start_round)?
			.array(self.validators.len() as u64)?;
		for validator in &self.validators {
			validator.encode(e, ctx)?;
		}
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for ValidatorAssignmentRecord {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 6, "validator assignment record")?;
		let network_id = d.u16()?;
		let partition_id = d.u32()?;
		let shard_id =
			ShardId::from_bytes(d.bytes()?).map_err(|e| decode::Error::message(e.to_string()))?;
		let epoch_number = d.u64()?;
		let epoch_start_round = d.u64()?;
		let len = d
			.array()?
			.ok_or_else(|| decode::Error::message("validators: expected definite array"))?;
		let validators = (0..len)
			.map(|_| ValidatorInfo::decode(d, ctx))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			network_id,
			partition_id,
			shard_id,
			epoch_number,
			epoch_start_round,
			validators,
		})
	}
}

/// `[ValidatorAssignmentRecord]`
impl<C> Encode<C> for AddVarAttributes {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(1)?;
		self.var.encode(e, ctx)
	}
}

impl<'b, C> Decode<'b, C> for AddVarAttributes {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 1, "add var attributes")?;
		Ok(Self {
			var: ValidatorAssignmentRecord::decode(d, ctx)?,
		})
	}
}

/// Hex encoded bytes in JSON, with an optional `0x` prefix.
mod hex_bytes {
	use super::*;

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(deserializer)?;
		hex::decode(without_0x_prefix(&s)).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::codec::{decode_from_slice, encode_to_vec};

	const VAR_JSON: &str = r#"{
		"network_id": 3,
		"partition_id": 2,
		"shard_id": "",
		"epoch_number": 1,
		"epoch_start_round": 100,
		"validators": [
			{ "node_id": "node-1", "sig_key": "0x02aabbcc", "stake": 1 },
			{ "node_id": "node-2", "sig_key": "03ddeeff", "stake": 1 }
		]
	}"#;

	#[test]
	fn test_var_from_json() {
		let var: ValidatorAssignmentRecord = serde_json::from_str(VAR_JSON).unwrap();
		assert_eq!(var.partition_id, 2);
		assert_eq!(var.shard_id, ShardId::root());
		assert_eq!(var.validators.len(), 2);
		assert_eq!(var.validators[0].sig_key, vec![0x02, 0xaa, 0xbb, 0xcc]);
		assert_eq!(var.validators[1].sig_key, vec![0x03, 0xdd, 0xee, 0xff]);
	}

	#[test]
	fn test_add_var_attributes_round_trip() {
		let var: ValidatorAssignmentRecord = serde_json::from_str(VAR_JSON).unwrap();
		let attrs = AddVarAttributes { var };
		let decoded: AddVarAttributes = decode_from_slice(&encode_to_vec(&attrs).unwrap()).unwrap();
		assert_eq!(decoded, attrs);
	}

	#[test]
	fn test_var_unit_id() {
		let shard: ShardId = "1".parse().unwrap();
		let id = var_unit_id(2, &shard);
		assert_eq!(id.type_tag(), Some(VAR_UNIT_TYPE));
		assert_eq!(id, var_unit_id(2, &shard));
		assert_ne!(id, var_unit_id(3, &shard));
	}
}
