//! Unit and shard identifiers.
//!
//! A unit id addresses an on-chain object. It is composed from a 32 byte
//! pseudo-random seed whose leading bits are replaced by the shard prefix,
//! followed by a single unit type tag byte.

use crate::transaction::PartitionId;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the random part of a unit id in bytes.
pub const UNIT_ID_SEED_LEN: usize = 32;

/// Maximum number of bits a shard id can have.
pub const MAX_SHARD_ID_BITS: usize = UNIT_ID_SEED_LEN * 8;

/// Errors produced while parsing a shard id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShardIdError {
	/// The textual form contained something other than `0` and `1`.
	#[error("invalid shard id character {0:?}, expected '0' or '1'")]
	InvalidCharacter(char),
	/// The shard id is longer than the unit id seed.
	#[error("shard id has {0} bits, at most {MAX_SHARD_ID_BITS} supported")]
	TooLong(usize),
	/// Canonical bytes are missing the end marker bit.
	#[error("shard id bytes are missing the end marker")]
	MissingEndMarker,
}

/// Identifier of a shard within a partition, represented as a bit string.
///
/// The empty bit string identifies the single shard of an unsharded partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShardId {
	bits: Vec<bool>,
}

impl ShardId {
	/// Returns the shard id of a partition that has only one shard.
	pub fn root() -> Self {
		Self::default()
	}

	/// Creates a shard id from individual bits, most significant first.
	pub fn from_bits(bits: Vec<bool>) -> Result<Self, ShardIdError> {
		if bits.len() > MAX_SHARD_ID_BITS {
			return Err(ShardIdError::TooLong(bits.len()));
		}
		Ok(Self { bits })
	}

	/// Number of bits in the shard id.
	pub fn length(&self) -> usize {
		self.bits.len()
	}

	/// Canonical byte form: the bits packed MSB first, followed by a single
	/// `1` end marker bit and zero padding up to the byte boundary.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = vec![0u8; self.bits.len() / 8 + 1];
		for (i, bit) in self.bits.iter().enumerate() {
			if *bit {
				out[i / 8] |= 0x80 >> (i % 8);
			}
		}
		let marker = self.bits.len();
		out[marker / 8] |= 0x80 >> (marker % 8);
		out
	}

	/// Parses the canonical byte form produced by [`ShardId::to_bytes`].
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, ShardIdError> {
		let total_bits = bytes.len() * 8;
		let marker = (0..total_bits)
			.rev()
			.find(|i| bytes[i / 8] & (0x80 >> (i % 8)) != 0)
			.ok_or(ShardIdError::MissingEndMarker)?;
		let bits = (0..marker)
			.map(|i| bytes[i / 8] & (0x80 >> (i % 8)) != 0)
			.collect();
		Self::from_bits(bits)
	}

	/// Overwrites the leading bits of `buf` with the shard prefix.
	fn embed(&self, buf: &mut [u8]) {
		for (i, bit) in self.bits.iter().enumerate() {
			let mask = 0x80 >> (i % 8);
			if *bit {
				buf[i / 8] |= mask;
			} else {
				buf[i / 8] &= !mask;
			}
		}
	}
}

impl FromStr for ShardId {
	type Err = ShardIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.strip_prefix("0b").unwrap_or(s);
		let bits = s
			.chars()
			.map(|c| match c {
				'0' => Ok(false),
				'1' => Ok(true),
				other => Err(ShardIdError::InvalidCharacter(other)),
			})
			.collect::<Result<Vec<_>, _>>()?;
		Self::from_bits(bits)
	}
}

impl fmt::Display for ShardId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for bit in &self.bits {
			f.write_str(if *bit { "1" } else { "0" })?;
		}
		Ok(())
	}
}

impl Serialize for ShardId {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for ShardId {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Derives the pseudo-random unit id seed for a partition shard.
///
/// The same partition and shard always yield the same seed, which keeps
/// unit ids derived from it idempotent.
pub fn prnd_sh(partition_id: PartitionId, shard_id: &ShardId) -> [u8; UNIT_ID_SEED_LEN] {
	let mut hasher = Sha256::new();
	hasher.update(partition_id.to_be_bytes());
	hasher.update(shard_id.to_bytes());
	hasher.finalize().into()
}

/// Identifier of an on-chain unit.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct UnitId(pub Vec<u8>);

impl UnitId {
	/// Composes a unit id from a shard prefix, a unit type tag and a seed.
	///
	/// This is a pure function of its inputs.
	pub fn compose(shard_id: &ShardId, type_tag: u8, seed: &[u8; UNIT_ID_SEED_LEN]) -> Self {
		let mut buf = seed.to_vec();
		shard_id.embed(&mut buf);
		buf.push(type_tag);
		Self(buf)
	}

	/// Composes a unit id whose seed is derived from the partition and shard.
	pub fn for_partition_shard(
		partition_id: PartitionId,
		shard_id: &ShardId,
		type_tag: u8,
	) -> Self {
		Self::compose(shard_id, type_tag, &prnd_sh(partition_id, shard_id))
	}

	/// Returns the unit type tag, which is the trailing byte of a composed id.
	pub fn type_tag(&self) -> Option<u8> {
		self.0.last().copied()
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn to_hex(&self) -> String {
		hex::encode(&self.0)
	}
}

impl From<Vec<u8>> for UnitId {
	fn from(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}
}

impl From<&[u8]> for UnitId {
	fn from(bytes: &[u8]) -> Self {
		Self(bytes.to_vec())
	}
}

impl AsRef<[u8]> for UnitId {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Display for UnitId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", self.to_hex())
	}
}

impl fmt::Debug for UnitId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "UnitId(0x{})", self.to_hex())
	}
}

impl<C> Encode<C> for UnitId {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		_ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.bytes(&self.0)?;
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for UnitId {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		Ok(Self(d.bytes()?.to_vec()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_compose_is_deterministic() {
		let shard: ShardId = "0110".parse().unwrap();
		let seed = prnd_sh(4, &shard);

		let a = UnitId::compose(&shard, 1, &seed);
		let b = UnitId::compose(&shard, 1, &seed);
		assert_eq!(a, b);
		assert_eq!(a, UnitId::for_partition_shard(4, &shard, 1));
		assert_eq!(a.as_bytes().len(), UNIT_ID_SEED_LEN + 1);
		assert_eq!(a.type_tag(), Some(1));
	}

	#[test]
	fn test_different_shard_gives_different_unit() {
		let a = UnitId::for_partition_shard(4, &"0".parse().unwrap(), 1);
		let b = UnitId::for_partition_shard(4, &"1".parse().unwrap(), 1);
		let root = UnitId::for_partition_shard(4, &ShardId::root(), 1);
		assert_ne!(a, b);
		assert_ne!(a, root);
		assert_ne!(b, root);
	}

	#[test]
	fn test_shard_prefix_embedded() {
		let shard: ShardId = "101".parse().unwrap();
		let unit = UnitId::compose(&shard, 9, &[0u8; UNIT_ID_SEED_LEN]);
		assert_eq!(unit.as_bytes()[0], 0b1010_0000);

		let unit = UnitId::compose(&shard, 9, &[0xff; UNIT_ID_SEED_LEN]);
		assert_eq!(unit.as_bytes()[0], 0b1011_1111);
		assert_eq!(unit.as_bytes()[1], 0xff);
	}

	#[test]
	fn test_shard_id_bytes() {
		assert_eq!(ShardId::root().to_bytes(), vec![0x80]);

		let shard: ShardId = "01".parse().unwrap();
		assert_eq!(shard.to_bytes(), vec![0b0110_0000]);
		assert_eq!(ShardId::from_bytes(&shard.to_bytes()).unwrap(), shard);

		let long: ShardId = "010101011".parse().unwrap();
		assert_eq!(ShardId::from_bytes(&long.to_bytes()).unwrap(), long);
		assert_eq!(long.to_string(), "010101011");

		assert_eq!(
			ShardId::from_bytes(&[0, 0]),
			Err(ShardIdError::MissingEndMarker)
		);
	}

	#[test]
	fn test_shard_id_parse_errors() {
		assert_eq!(
			"012".parse::<ShardId>(),
			Err(ShardIdError::InvalidCharacter('2'))
		);
		let too_long = "1".repeat(MAX_SHARD_ID_BITS + 1);
		assert!(matches!(
			too_long.parse::<ShardId>(),
			Err(ShardIdError::TooLong(_))
		));
		assert_eq!("0b1".parse::<ShardId>().unwrap().length(), 1);
	}
}
