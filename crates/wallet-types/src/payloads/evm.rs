//! EVM partition payloads.
//!
//! Addresses travel as 20 byte strings and 256-bit values as minimal
//! big-endian byte strings (zero is the empty string).

use crate::codec::expect_array;
use crate::transaction::{PartitionId, PayloadType, TxAttributes};
use crate::unit::UnitId;
use alloy_primitives::{Address, B256, U256};
use minicbor::data::Type;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

/// Partition id the EVM partition runs under by default.
pub const DEFAULT_PARTITION_ID: PartitionId = 3;

/// Payload type of a contract call or value transfer.
pub const PAYLOAD_TYPE_EVM_CALL: PayloadType = 1;

/// Unit id of the EVM account behind an address.
///
/// The EVM partition addresses accounts, and the fee credit they hold, by the
/// raw address bytes.
pub fn account_unit_id(address: &Address) -> UnitId {
	UnitId::from(address.as_slice())
}

/// Attributes of an EVM transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvmTxAttributes {
	pub from: Address,
	/// Call target, `None` deploys a contract.
	pub to: Option<Address>,
	pub data: Vec<u8>,
	/// Transferred value in wei.
	pub value: U256,
	pub gas: u64,
	pub nonce: u64,
}

impl TxAttributes for EvmTxAttributes {
	const PAYLOAD_TYPE: PayloadType = PAYLOAD_TYPE_EVM_CALL;
}

/// Read-only call executed by the node without persisting state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallEvmRequest {
	pub from: Address,
	pub to: Option<Address>,
	pub data: Vec<u8>,
	pub value: U256,
	pub gas: u64,
}

/// Log emitted by a contract during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmLog {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Vec<u8>,
}

/// Execution outcome of an EVM transaction or call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvmProcessingDetails {
	/// Revert reason or VM error, empty when execution succeeded.
	pub error_details: String,
	pub return_data: Vec<u8>,
	/// Address of a contract created by the transaction.
	pub contract_addr: Option<Address>,
	pub logs: Vec<EvmLog>,
}

impl EvmProcessingDetails {
	/// Returns the execution error, if execution failed.
	pub fn error(&self) -> Option<&str> {
		(!self.error_details.is_empty()).then_some(self.error_details.as_str())
	}
}

fn encode_address<W: encode::Write>(
	e: &mut Encoder<W>,
	address: Option<&Address>,
) -> Result<(), encode::Error<W::Error>> {
	match address {
		Some(address) => e.bytes(address.as_slice())?,
		None => e.null()?,
	};
	Ok(())
}

fn decode_address(d: &mut Decoder<'_>) -> Result<Address, decode::Error> {
	Address::try_from(d.bytes()?).map_err(|_| decode::Error::message("address: expected 20 bytes"))
}

fn decode_opt_address(d: &mut Decoder<'_>) -> Result<Option<Address>, decode::Error> {
	if d.datatype()? == Type::Null {
		d.null()?;
		return Ok(None);
	}
	decode_address(d).map(Some)
}

fn encode_u256<W: encode::Write>(
	e: &mut Encoder<W>,
	value: &U256,
) -> Result<(), encode::Error<W::Error>> {
	e.bytes(&value.to_be_bytes_trimmed_vec())?;
	Ok(())
}

fn decode_u256(d: &mut Decoder<'_>) -> Result<U256, decode::Error> {
	U256::try_from_be_slice(d.bytes()?)
		.ok_or_else(|| decode::Error::message("value: wider than 256 bits"))
}

/// `[from, to|null, data, value, gas, nonce]`
impl<C> Encode<C> for EvmTxAttributes {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		_ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(6)?;
		encode_address(e, Some(&self.from))?;
		encode_address(e, self.to.as_ref())?;
		e.bytes(&self.data)?;
		encode_u256(e, &self.value)?;
		e.u64(self.gas)?.u64(self.nonce)?;
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for EvmTxAttributes {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 6, "evm tx attributes")?;
		Ok(Self {
			from: decode_address(d)?,
			to: decode_opt_address(d)?,
			data: d.bytes()?.to_vec(),
			value: decode_u256(d)?,
			gas: d.u64()?,
			nonce: d.u64()?,
		})
	}
}

/// `[from, to|null, data, value, gas]`
impl<C> Encode<C> for CallEvmRequest {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		_ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(5)?;
		encode_address(e, Some(&self.from))?;
		encode_address(e, self.to.as_ref())?;
		e.bytes(&self.data)?;
		encode_u256(e, &self.value)?;
		e.u64(self.gas)?;
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for CallEvmRequest {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 5, "call evm request")?;
		Ok(Self {
			from: decode_address(d)?,
			to: decode_opt_address(d)?,
			data: d.bytes()?.to_vec(),
			value: decode_u256(d)?,
			gas: d.u64()?,
		})
	}
}

/// `[address, [topic], data]`
impl<C> Encode<C> for EvmLog {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		_ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(3)?
			.bytes(self.address.as_slice())?
			.array(self.topics.len() as u64)?;
		for topic in &self.topics {
			e.bytes(topic.as_slice())?;
		}
		e.bytes(&self.data)?;
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for EvmLog {
	fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 3, "evm log")?;
		let address = decode_address(d)?;
		let len = d
			.array()?
			.ok_or_else(|| decode::Error::message("topics: expected definite array"))?;
		let topics = (0..len)
			.map(|_| {
				B256::try_from(d.bytes()?)
					.map_err(|_| decode::Error::message("topic: expected 32 bytes"))
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			address,
			topics,
			data: d.bytes()?.to_vec(),
		})
	}
}

/// `[errorDetails, returnData, contractAddr|null, [EvmLog]]`
impl<C> Encode<C> for EvmProcessingDetails {
	fn encode<W: encode::Write>(
		&self,
		e: &mut Encoder<W>,
		ctx: &mut C,
	) -> Result<(), encode::Error<W::Error>> {
		e.array(4)?
			.str(&self.error_details)?
			.bytes(&self.return_data)?;
		encode_address(e, self.contract_addr.as_ref())?;
		e.array(self.logs.len() as u64)?;
		for log in &self.logs {
			log.encode(e, ctx)?;
		}
		Ok(())
	}
}

impl<'b, C> Decode<'b, C> for EvmProcessingDetails {
	fn decode(d: &mut Decoder<'b>, ctx: &mut C) -> Result<Self, decode::Error> {
		expect_array(d, 4, "evm processing details")?;
		let error_details = d.str()?.to_string();
		let return_data = d.bytes()?.to_vec();
		let contract_addr = decode_opt_address(d)?;
		let len = d
			.array()?
			.ok_or_else(|| decode::Error::message("logs: expected definite array"))?;
		let logs = (0..len)
			.map(|_| EvmLog::decode(d, ctx))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			error_details,
			return_data,
			contract_addr,
			logs,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::codec::{decode_from_slice, encode_to_vec};
	use alloy_primitives::address;

	const FROM: Address = address!("00000000000000000000000000000000000000aa");
	const TO: Address = address!("00000000000000000000000000000000000000bb");

	#[test]
	fn test_tx_attributes_round_trip() {
		let attrs = EvmTxAttributes {
			from: FROM,
			to: Some(TO),
			data: vec![0xa9, 0x05, 0x9c, 0xbb],
			value: U256::from(1_000_000_000_000_000_000u128),
			gas: 21_000,
			nonce: 7,
		};
		let decoded: EvmTxAttributes = decode_from_slice(&encode_to_vec(&attrs).unwrap()).unwrap();
		assert_eq!(decoded, attrs);
	}

	#[test]
	fn test_zero_value_is_empty_bytes() {
		let request = CallEvmRequest {
			from: FROM,
			..Default::default()
		};
		let bytes = encode_to_vec(&request).unwrap();

		let mut d = Decoder::new(&bytes);
		expect_array(&mut d, 5, "call").unwrap();
		d.bytes().unwrap();
		d.null().unwrap();
		d.bytes().unwrap();
		assert!(d.bytes().unwrap().is_empty());

		let decoded: CallEvmRequest = decode_from_slice(&bytes).unwrap();
		assert_eq!(decoded.to, None);
		assert_eq!(decoded.value, U256::ZERO);
	}

	#[test]
	fn test_processing_details_round_trip() {
		let details = EvmProcessingDetails {
			error_details: "execution reverted".to_string(),
			return_data: vec![1, 2],
			contract_addr: Some(TO),
			logs: vec![EvmLog {
				address: TO,
				topics: vec![B256::repeat_byte(0x11)],
				data: vec![3],
			}],
		};
		let decoded: EvmProcessingDetails =
			decode_from_slice(&encode_to_vec(&details).unwrap()).unwrap();
		assert_eq!(decoded, details);
		assert_eq!(decoded.error(), Some("execution reverted"));
		assert_eq!(EvmProcessingDetails::default().error(), None);
	}

	#[test]
	fn test_rejects_short_address() {
		let mut e = Encoder::new(Vec::new());
		e.array(5).unwrap().bytes(&[1, 2, 3]).unwrap();
		let err = decode_from_slice::<CallEvmRequest>(&e.into_writer()).unwrap_err();
		assert!(err.to_string().contains("20 bytes"));
	}

	#[test]
	fn test_account_unit_id() {
		assert_eq!(account_unit_id(&FROM).as_bytes(), FROM.as_slice());
	}
}
