//! Canonical CBOR helpers.
//!
//! Every wire structure in this crate implements `minicbor::Encode` and
//! `minicbor::Decode` by hand, as a definite-length array with a fixed field
//! order. The helpers here keep those implementations short and make the
//! length checks uniform.

use minicbor::data::Type;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use thiserror::Error;

/// Errors produced while converting values to or from canonical bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
	/// A value could not be serialized.
	#[error("encoding failed: {0}")]
	Encode(String),
	/// Bytes did not match the expected canonical layout.
	#[error("decoding failed: {0}")]
	Decode(String),
}

impl From<decode::Error> for CodecError {
	fn from(err: decode::Error) -> Self {
		CodecError::Decode(err.to_string())
	}
}

/// Serializes a value into its canonical CBOR bytes.
pub fn encode_to_vec<T: Encode<()>>(value: &T) -> Result<Vec<u8>, CodecError> {
	minicbor::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Deserializes a value from canonical CBOR bytes.
pub fn decode_from_slice<T>(bytes: &[u8]) -> Result<T, CodecError>
where
	T: for<'b> Decode<'b, ()>,
{
	minicbor::decode(bytes).map_err(CodecError::from)
}

/// Reads a definite-length array header and checks it against the expected length.
pub fn expect_array(d: &mut Decoder<'_>, expected: u64, label: &str) -> Result<(), decode::Error> {
	match d.array()? {
		Some(len) if len == expected => Ok(()),
		other => Err(decode::Error::message(format!(
			"{label}: expected array of length {expected}, got {other:?}"
		))),
	}
}

/// Encodes optional bytes as either a byte string or null.
pub fn encode_opt_bytes<W: encode::Write>(
	e: &mut Encoder<W>,
	value: Option<&[u8]>,
) -> Result<(), encode::Error<W::Error>> {
	match value {
		Some(bytes) => e.bytes(bytes)?,
		None => e.null()?,
	};
	Ok(())
}

/// Decodes either a byte string or null.
pub fn decode_opt_bytes(d: &mut Decoder<'_>) -> Result<Option<Vec<u8>>, decode::Error> {
	if d.datatype()? == Type::Null {
		d.null()?;
		return Ok(None);
	}
	Ok(Some(d.bytes()?.to_vec()))
}

/// Decode a chunk, but retain a reference to the decoded bytes.
pub fn tee<'d, A>(
	d: &mut Decoder<'d>,
	decoder: impl FnOnce(&mut Decoder<'d>) -> Result<A, decode::Error>,
) -> Result<(A, &'d [u8]), decode::Error> {
	let original_bytes = d.input();
	let start = d.position();
	let a = decoder(d)?;
	let end = d.position();
	Ok((a, &original_bytes[start..end]))
}
