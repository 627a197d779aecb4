//! Fee credit arithmetic for the ledger wallet.
//!
//! The EVM partition prices execution in wei while fee credit is held in the
//! partition's canonical unit. Conversion is integer floor division by a
//! scaling factor and must match the node's arithmetic exactly, so every
//! operation here works on 256-bit integers and fails instead of wrapping.

use alloy_primitives::U256;
use thiserror::Error;
use wallet_types::FeeCreditBill;

/// Wei per canonical fee unit.
pub const NATIVE_PER_CANONICAL: U256 = U256::from_limbs([10_000_000_000, 0, 0, 0]);

/// Errors that can occur during fee calculations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeeError {
	/// The fee credit balance does not cover the estimated fee.
	#[error("insufficient fee credit balance for transaction: required {required}, available {available}")]
	InsufficientFunds { required: u64, available: u64 },
	/// An intermediate or final value does not fit its representation.
	#[error("fee calculation overflow")]
	Overflow,
	#[error("scaling factor must be positive")]
	InvalidScalingFactor,
	/// A decimal amount could not be parsed.
	#[error("invalid amount {0:?}")]
	InvalidAmount(String),
}

/// Converts a native amount to canonical units, truncating toward zero.
pub fn convert_native_to_canonical(native: U256, scaling_factor: U256) -> Result<u64, FeeError> {
	if scaling_factor.is_zero() {
		return Err(FeeError::InvalidScalingFactor);
	}
	u64::try_from(native / scaling_factor).map_err(|_| FeeError::Overflow)
}

/// Fee in canonical units for `quantity` units of execution priced at
/// `unit_price` wei each, using the default scaling factor.
pub fn estimate_required_fee(quantity: u64, unit_price: U256) -> Result<u64, FeeError> {
	FeeCalculator::default().estimate_required_fee(quantity, unit_price)
}

/// Fails with [`FeeError::InsufficientFunds`] unless `available` covers `required`.
pub fn check_sufficiency(available: u64, required: u64) -> Result<(), FeeError> {
	if required > available {
		return Err(FeeError::InsufficientFunds {
			required,
			available,
		});
	}
	Ok(())
}

/// Balance available for fees; a missing bill is a zero balance.
pub fn available_balance(bill: Option<&FeeCreditBill>) -> u64 {
	bill.map_or(0, |bill| bill.value)
}

/// Parses a non-negative decimal amount such as the wei strings the node reports.
pub fn parse_native_amount(amount: &str) -> Result<U256, FeeError> {
	let trimmed = amount.trim();
	if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
		return Err(FeeError::InvalidAmount(amount.to_string()));
	}
	U256::from_str_radix(trimmed, 10).map_err(|_| FeeError::InvalidAmount(amount.to_string()))
}

/// Fee arithmetic bound to a configured scaling factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCalculator {
	scaling_factor: U256,
}

impl Default for FeeCalculator {
	fn default() -> Self {
		Self {
			scaling_factor: NATIVE_PER_CANONICAL,
		}
	}
}

impl FeeCalculator {
	pub fn new(scaling_factor: U256) -> Result<Self, FeeError> {
		if scaling_factor.is_zero() {
			return Err(FeeError::InvalidScalingFactor);
		}
		Ok(Self { scaling_factor })
	}

	pub fn scaling_factor(&self) -> U256 {
		self.scaling_factor
	}

	pub fn to_canonical(&self, native: U256) -> Result<u64, FeeError> {
		convert_native_to_canonical(native, self.scaling_factor)
	}

	/// `to_canonical(quantity * unit_price)` with a checked 256-bit product.
	pub fn estimate_required_fee(&self, quantity: u64, unit_price: U256) -> Result<u64, FeeError> {
		let native = U256::from(quantity)
			.checked_mul(unit_price)
			.ok_or(FeeError::Overflow)?;
		let fee = self.to_canonical(native)?;
		tracing::trace!(quantity, %unit_price, fee, "estimated fee");
		Ok(fee)
	}
}
