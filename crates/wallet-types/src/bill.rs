//! Fee credit bill representation.

use crate::unit::UnitId;

/// On-chain balance earmarked for paying transaction fees.
///
/// A missing bill is a valid state meaning zero balance, so lookups return
/// `Option<FeeCreditBill>` rather than failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeCreditBill {
	pub id: UnitId,
	/// Balance in canonical units.
	pub value: u64,
	/// Monotonic counter preventing replay of fee credit transactions.
	pub counter: u64,
}
