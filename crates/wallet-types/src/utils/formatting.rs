//! Display helpers for identifiers and amounts.

/// Number of decimal places of a canonical amount when shown to a user.
pub const CANONICAL_DECIMALS: u8 = 8;

/// Shortens a hex identifier to its first 8 characters for log lines.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((pos, _)) => format!("{}..", &id[..pos]),
		None => id.to_string(),
	}
}

/// Adds the `0x` prefix to a hex string unless it already has one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{hex_str}")
	}
}

/// Strips a leading `0x` or `0X` from a hex string.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders an integer amount with `decimals` fractional digits, dropping
/// trailing zeros.
///
/// `format_amount(150_000_000, 8)` yields `"1.5"`.
pub fn format_amount(amount: u128, decimals: u8) -> String {
	let digits = amount.to_string();
	if decimals == 0 {
		return digits;
	}
	let places = decimals as usize;
	let padded = format!("{digits:0>width$}", width = places + 1);
	let (whole, fraction) = padded.split_at(padded.len() - places);
	let fraction = fraction.trim_end_matches('0');
	if fraction.is_empty() {
		whole.to_string()
	} else {
		format!("{whole}.{fraction}")
	}
}
