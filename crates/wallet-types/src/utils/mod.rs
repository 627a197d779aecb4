//! Utility functions for display formatting and hex handling.

pub mod formatting;

pub use formatting::{format_amount, truncate_id, with_0x_prefix, without_0x_prefix};
