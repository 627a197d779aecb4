//! Consensus round information.

/// Current consensus height as reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundInfo {
	/// Latest round number produced by consensus.
	pub round_number: u64,
	/// Latest round the node's indexer has processed.
	pub last_indexed_round_number: u64,
}

impl RoundInfo {
	/// Round info for a node that indexes every round as it is produced.
	pub fn indexed(round_number: u64) -> Self {
		Self {
			round_number,
			last_indexed_round_number: round_number,
		}
	}

	/// Number of rounds the indexer lags behind consensus.
	pub fn indexer_lag(&self) -> u64 {
		self.round_number
			.saturating_sub(self.last_indexed_round_number)
	}
}
