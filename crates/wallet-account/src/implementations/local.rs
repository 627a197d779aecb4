//! In-memory key store backed by configured private keys.

use crate::{AccountError, AccountKey, KeyProvider};
use wallet_types::SecretString;

/// Key store holding the signing keys of a fixed list of accounts.
///
/// Account `n` is the `n`-th configured key.
#[derive(Debug, Clone, Default)]
pub struct LocalKeyStore {
	keys: Vec<AccountKey>,
}

impl LocalKeyStore {
	/// Parses hex encoded private keys, optionally `0x` prefixed.
	pub fn from_secrets(secrets: &[SecretString]) -> Result<Self, AccountError> {
		let keys = secrets
			.iter()
			.enumerate()
			.map(|(i, secret)| {
				let bytes = secret.decode_hex().map_err(|e| {
					AccountError::InvalidKey(format!("account {}: {}", i + 1, e))
				})?;
				AccountKey::from_bytes(&bytes)
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self { keys })
	}

	pub fn from_keys(keys: Vec<AccountKey>) -> Self {
		Self { keys }
	}
}

impl KeyProvider for LocalKeyStore {
	fn account_key(&self, account_number: u64) -> Result<AccountKey, AccountError> {
		if account_number == 0 {
			return Err(AccountError::InvalidAccountNumber(0));
		}
		usize::try_from(account_number - 1)
			.ok()
			.and_then(|index| self.keys.get(index))
			.cloned()
			.ok_or(AccountError::AccountNotFound(account_number))
	}
}
