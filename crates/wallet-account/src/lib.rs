//! Account key management for the ledger wallet.
//!
//! This module provides the key material provider the transaction builder is
//! handed explicitly: a [`KeyProvider`] resolves 1-based account numbers to
//! [`AccountKey`]s, and an [`AccountKey`] produces owner proofs over canonical
//! signing bytes.

use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub use implementations::local::LocalKeyStore;

/// Length of a recoverable secp256k1 signature `[R || S || V]`.
pub const SIGNATURE_LEN: usize = 65;

/// Length of a compressed secp256k1 public key.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// No key is stored under the requested account number.
	#[error("account does not exist")]
	AccountNotFound(u64),
	/// Account numbers start at 1.
	#[error("invalid account number: {0}")]
	InvalidAccountNumber(u64),
	/// Key material is malformed.
	#[error("invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when signing operations fail.
	#[error("signing failed: {0}")]
	SigningFailed(String),
}

/// Provides signing keys by account number.
///
/// Implementations must be safe to share between concurrently running
/// transaction flows. Serializing submissions that share a key, and with it
/// the account nonce, is the caller's responsibility.
pub trait KeyProvider: Send + Sync {
	/// Returns the key of a 1-based account number.
	fn account_key(&self, account_number: u64) -> Result<AccountKey, AccountError>;
}

/// A secp256k1 signing key of a wallet account.
#[derive(Clone)]
pub struct AccountKey {
	signer: PrivateKeySigner,
}

impl AccountKey {
	pub fn new(signer: PrivateKeySigner) -> Self {
		Self { signer }
	}

	/// Creates a key from raw 32 byte private key material.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, AccountError> {
		PrivateKeySigner::from_slice(bytes)
			.map(Self::new)
			.map_err(|e| AccountError::InvalidKey(e.to_string()))
	}

	/// EVM address derived from the public key.
	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// Compressed SEC1 public key.
	pub fn public_key(&self) -> Vec<u8> {
		self.signer
			.credential()
			.verifying_key()
			.to_encoded_point(true)
			.as_bytes()
			.to_vec()
	}

	/// Signs the SHA-256 digest of `message`.
	///
	/// The recovery byte is normalized to 0 or 1.
	pub fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN], AccountError> {
		let digest = B256::from_slice(&Sha256::digest(message));
		let signature = self
			.signer
			.sign_hash_sync(&digest)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		let mut bytes = signature.as_bytes();
		if bytes[64] >= 27 {
			bytes[64] -= 27;
		}
		Ok(bytes)
	}

	/// Owner proof over canonical signing bytes: CBOR `[signature, publicKey]`.
	pub fn owner_proof(&self, signing_bytes: &[u8]) -> Result<Vec<u8>, AccountError> {
		let signature = self.sign(signing_bytes)?;
		let mut e = minicbor::Encoder::new(Vec::new());
		e.array(2)
			.and_then(|e| e.bytes(&signature))
			.and_then(|e| e.bytes(&self.public_key()))
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(e.into_writer())
	}
}

impl std::fmt::Debug for AccountKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AccountKey")
			.field("address", &self.address())
			.finish_non_exhaustive()
	}
}
