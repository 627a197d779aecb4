//! Configuration module for the ledger wallet.
//!
//! The configuration is read from a TOML file. `${VAR}` and `${VAR:-default}`
//! references are replaced with environment variables before parsing, so
//! private keys do not have to be written into the file itself. Every loaded
//! configuration is validated before it is handed out.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use wallet_types::{NetworkId, PartitionId, SecretString};

/// Smallest accepted distance between the latest round and an order timeout.
pub const MIN_TIMEOUT_ROUNDS: u64 = 10;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the whole input, which may contain keys.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the wallet.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub node: NodeConfig,
	pub network: NetworkConfig,
	pub accounts: AccountsConfig,
	#[serde(default)]
	pub confirmation: ConfirmationConfig,
	#[serde(default)]
	pub fees: FeesConfig,
}

/// Node the wallet talks to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
	/// Base URL of the node's REST API.
	pub rpc_url: String,
	#[serde(default = "default_request_timeout_seconds")]
	pub request_timeout_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
	10
}

/// Network and partition identifiers orders are built for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub network_id: NetworkId,
	#[serde(default = "default_evm_partition_id")]
	pub evm_partition_id: PartitionId,
	#[serde(default = "default_orchestration_partition_id")]
	pub orchestration_partition_id: PartitionId,
}

fn default_evm_partition_id() -> PartitionId {
	wallet_types::payloads::evm::DEFAULT_PARTITION_ID
}

fn default_orchestration_partition_id() -> PartitionId {
	wallet_types::payloads::orchestration::DEFAULT_PARTITION_ID
}

/// Signing keys, addressed by 1-based account number in the order given.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountsConfig {
	/// Hex encoded secp256k1 private keys.
	pub private_keys: Vec<SecretString>,
}

/// How long and how often to wait for a transaction outcome.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfirmationConfig {
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Rounds between the latest round and an order's timeout.
	#[serde(default = "default_timeout_rounds")]
	pub timeout_rounds: u64,
	/// Local wall clock limit on waiting, unlimited when absent.
	pub deadline_seconds: Option<u64>,
}

impl Default for ConfirmationConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: default_poll_interval_ms(),
			timeout_rounds: default_timeout_rounds(),
			deadline_seconds: None,
		}
	}
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_timeout_rounds() -> u64 {
	MIN_TIMEOUT_ROUNDS
}

/// Fee conversion settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeesConfig {
	/// Native units (wei) per canonical unit, as a decimal string.
	#[serde(default = "default_native_per_canonical")]
	pub native_per_canonical: String,
}

impl Default for FeesConfig {
	fn default() -> Self {
		Self {
			native_per_canonical: default_native_per_canonical(),
		}
	}
}

fn default_native_per_canonical() -> String {
	"10000000000".to_string()
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut replacements = Vec::new();
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};
		replacements.push((full_match.range(), value));
	}

	let mut result = input.to_string();
	for (range, value) in replacements.into_iter().rev() {
		result.replace_range(range, &value);
	}
	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.node.request_timeout_seconds)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.confirmation.poll_interval_ms)
	}

	pub fn deadline(&self) -> Option<Duration> {
		self.confirmation.deadline_seconds.map(Duration::from_secs)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let url = &self.node.rpc_url;
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"node.rpc_url must be an http(s) URL, got '{}'",
				url
			)));
		}
		if self.node.request_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"node.request_timeout_seconds must be greater than 0".into(),
			));
		}

		if self.network.evm_partition_id == 0 || self.network.orchestration_partition_id == 0 {
			return Err(ConfigError::Validation(
				"Partition ids must be greater than 0".into(),
			));
		}
		if self.network.evm_partition_id == self.network.orchestration_partition_id {
			return Err(ConfigError::Validation(format!(
				"EVM and orchestration partitions cannot share id {}",
				self.network.evm_partition_id
			)));
		}

		if self.accounts.private_keys.is_empty() {
			return Err(ConfigError::Validation(
				"At least one private key must be configured".into(),
			));
		}
		for (i, key) in self.accounts.private_keys.iter().enumerate() {
			let valid = key.decode_hex().is_ok_and(|bytes| bytes.len() == 32);
			if !valid {
				return Err(ConfigError::Validation(format!(
					"Private key of account {} must be 32 hex encoded bytes",
					i + 1
				)));
			}
		}

		if self.confirmation.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"confirmation.poll_interval_ms must be greater than 0".into(),
			));
		}
		if self.confirmation.timeout_rounds < MIN_TIMEOUT_ROUNDS {
			return Err(ConfigError::Validation(format!(
				"confirmation.timeout_rounds must be at least {}",
				MIN_TIMEOUT_ROUNDS
			)));
		}
		if self.confirmation.deadline_seconds == Some(0) {
			return Err(ConfigError::Validation(
				"confirmation.deadline_seconds must be greater than 0".into(),
			));
		}

		let factor = &self.fees.native_per_canonical;
		if factor.is_empty()
			|| !factor.bytes().all(|b| b.is_ascii_digit())
			|| factor.bytes().all(|b| b == b'0')
		{
			return Err(ConfigError::Validation(format!(
				"fees.native_per_canonical must be a positive integer, got '{}'",
				factor
			)));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
