//! Wallet subcommands.

use alloy_primitives::{Address, U256};
use clap::{Args, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wallet_account::LocalKeyStore;
use wallet_config::Config;
use wallet_core::{EvmTxRequest, EvmTxResult, EvmWallet, OrchestrationWallet, PartitionSettings};
use wallet_delivery::{ConfirmationOutcome, PollConfig};
use wallet_fees::{parse_native_amount, FeeCalculator, FeeError};
use wallet_rpc::RestClient;
use wallet_types::payloads::evm::EvmProcessingDetails;
use wallet_types::payloads::orchestration::ValidatorAssignmentRecord;
use wallet_types::utils::formatting::CANONICAL_DECIMALS;
use wallet_types::{format_amount, with_0x_prefix, without_0x_prefix, PartitionId, ShardId};

/// Gas limit of a read-only call when none is given.
const DEFAULT_CALL_GAS: u64 = 50_000_000;

/// Max fee of an orchestration transaction when none is given.
const DEFAULT_MAX_FEE: u64 = 10;

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Tools to manage the orchestration partition
	#[command(subcommand)]
	Orchestration(OrchestrationCommand),
	/// Tools to interact with the EVM partition
	#[command(subcommand)]
	Evm(EvmCommand),
}

#[derive(Subcommand, Debug)]
pub enum OrchestrationCommand {
	/// Adds a validator assignment record
	AddVar {
		/// Partition identifier of the managed partition
		#[arg(long)]
		partition_id: PartitionId,
		/// Shard of the managed partition as a bit string, empty for a single shard
		#[arg(long, default_value = "")]
		shard_id: ShardId,
		/// Path to the validator assignment record JSON file
		#[arg(long)]
		var_file: PathBuf,
		#[arg(long, default_value_t = DEFAULT_MAX_FEE)]
		max_fee: u64,
		/// Account number of the proof-of-authority key
		#[arg(short, long, default_value_t = 1)]
		key: u64,
	},
}

#[derive(Subcommand, Debug)]
pub enum EvmCommand {
	/// Shows the fee credit balance of an account
	Balance {
		#[arg(short, long, default_value_t = 1)]
		key: u64,
	},
	/// Executes a call without changing state
	Call {
		#[arg(long, value_parser = parse_address)]
		to: Address,
		#[command(flatten)]
		call: CallArgs,
		#[arg(long, default_value_t = DEFAULT_CALL_GAS)]
		gas: u64,
		#[arg(short, long, default_value_t = 1)]
		key: u64,
	},
	/// Sends a transaction, deploying `--data` when `--to` is omitted
	Send {
		#[arg(long, value_parser = parse_address)]
		to: Option<Address>,
		#[command(flatten)]
		call: CallArgs,
		#[arg(long)]
		gas: u64,
		/// Fee limit in canonical units, defaults to the estimated fee
		#[arg(long)]
		max_fee: Option<u64>,
		#[arg(short, long, default_value_t = 1)]
		key: u64,
	},
}

#[derive(Args, Debug)]
pub struct CallArgs {
	/// Hex encoded call data
	#[arg(long, default_value = "")]
	data: HexData,
	/// Value to transfer in wei
	#[arg(long, value_parser = parse_native_amount, default_value = "0")]
	value: U256,
}

fn parse_address(s: &str) -> Result<Address, String> {
	s.parse::<Address>()
		.map_err(|e| format!("invalid address {s:?}: {e}"))
}

/// Bytes given as hex on the command line, with or without `0x`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexData(Vec<u8>);

impl FromStr for HexData {
	type Err = hex::FromHexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		hex::decode(without_0x_prefix(s)).map(Self)
	}
}

fn partition_settings(config: &Config, partition_id: PartitionId) -> PartitionSettings {
	PartitionSettings {
		network_id: config.network.network_id,
		partition_id,
		poll: PollConfig {
			interval: config.poll_interval(),
			deadline: config.deadline(),
		},
		timeout_rounds: config.confirmation.timeout_rounds,
	}
}

fn fee_calculator(config: &Config) -> Result<FeeCalculator, FeeError> {
	FeeCalculator::new(parse_native_amount(&config.fees.native_per_canonical)?)
}

fn load_var(path: &Path) -> Result<ValidatorAssignmentRecord, Box<dyn Error>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| format!("failed to load var file {}: {e}", path.display()))?;
	serde_json::from_str(&content)
		.map_err(|e| format!("failed to parse var file {}: {e}", path.display()).into())
}

/// Runs a command against the configured node.
pub async fn run(
	config: &Config,
	command: Command,
	cancel: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
	let keys = Arc::new(LocalKeyStore::from_secrets(&config.accounts.private_keys)?);
	let client = Arc::new(RestClient::new(
		&config.node.rpc_url,
		config.request_timeout(),
	)?);

	match command {
		Command::Orchestration(OrchestrationCommand::AddVar {
			partition_id,
			shard_id,
			var_file,
			max_fee,
			key,
		}) => {
			let var = load_var(&var_file)?;
			let wallet = OrchestrationWallet::new(
				client,
				keys,
				partition_settings(config, config.network.orchestration_partition_id),
			);
			let outcome = wallet
				.add_var(partition_id, &shard_id, var, max_fee, key, cancel)
				.await?;
			require_confirmed(&outcome)?;
			println!("Validator Assignment Record added successfully.");
		},
		Command::Evm(command) => {
			let wallet = EvmWallet::new(
				client,
				keys,
				partition_settings(config, config.network.evm_partition_id),
				fee_calculator(config)?,
			);
			run_evm(&wallet, command, cancel).await?;
		},
	}
	Ok(())
}

async fn run_evm(
	wallet: &EvmWallet<RestClient>,
	command: EvmCommand,
	cancel: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
	match command {
		EvmCommand::Balance { key } => {
			let value = wallet.get_balance(key).await?.map_or(0, |bill| bill.value);
			println!(
				"#{} {}",
				key,
				format_amount(u128::from(value), CANONICAL_DECIMALS)
			);
		},
		EvmCommand::Call {
			to,
			call,
			gas,
			key,
		} => {
			let request = EvmTxRequest {
				to: Some(to),
				data: call.data.0,
				value: call.value,
				gas,
				max_fee: None,
			};
			let details = wallet.evm_call(key, &request).await?;
			print_details(&details);
			if let Some(error) = details.error() {
				return Err(format!("evm call failed: {error}").into());
			}
		},
		EvmCommand::Send {
			to,
			call,
			gas,
			max_fee,
			key,
		} => {
			let request = EvmTxRequest {
				to,
				data: call.data.0,
				value: call.value,
				gas,
				max_fee,
			};
			let result = wallet.send_evm_tx(key, &request, cancel).await?;
			report_evm_result(&result)?;
		},
	}
	Ok(())
}

fn report_evm_result(result: &EvmTxResult) -> Result<(), Box<dyn Error>> {
	require_confirmed(&result.outcome)?;
	if let Some(fee) = result.actual_fee() {
		println!(
			"Fee: {}",
			format_amount(u128::from(fee), CANONICAL_DECIMALS)
		);
	}
	if let Some(details) = &result.details {
		print_details(details);
		if let Some(error) = details.error() {
			return Err(format!("evm transaction failed: {error}").into());
		}
	}
	println!("Evm transaction processed successfully.");
	Ok(())
}

fn print_details(details: &EvmProcessingDetails) {
	if let Some(address) = details.contract_addr {
		println!("Deployed contract address: {address}");
	}
	if !details.return_data.is_empty() {
		println!(
			"Return data: {}",
			with_0x_prefix(&hex::encode(&details.return_data))
		);
	}
	for log in &details.logs {
		println!(
			"Log: address {} topics {} data {}",
			log.address,
			log.topics.len(),
			with_0x_prefix(&hex::encode(&log.data))
		);
	}
}

/// Turns every outcome but a successful inclusion into an error.
fn require_confirmed(outcome: &ConfirmationOutcome) -> Result<(), Box<dyn Error>> {
	match outcome {
		ConfirmationOutcome::Confirmed { .. } => Ok(()),
		ConfirmationOutcome::ExecutionFailed { proof } => Err(format!(
			"transaction failed: {}",
			String::from_utf8_lossy(&proof.server_metadata().processing_details)
		)
		.into()),
		ConfirmationOutcome::TimedOut {
			tx_hash, timeout, ..
		} => Err(format!(
			"transaction {tx_hash} not confirmed before timeout round {timeout}"
		)
		.into()),
		ConfirmationOutcome::Aborted { tx_hash, .. } => Err(format!(
			"stopped waiting for transaction {tx_hash}, it may still be included"
		)
		.into()),
	}
}
