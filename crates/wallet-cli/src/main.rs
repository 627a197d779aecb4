//! Main entry point for the ledger wallet command line.
//!
//! Loads the configuration, wires the REST node client and the local key
//! store into the partition wallets and runs a single command. Ctrl-C stops
//! waiting for a submitted transaction without retracting it.

use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use wallet_config::Config;

mod commands;

/// Command-line arguments for the wallet.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "wallet.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::debug!(
		rpc_url = %config.node.rpc_url,
		network_id = config.network.network_id,
		"Loaded configuration"
	);

	let cancel = CancellationToken::new();
	let on_interrupt = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::warn!("Interrupted, no longer waiting for confirmation");
			on_interrupt.cancel();
		}
	});

	commands::run(&config, args.command, &cancel).await
}
