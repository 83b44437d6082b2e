//! # CLI Interface
//!
//! Defines the command-line argument structure for `nova-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NOVA ordering/YAC validator node.
///
/// Runs the round algebra, permutation oracle, connection manager,
/// ordering service, gate, and YAC voting transport for one validator.
#[derive(Parser, Debug)]
#[command(
    name = "nova-node",
    about = "NOVA ordering/YAC validator node",
    version,
    propagate_version = true
)]
pub struct NovaNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the NOVA node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the validator node.
    Run(RunArgs),
    /// Initialize a new node — creates the data directory and generates
    /// a fresh validator keypair.
    Init(InitArgs),
    /// Query the status of a running node via its RPC endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to a node configuration file.
    ///
    /// Reserved for a future file-backed configuration layer; CLI flags and
    /// environment variables are the only source consulted today.
    #[arg(long, short = 'c', env = "NOVA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the node data directory where the hash-log and validator
    /// keypair are stored.
    #[arg(long, short = 'd', env = "NOVA_DATA_DIR", default_value = "~/.nova")]
    pub data_dir: PathBuf,

    /// Port for the status/JSON API.
    #[arg(long, env = "NOVA_RPC_PORT", default_value_t = 9741)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "NOVA_METRICS_PORT", default_value_t = 9742)]
    pub metrics_port: u16,

    /// Maximum number of transactions per assembled proposal.
    #[arg(long, env = "NOVA_MAX_TXS_PER_PROPOSAL")]
    pub max_number_of_transactions: Option<u32>,

    /// Hex-encoded Ed25519 validator private key.
    ///
    /// If not provided, the node reads the key from the data directory.
    /// **Never pass this flag in production** — use a key file instead.
    #[arg(long, env = "NOVA_VALIDATOR_KEY")]
    pub validator_key: Option<String>,

    /// Run in development mode: ephemeral in-memory storage, a single
    /// self-dialed peer, `AlwaysCreate` proposal strategy.
    #[arg(long)]
    pub dev: bool,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "NOVA_DATA_DIR", default_value = "~/.nova")]
    pub data_dir: PathBuf,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// RPC endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9741")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        NovaNodeCli::command().debug_assert();
    }
}
