//! # Node Configuration
//!
//! Assembles the ambient, non-consensus-relevant configuration the binary
//! needs to boot: bind addresses, data directory, log format, and the
//! in-core [`OrderingConfig`] it wraps. Everything here is built once in
//! `main()` from CLI flags and environment variables (`clap`'s `env`
//! feature already layers those for us) and handed down as a plain value —
//! no global state, no re-reading from disk mid-run.

use std::net::SocketAddr;
use std::path::PathBuf;

use nova_protocol::config::OrderingConfig;

use crate::cli::RunArgs;
use crate::logging::LogFormat;

/// Full configuration for one running node.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address for the status/JSON API.
    pub rpc_bind: SocketAddr,
    /// Bind address for the Prometheus `/metrics` endpoint.
    pub metrics_bind: SocketAddr,
    /// Directory holding the hash-log database and the validator key.
    pub data_dir: PathBuf,
    /// `tracing` output format.
    pub log_format: LogFormat,
    /// Default `RUST_LOG` filter when the environment variable is unset.
    pub log_level: String,
    /// Ephemeral in-memory storage, single self-dialed peer, no persistence.
    pub dev_mode: bool,
    /// Consensus-relevant knobs consumed by the ordering core.
    pub ordering: OrderingConfig,
}

impl AppConfig {
    /// Builds an [`AppConfig`] from parsed `run` subcommand arguments.
    ///
    /// `args.config` is accepted for forward compatibility with a future
    /// file-backed layer but is not read yet — everything is sourced from
    /// CLI flags and environment variables.
    pub fn from_run_args(args: &RunArgs) -> Self {
        if let Some(path) = &args.config {
            tracing::warn!(
                path = %path.display(),
                "config file support is not implemented yet; ignoring --config"
            );
        }

        let data_dir = resolve_data_dir(&args.data_dir);

        let mut ordering = OrderingConfig::default();
        if let Some(max) = args.max_number_of_transactions {
            ordering.max_number_of_transactions = max;
        }

        Self {
            rpc_bind: SocketAddr::from(([0, 0, 0, 0], args.rpc_port)),
            metrics_bind: SocketAddr::from(([0, 0, 0, 0], args.metrics_port)),
            data_dir,
            log_format: LogFormat::Pretty,
            log_level: default_log_level(args.dev),
            dev_mode: args.dev,
            ordering,
        }
    }
}

/// Expands a leading `~` to the user's home directory. Falls back to the
/// path unmodified if `HOME` isn't set (e.g. some container environments).
pub fn resolve_data_dir(path: &std::path::Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn default_log_level(dev: bool) -> String {
    if dev {
        "nova_node=debug,nova_protocol=debug".to_string()
    } else {
        "nova_node=info,nova_protocol=info".to_string()
    }
}
