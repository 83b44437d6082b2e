//! # Ordering/YAC Configuration & Constants
//!
//! Defaults for the ordering core. Everything that is consensus-relevant
//! lives in [`OrderingConfig`] — a plain struct with no I/O of its own,
//! built from these constants, CLI flags, or environment variables by the
//! binary. Nothing here reaches out to disk or the network.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ordering::types::BlockHash;

// ---------------------------------------------------------------------------
// Round / Ordering Parameters
// ---------------------------------------------------------------------------

/// Default cap on transactions per assembled proposal.
pub const DEFAULT_MAX_NUMBER_OF_TRANSACTIONS: u32 = 1_000;

/// Default proposal-request timeout. If the Issuer doesn't answer within
/// this window, the gate treats the round as empty and moves on.
pub const DEFAULT_PROPOSAL_DELAY: Duration = Duration::from_millis(3_000);

/// Minimum ledger peer count below which role bindings start to collapse
/// onto the same small set of peers. Still resolved, just logged.
pub const MIN_PEERS_FOR_DISTINCT_ROLES: usize = 5;

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// How long a gate's `AwaitingProposal` state may persist before the
/// request is considered abandoned for metrics purposes (the request
/// itself is still governed by `DEFAULT_PROPOSAL_DELAY`).
pub const GATE_STALL_WARNING: Duration = Duration::from_secs(10);

/// YAC vote-bundle send timeout. Sends past this are logged as transient
/// failures and not retried here.
pub const YAC_SEND_TIMEOUT: Duration = Duration::from_millis(1_500);

// ---------------------------------------------------------------------------
// Network Parameters (ambient — node binary only)
// ---------------------------------------------------------------------------

pub const DEFAULT_RPC_PORT: u16 = 9741;
pub const DEFAULT_METRICS_PORT: u16 = 9742;

/// Crate version string, for display in `nova-node version` and status
/// responses. Not consensus-relevant.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// OrderingConfig — in-core, consensus-relevant
// ---------------------------------------------------------------------------

/// The consensus-relevant configuration the ordering core is built from.
/// Distinct from the node binary's `AppConfig`, which also carries ambient
/// settings (bind addresses, log format) that have no bearing on consensus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingConfig {
    pub max_number_of_transactions: u32,
    pub delay: Duration,
    pub initial_hashes: [BlockHash; 2],
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            max_number_of_transactions: DEFAULT_MAX_NUMBER_OF_TRANSACTIONS,
            delay: DEFAULT_PROPOSAL_DELAY,
            initial_hashes: [BlockHash::zero(), BlockHash::zero()],
        }
    }
}

// The node-level `AppConfig` (RPC/metrics bind addresses, log format, data
// directory, dev-mode toggle) lives in `node/src/config.rs` — it wraps an
// `OrderingConfig` but is otherwise ambient, not consensus-relevant, and
// has no business being reachable from library code.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_config_default_is_sane() {
        let cfg = OrderingConfig::default();
        assert!(cfg.max_number_of_transactions > 0);
        assert!(cfg.delay > Duration::ZERO);
    }

    #[test]
    fn min_peers_threshold_matches_design_note() {
        assert_eq!(MIN_PEERS_FOR_DISTINCT_ROLES, 5);
    }
}
