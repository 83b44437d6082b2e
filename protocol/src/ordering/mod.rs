//! Ordering core: the round algebra, permutation oracle, connection
//! manager, per-peer ordering service, and the round state machine (gate)
//! that ties them together.

pub mod connection;
pub mod gate;
pub mod permutation;
pub mod round;
pub mod service;
pub mod types;

pub use connection::{ConnectionError, ConnectionManager, CurrentPeers, HashWindow};
pub use gate::{Gate, GateError, GateOutput, GateState, Presence, ProposalRequester, TxPresenceCache};
pub use permutation::PermutationOracle;
pub use round::{
    current_reject_consumer, next_commit_round, next_reject_round, NEXT_COMMIT_CONSUMER,
    NEXT_REJECT_CONSUMER,
};
pub use service::{AlwaysCreate, CreationStrategy, OrderingService, OrderingServiceError, ProposalOutcome};
pub use types::*;
