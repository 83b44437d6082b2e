//! # Round Algebra
//!
//! Pure functions over [`Round`](super::types::Round). No state, no I/O —
//! these are the two directions a round can advance, plus the offsets that
//! encode which future round a pre-forwarded transaction belongs to.

use super::types::Round;

/// Offset of the peer pre-seeded for the next round if it commits.
pub const NEXT_COMMIT_CONSUMER: u32 = 0;
/// Offset of the peer pre-seeded for the next round if it rejects.
pub const NEXT_REJECT_CONSUMER: u32 = 1;

/// The round that follows a commit: block round advances, reject round resets.
pub fn next_commit_round(r: Round) -> Round {
    Round::new(r.block_round + 1, 0)
}

/// The round that follows a reject (or a "nothing" outcome): reject round
/// advances, block round holds.
pub fn next_reject_round(r: Round) -> Round {
    Round::new(r.block_round, r.reject_round + 1)
}

/// The permutation-index offset of the peer that will serve as
/// `RejectRejectConsumer` for the current round.
pub fn current_reject_consumer(reject_round: u32) -> u32 {
    reject_round + 1
}
