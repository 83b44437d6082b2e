//! # Ordering Service
//!
//! Per-peer proposal assembler. Admits transaction batches, and on request
//! assembles a size-capped, FIFO-ordered proposal for a round — gated by a
//! `CreationStrategy` so that not every peer answers every request with a
//! fresh proposal.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::gate::{Presence, TxPresenceCache};
use super::types::{Proposal, Round, Tx, TxRef};

/// Decides whether this peer should bother assembling a proposal for a
/// given round. Reduces redundant proposal creation across the network —
/// most rounds only need one peer to actually do the work.
pub trait CreationStrategy: Send + Sync {
    fn should_create(&self, round: Round) -> bool;
    fn on_proposal(&self, round: Round);
}

/// Always creates a proposal when asked. Useful for tests and for the
/// issuer role, which is always expected to answer.
#[derive(Debug, Default)]
pub struct AlwaysCreate;

impl CreationStrategy for AlwaysCreate {
    fn should_create(&self, _round: Round) -> bool {
        true
    }

    fn on_proposal(&self, _round: Round) {}
}

/// Errors surfaced by the ordering service.
#[derive(Debug, thiserror::Error)]
pub enum OrderingServiceError {
    #[error("transaction hash {0} already committed or rejected")]
    AlreadyFinalized(String),
}

/// Outcome of a proposal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalOutcome {
    Proposal(Proposal),
    Empty,
}

struct State {
    /// Admitted batches not yet served in a proposal, FIFO by admission.
    pending: Vec<Tx>,
    /// Proposals already assembled, keyed by round, retained for re-requests.
    served: HashMap<Round, Proposal>,
}

/// Assembles proposals for a single peer's ordering responsibilities.
pub struct OrderingService<S: CreationStrategy = AlwaysCreate> {
    state: Mutex<State>,
    tx_presence: Arc<dyn TxPresenceCache>,
    max_number_of_transactions: usize,
    creation_strategy: S,
}

impl<S: CreationStrategy> OrderingService<S> {
    pub fn new(
        max_number_of_transactions: u32,
        creation_strategy: S,
        tx_presence: Arc<dyn TxPresenceCache>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                pending: Vec::new(),
                served: HashMap::new(),
            }),
            tx_presence,
            max_number_of_transactions: max_number_of_transactions as usize,
            creation_strategy,
        }
    }

    /// Admits a transaction batch. Duplicate-suppresses via the
    /// `TxPresenceCache`; rejects any transaction already committed or rejected.
    pub fn on_batch(&self, batch: Vec<Tx>) -> Result<(), OrderingServiceError> {
        for tx in &batch {
            if self.tx_presence.check(&tx.hash) != Presence::Unknown {
                return Err(OrderingServiceError::AlreadyFinalized(hex::encode(tx.hash)));
            }
        }
        self.state.lock().pending.extend(batch);
        Ok(())
    }

    /// Answers a proposal request for `round`.
    pub fn on_request_proposal(&self, round: Round) -> ProposalOutcome {
        let mut state = self.state.lock();

        if let Some(proposal) = state.served.get(&round) {
            return ProposalOutcome::Proposal(proposal.clone());
        }

        if !self.creation_strategy.should_create(round) || state.pending.is_empty() {
            return ProposalOutcome::Empty;
        }

        let mut ordered = std::mem::take(&mut state.pending);
        // FIFO by admission time, hash-ascending tie-break — consensus-critical.
        ordered.sort_by(|a, b| a.admitted_at.cmp(&b.admitted_at).then_with(|| a.hash.cmp(&b.hash)));

        let take = ordered.len().min(self.max_number_of_transactions);
        let (selected, remainder) = ordered.split_at(take);
        let transactions: Vec<TxRef> = selected.iter().map(TxRef::from).collect();
        state.pending = remainder.to_vec();

        let proposal = Proposal {
            transactions,
            round,
            created_time: chrono::Utc::now().timestamp(),
        };

        state.served.insert(round, proposal.clone());
        drop(state);
        self.creation_strategy.on_proposal(round);
        debug!(round = %round, "assembled proposal");
        ProposalOutcome::Proposal(proposal)
    }

    /// Evicts proposal and pending state strictly older than `round`.
    pub fn on_round_advance(&self, round: Round) {
        let mut state = self.state.lock();
        state.served.retain(|r, _| *r >= round);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(hash: u8) -> Tx {
        Tx::new([hash; 32], vec![hash])
    }

    #[derive(Default)]
    struct TrackedPresence {
        committed: std::sync::Mutex<std::collections::HashSet<[u8; 32]>>,
    }

    impl TrackedPresence {
        fn mark_committed(&self, hash: [u8; 32]) {
            self.committed.lock().unwrap().insert(hash);
        }
    }

    impl TxPresenceCache for TrackedPresence {
        fn check(&self, hash: &[u8; 32]) -> Presence {
            if self.committed.lock().unwrap().contains(hash) {
                Presence::Committed
            } else {
                Presence::Unknown
            }
        }

        fn evict(&self, hashes: &[[u8; 32]]) {
            let mut committed = self.committed.lock().unwrap();
            for h in hashes {
                committed.remove(h);
            }
        }
    }

    fn no_presence() -> Arc<dyn TxPresenceCache> {
        Arc::new(TrackedPresence::default())
    }

    #[test]
    fn empty_service_returns_empty_proposal() {
        let svc = OrderingService::new(10, AlwaysCreate, no_presence());
        assert_eq!(svc.on_request_proposal(Round::new(1, 0)), ProposalOutcome::Empty);
    }

    #[test]
    fn admitted_batch_is_assembled_fifo() {
        let svc = OrderingService::new(10, AlwaysCreate, no_presence());
        svc.on_batch(vec![tx(3), tx(1), tx(2)]).unwrap();
        let outcome = svc.on_request_proposal(Round::new(1, 0));
        match outcome {
            ProposalOutcome::Proposal(p) => {
                let hashes: Vec<u8> = p.transactions.iter().map(|t| t.hash[0]).collect();
                assert_eq!(hashes, vec![3, 1, 2]);
            }
            ProposalOutcome::Empty => panic!("expected a proposal"),
        }
    }

    #[test]
    fn repeated_request_returns_cached_proposal() {
        let svc = OrderingService::new(10, AlwaysCreate, no_presence());
        svc.on_batch(vec![tx(1)]).unwrap();
        let first = svc.on_request_proposal(Round::new(1, 0));
        let second = svc.on_request_proposal(Round::new(1, 0));
        assert_eq!(first, second);
    }

    #[test]
    fn proposal_is_capped_at_max_transactions() {
        let svc = OrderingService::new(2, AlwaysCreate, no_presence());
        svc.on_batch(vec![tx(1), tx(2), tx(3)]).unwrap();
        match svc.on_request_proposal(Round::new(1, 0)) {
            ProposalOutcome::Proposal(p) => assert_eq!(p.transactions.len(), 2),
            ProposalOutcome::Empty => panic!("expected a proposal"),
        }
    }

    #[test]
    fn leftover_transactions_carry_to_next_round() {
        let svc = OrderingService::new(2, AlwaysCreate, no_presence());
        svc.on_batch(vec![tx(1), tx(2), tx(3)]).unwrap();
        svc.on_request_proposal(Round::new(1, 0));
        match svc.on_request_proposal(Round::new(2, 0)) {
            ProposalOutcome::Proposal(p) => assert_eq!(p.transactions.len(), 1),
            ProposalOutcome::Empty => panic!("expected a proposal for the leftover tx"),
        }
    }

    struct NeverCreate;
    impl CreationStrategy for NeverCreate {
        fn should_create(&self, _round: Round) -> bool {
            false
        }
        fn on_proposal(&self, _round: Round) {}
    }

    #[test]
    fn creation_strategy_can_suppress_proposal_creation() {
        let svc = OrderingService::new(10, NeverCreate, no_presence());
        svc.on_batch(vec![tx(1)]).unwrap();
        assert_eq!(svc.on_request_proposal(Round::new(1, 0)), ProposalOutcome::Empty);
    }

    #[test]
    fn committed_hash_is_refused_on_admission() {
        let presence = Arc::new(TrackedPresence::default());
        presence.mark_committed([9u8; 32]);
        let svc = OrderingService::new(10, AlwaysCreate, presence);
        let err = svc.on_batch(vec![Tx::new([9u8; 32], vec![])]).unwrap_err();
        assert!(matches!(err, OrderingServiceError::AlreadyFinalized(_)));
    }

    #[test]
    fn round_advance_evicts_stale_proposals() {
        let svc = OrderingService::new(10, AlwaysCreate, no_presence());
        svc.on_batch(vec![tx(1)]).unwrap();
        svc.on_request_proposal(Round::new(1, 0));
        svc.on_round_advance(Round::new(2, 0));
        // Stale round's cached proposal is gone; re-requesting with no pending
        // transactions and AlwaysCreate still yields nothing to assemble.
        assert_eq!(svc.on_request_proposal(Round::new(1, 0)), ProposalOutcome::Empty);
    }
}
