//! # Local Transport Seams
//!
//! In-process implementations of the ordering core's external collaborator
//! traits (`ProposalRequester`, `VoteSender`, `TxPresenceCache`). Wired up
//! when no separate network layer is configured — today, that's every mode
//! this binary supports: a single self-dialed peer answers its own proposal
//! requests, and vote sends are logged rather than dispatched over a wire.
//!
//! Swapping these for real network-backed implementations (gRPC, QUIC,
//! whatever the transport layer ends up being) does not require touching
//! `nova-protocol` — that's the point of the trait seam.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use nova_protocol::ordering::{
    AlwaysCreate, OrderingService, Peer, Presence, Proposal, ProposalOutcome, ProposalRequester,
    Round, TxPresenceCache, VoteMessage,
};
use nova_protocol::yac::{VoteSender, YacError};

/// Answers proposal requests from this node's own `OrderingService`,
/// ignoring which peer was addressed. Correct for a single-node deployment;
/// a real network layer would dial the addressed peer instead.
pub struct LoopbackRequester {
    ordering: Arc<OrderingService<AlwaysCreate>>,
}

impl LoopbackRequester {
    pub fn new(ordering: Arc<OrderingService<AlwaysCreate>>) -> Self {
        Self { ordering }
    }
}

#[async_trait]
impl ProposalRequester for LoopbackRequester {
    async fn request_proposal(&self, _peer: &Peer, round: Round) -> Option<Proposal> {
        match self.ordering.on_request_proposal(round) {
            ProposalOutcome::Proposal(p) => Some(p),
            ProposalOutcome::Empty => Some(Proposal::empty(round)),
        }
    }
}

/// `TxPresenceCache` backed by an in-memory set. Sufficient until this
/// binary gains a real ledger to query.
#[derive(Default)]
pub struct InMemoryPresence {
    committed: Mutex<HashSet<[u8; 32]>>,
}

impl TxPresenceCache for InMemoryPresence {
    fn check(&self, hash: &[u8; 32]) -> Presence {
        if self.committed.lock().contains(hash) {
            Presence::Committed
        } else {
            Presence::Unknown
        }
    }

    fn evict(&self, hashes: &[[u8; 32]]) {
        let mut committed = self.committed.lock();
        for h in hashes {
            committed.remove(h);
        }
    }
}

impl InMemoryPresence {
    /// Records hashes as committed, so subsequent `check` calls see them
    /// and the gate filters them out of future proposals.
    pub fn mark_committed(&self, hashes: impl IntoIterator<Item = [u8; 32]>) {
        self.committed.lock().extend(hashes);
    }
}

/// Logs vote sends instead of dispatching them over a wire. A real
/// deployment swaps this for the network layer's sender.
pub struct LoggingVoteSender;

#[async_trait]
impl VoteSender for LoggingVoteSender {
    async fn send(&self, peer: &Peer, votes: &[VoteMessage]) -> Result<(), YacError> {
        tracing::debug!(peer = %peer.address, count = votes.len(), "send_state (loopback, no network layer configured)");
        Ok(())
    }
}
