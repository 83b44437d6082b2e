//! # Connection Manager
//!
//! On every synchronization event, resolves the five role-tagged peers this
//! node must talk to for the round that follows, and exposes that binding
//! atomically to the request path.
//!
//! `CurrentPeers` is a read-optimized shared cell: one writer (the
//! synchronization-event consumer), many readers (request dispatch). Each
//! update replaces the whole value — partial updates are forbidden, per the
//! design notes on `CurrentPeers` ownership.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::permutation::PermutationOracle;
use super::round::{current_reject_consumer, next_commit_round, next_reject_round};
use super::types::{BlockHash, LedgerState, Peer, Role, Round, SyncOutcome, SynchronizationEvent};

/// The five role→peer bindings resolved for the round that follows a
/// synchronization event.
#[derive(Debug, Clone)]
pub struct CurrentPeers {
    pub round: Round,
    issuer: Peer,
    reject_reject: Peer,
    commit_reject: Peer,
    reject_commit: Peer,
    commit_commit: Peer,
}

impl CurrentPeers {
    pub fn get(&self, role: Role) -> &Peer {
        match role {
            Role::Issuer => &self.issuer,
            Role::RejectRejectConsumer => &self.reject_reject,
            Role::CommitRejectConsumer => &self.commit_reject,
            Role::RejectCommitConsumer => &self.reject_commit,
            Role::CommitCommitConsumer => &self.commit_commit,
        }
    }
}

/// Errors that can occur while resolving or reading peer bindings.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("ledger_peers is empty; cannot derive a binding")]
    EmptyLedgerPeers,
    #[error("hash window is not primed yet (need at least 2 hashes)")]
    NotPrimed,
    #[error("unknown sync outcome")]
    UnknownOutcome,
}

/// Sliding window of the three most recent committed-block hashes, primed
/// at startup by two `initial_hashes` and extended by the committed-block
/// stream. See design notes: "Initial hashes".
#[derive(Debug, Clone)]
pub struct HashWindow {
    history: Vec<BlockHash>,
}

impl HashWindow {
    /// Primes the window with the genesis and pre-genesis hashes.
    pub fn new(initial_hashes: [BlockHash; 2]) -> Self {
        Self {
            history: vec![initial_hashes[0], initial_hashes[1]],
        }
    }

    /// Appends the hash of a newly committed block.
    pub fn push_committed(&mut self, hash: BlockHash) {
        self.history.push(hash);
    }

    /// Returns the three most recent hashes in commit order (oldest first),
    /// padding with a repeat of the most recent hash if fewer than three
    /// real commits have happened yet.
    pub fn current(&self) -> Result<[BlockHash; 3], ConnectionError> {
        let len = self.history.len();
        if len < 2 {
            return Err(ConnectionError::NotPrimed);
        }
        if len >= 3 {
            Ok([
                self.history[len - 3],
                self.history[len - 2],
                self.history[len - 1],
            ])
        } else {
            let last = self.history[len - 1];
            Ok([self.history[0], last, last])
        }
    }
}

/// Resolves, for each synchronization event, the five role-tagged peers
/// this node must talk to, and publishes the result behind a shared cell.
pub struct ConnectionManager {
    oracle: PermutationOracle,
    window: RwLock<HashWindow>,
    current: RwLock<Option<Arc<CurrentPeers>>>,
}

impl ConnectionManager {
    pub fn new(initial_hashes: [BlockHash; 2]) -> Self {
        Self {
            oracle: PermutationOracle::new(),
            window: RwLock::new(HashWindow::new(initial_hashes)),
            current: RwLock::new(None),
        }
    }

    /// Records a newly committed block's hash, advancing the sliding window.
    pub fn on_committed_block(&self, hash: BlockHash) {
        self.window.write().push_committed(hash);
    }

    /// Returns a snapshot of the current role bindings, if any have been
    /// resolved yet.
    pub fn current_peers(&self) -> Option<Arc<CurrentPeers>> {
        self.current.read().clone()
    }

    /// Executes the Connection Manager algorithm for an incoming
    /// synchronization event and publishes the resulting bindings.
    ///
    /// Returns the round the bindings were computed for.
    pub fn on_synchronization_event(
        &self,
        event: &SynchronizationEvent,
    ) -> Result<Round, ConnectionError> {
        let ledger_peers = &event.ledger_state.ledger_peers;
        let n = ledger_peers.len();
        if n == 0 {
            return Err(ConnectionError::EmptyLedgerPeers);
        }
        if n < 5 {
            warn!(
                peer_count = n,
                "ledger_peers has fewer than 5 peers; role bindings will collapse onto the same peers"
            );
        }

        let hashes = self.window.read().current()?;
        let [h0, h1, h2] = hashes;
        let [p0, p1, p2] = self.oracle.permute_window([&h0, &h1, &h2], n);

        let current = match event.sync_outcome {
            SyncOutcome::Commit => next_commit_round(event.round),
            // Nothing is handled exactly like Reject: neither produced a block.
            SyncOutcome::Reject | SyncOutcome::Nothing => next_reject_round(event.round),
        };

        let issuer_idx = p0[(current.reject_round as usize) % n];
        let reject_reject_idx =
            p0[(current_reject_consumer(current.reject_round) as usize) % n];
        let reject_commit_idx = p1[super::round::NEXT_COMMIT_CONSUMER as usize % n];
        let commit_reject_idx = p1[super::round::NEXT_REJECT_CONSUMER as usize % n];
        let commit_commit_idx = p2[super::round::NEXT_COMMIT_CONSUMER as usize % n];

        let bindings = CurrentPeers {
            round: current,
            issuer: ledger_peers[issuer_idx].clone(),
            reject_reject: ledger_peers[reject_reject_idx].clone(),
            commit_reject: ledger_peers[commit_reject_idx].clone(),
            reject_commit: ledger_peers[reject_commit_idx].clone(),
            commit_commit: ledger_peers[commit_commit_idx].clone(),
        };

        *self.current.write() = Some(Arc::new(bindings));
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::NovaKeypair;

    fn peers(n: usize) -> LedgerState {
        let peers = (0..n)
            .map(|i| Peer::new(format!("peer-{i}"), NovaKeypair::from_seed(&[i as u8; 32]).public_key()))
            .collect();
        LedgerState::new(peers)
    }

    fn hash(b: u8) -> BlockHash {
        BlockHash([b; 32])
    }

    #[test]
    fn hash_window_pads_before_first_commit() {
        let window = HashWindow::new([hash(1), hash(2)]);
        let [h0, h1, h2] = window.current().unwrap();
        assert_eq!(h0, hash(1));
        assert_eq!(h1, hash(2));
        assert_eq!(h2, hash(2));
    }

    #[test]
    fn hash_window_slides_after_real_commits() {
        let mut window = HashWindow::new([hash(1), hash(2)]);
        window.push_committed(hash(3));
        assert_eq!(window.current().unwrap(), [hash(1), hash(2), hash(3)]);

        window.push_committed(hash(4));
        assert_eq!(window.current().unwrap(), [hash(2), hash(3), hash(4)]);
    }

    #[test]
    fn empty_ledger_peers_is_refused() {
        let mgr = ConnectionManager::new([hash(1), hash(2)]);
        let event = SynchronizationEvent {
            round: Round::new(10, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: LedgerState::new(vec![]),
        };
        assert!(matches!(
            mgr.on_synchronization_event(&event),
            Err(ConnectionError::EmptyLedgerPeers)
        ));
        assert!(mgr.current_peers().is_none());
    }

    #[test]
    fn commit_advances_to_next_commit_round() {
        let mgr = ConnectionManager::new([hash(1), hash(2)]);
        let event = SynchronizationEvent {
            round: Round::new(10, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(5),
        };
        let round = mgr.on_synchronization_event(&event).unwrap();
        assert_eq!(round, Round::new(11, 0));
        assert!(mgr.current_peers().is_some());
    }

    #[test]
    fn reject_advances_reject_round() {
        let mgr = ConnectionManager::new([hash(1), hash(2)]);
        let event = SynchronizationEvent {
            round: Round::new(10, 3),
            sync_outcome: SyncOutcome::Reject,
            ledger_state: peers(5),
        };
        let round = mgr.on_synchronization_event(&event).unwrap();
        assert_eq!(round, Round::new(10, 4));
    }

    #[test]
    fn nothing_outcome_behaves_like_reject() {
        let mgr_reject = ConnectionManager::new([hash(1), hash(2)]);
        let mgr_nothing = ConnectionManager::new([hash(1), hash(2)]);
        let ledger = peers(5);

        let event_reject = SynchronizationEvent {
            round: Round::new(10, 3),
            sync_outcome: SyncOutcome::Reject,
            ledger_state: ledger.clone(),
        };
        let event_nothing = SynchronizationEvent {
            round: Round::new(10, 3),
            sync_outcome: SyncOutcome::Nothing,
            ledger_state: ledger,
        };

        let r1 = mgr_reject.on_synchronization_event(&event_reject).unwrap();
        let r2 = mgr_nothing.on_synchronization_event(&event_nothing).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(
            mgr_reject.current_peers().unwrap().get(Role::Issuer),
            mgr_nothing.current_peers().unwrap().get(Role::Issuer)
        );
    }

    #[test]
    fn roles_are_pairwise_distinct_with_enough_peers() {
        let mgr = ConnectionManager::new([hash(1), hash(2)]);
        let event = SynchronizationEvent {
            round: Round::new(0, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(64),
        };
        mgr.on_synchronization_event(&event).unwrap();
        let bindings = mgr.current_peers().unwrap();

        let mut addresses: Vec<&str> = [
            Role::Issuer,
            Role::RejectRejectConsumer,
            Role::CommitRejectConsumer,
            Role::RejectCommitConsumer,
            Role::CommitCommitConsumer,
        ]
        .iter()
        .map(|r| bindings.get(*r).address.as_str())
        .collect();
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), 5, "expected five distinct peers with N=64");
    }

    #[test]
    fn small_cluster_logs_warning_but_still_resolves() {
        let mgr = ConnectionManager::new([hash(1), hash(2)]);
        let event = SynchronizationEvent {
            round: Round::new(0, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(2),
        };
        // Must not panic or error even though N < 5 collapses some roles.
        assert!(mgr.on_synchronization_event(&event).is_ok());
    }

    #[test]
    fn all_non_byzantine_nodes_derive_the_same_bindings() {
        let mgr_a = ConnectionManager::new([hash(1), hash(2)]);
        let mgr_b = ConnectionManager::new([hash(1), hash(2)]);
        let ledger = peers(8);

        let event = SynchronizationEvent {
            round: Round::new(3, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: ledger,
        };

        mgr_a.on_synchronization_event(&event).unwrap();
        mgr_b.on_synchronization_event(&event).unwrap();

        let a = mgr_a.current_peers().unwrap();
        let b = mgr_b.current_peers().unwrap();
        assert_eq!(a.get(Role::Issuer), b.get(Role::Issuer));
        assert_eq!(
            a.get(Role::CommitCommitConsumer),
            b.get(Role::CommitCommitConsumer)
        );
    }
}
