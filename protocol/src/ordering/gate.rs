//! # Ordering Gate
//!
//! The round state machine of the local node. Consumes synchronization
//! events and committed blocks, requests proposals from the Issuer peer,
//! and emits round-ready proposals downstream.
//!
//! The gate never blocks sync-event intake on a proposal round-trip: each
//! request is dispatched onto its own task, tagged with an epoch counter so
//! that a late, superseded response is discarded rather than applied.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::connection::{ConnectionError, ConnectionManager};
use super::types::{LedgerState, Peer, Proposal, Role, Round, SynchronizationEvent};

/// What the TxPresenceCache (external collaborator) knows about a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Committed,
    Rejected,
    Unknown,
}

/// Tracks which transaction hashes are already final, so the gate can
/// filter them out of proposals it is about to emit.
pub trait TxPresenceCache: Send + Sync {
    fn check(&self, hash: &[u8; 32]) -> Presence;
    fn evict(&self, hashes: &[[u8; 32]]);
}

/// Requests a proposal assembly from a peer's ordering service. A thin
/// seam over whatever transport the network layer provides.
#[async_trait]
pub trait ProposalRequester: Send + Sync {
    async fn request_proposal(&self, peer: &Peer, round: Round) -> Option<Proposal>;
}

/// Errors surfaced by the gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("no issuer peer bound for this round")]
    NoIssuer,
}

/// Round state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitingProposal(Round),
    ProposalReady(Round, Proposal),
}

/// Events emitted downstream by the gate.
#[derive(Debug, Clone)]
pub enum GateOutput {
    RoundSwitch {
        round: Round,
        ledger_state: LedgerState,
    },
    ProposalReady {
        round: Round,
        proposal: Proposal,
    },
}

/// The local node's round state machine.
pub struct Gate {
    connection_manager: Arc<ConnectionManager>,
    requester: Arc<dyn ProposalRequester>,
    tx_presence: Arc<dyn TxPresenceCache>,
    delay: Duration,
    state: Mutex<GateState>,
    epoch: AtomicU64,
}

impl Gate {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        requester: Arc<dyn ProposalRequester>,
        tx_presence: Arc<dyn TxPresenceCache>,
        delay: Duration,
    ) -> Self {
        Self {
            connection_manager,
            requester,
            tx_presence,
            delay,
            state: Mutex::new(GateState::Idle),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> GateState {
        self.state.lock().clone()
    }

    /// Handles an incoming synchronization event: advances the round,
    /// publishes the `RoundSwitch`, and dispatches an asynchronous proposal
    /// request to the Issuer peer. Does not await the request's completion.
    pub async fn on_synchronization_event(
        self: &Arc<Self>,
        event: SynchronizationEvent,
        output: &mpsc::Sender<GateOutput>,
    ) -> Result<Round, GateError> {
        let next = self.connection_manager.on_synchronization_event(&event)?;
        let epoch = self.epoch.fetch_add(1, AtomicOrdering::SeqCst) + 1;

        *self.state.lock() = GateState::AwaitingProposal(next);

        let _ = output
            .send(GateOutput::RoundSwitch {
                round: next,
                ledger_state: event.ledger_state,
            })
            .await;

        let issuer = self
            .connection_manager
            .current_peers()
            .ok_or(GateError::NoIssuer)?
            .get(Role::Issuer)
            .clone();

        let this = Arc::clone(self);
        let output = output.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            let proposal = match tokio::time::timeout(delay, this.requester.request_proposal(&issuer, next)).await {
                Ok(proposal) => proposal,
                Err(_) => {
                    warn!(round = %next, delay = ?delay, "proposal request timed out");
                    None
                }
            };
            this.on_proposal_received(epoch, next, proposal, output).await;
        });

        Ok(next)
    }

    async fn on_proposal_received(
        &self,
        epoch: u64,
        round: Round,
        proposal: Option<Proposal>,
        output: mpsc::Sender<GateOutput>,
    ) {
        if epoch != self.epoch.load(AtomicOrdering::SeqCst) {
            debug!(round = %round, "discarding proposal response from a superseded round");
            return;
        }

        {
            let state = self.state.lock();
            if *state != GateState::AwaitingProposal(round) {
                return;
            }
        }

        let mut proposal = match proposal {
            Some(proposal) => proposal,
            None => {
                debug!(round = %round, "issuer returned no proposal; emitting empty proposal");
                Proposal::empty(round)
            }
        };

        proposal
            .transactions
            .retain(|tx| self.tx_presence.check(&tx.hash) != Presence::Committed);

        *self.state.lock() = GateState::ProposalReady(round, proposal.clone());
        let _ = output
            .send(GateOutput::ProposalReady { round, proposal })
            .await;
    }

    /// Records a committed block: advances the hash window and evicts its
    /// committed and rejected transaction hashes from the presence cache.
    pub fn on_committed_block(
        &self,
        block_hash: super::types::BlockHash,
        committed: Vec<[u8; 32]>,
        rejected_transactions_hashes: Vec<[u8; 32]>,
    ) {
        self.connection_manager.on_committed_block(block_hash);
        let mut eviction_set = committed;
        eviction_set.extend(rejected_transactions_hashes);
        self.tx_presence.evict(&eviction_set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::NovaKeypair;
    use crate::ordering::types::{BlockHash, LedgerState, SyncOutcome, TxRef};
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    fn peers(n: usize) -> LedgerState {
        let peers = (0..n)
            .map(|i| Peer::new(format!("peer-{i}"), NovaKeypair::from_seed(&[i as u8; 32]).public_key()))
            .collect();
        LedgerState::new(peers)
    }

    struct FakePresence {
        committed: StdMutex<HashSet<[u8; 32]>>,
    }

    impl TxPresenceCache for FakePresence {
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

    struct FakeRequester {
        proposal: Proposal,
    }

    #[async_trait]
    impl ProposalRequester for FakeRequester {
        async fn request_proposal(&self, _peer: &Peer, round: Round) -> Option<Proposal> {
            let mut p = self.proposal.clone();
            p.round = round;
            Some(p)
        }
    }

    struct NeverRespondsRequester;

    #[async_trait]
    impl ProposalRequester for NeverRespondsRequester {
        async fn request_proposal(&self, _peer: &Peer, round: Round) -> Option<Proposal> {
            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
            Some(Proposal::empty(round))
        }
    }

    fn proposal_with(hashes: &[u8]) -> Proposal {
        Proposal {
            transactions: hashes
                .iter()
                .map(|h| TxRef {
                    hash: [*h; 32],
                    payload: vec![],
                })
                .collect(),
            round: Round::new(0, 0),
            created_time: 0,
        }
    }

    #[tokio::test]
    async fn sync_event_emits_round_switch_and_proposal() {
        let cm = Arc::new(ConnectionManager::new([BlockHash([1; 32]), BlockHash([2; 32])]));
        let requester = Arc::new(FakeRequester {
            proposal: proposal_with(&[9]),
        });
        let presence = Arc::new(FakePresence {
            committed: StdMutex::new(HashSet::new()),
        });
        let gate = Arc::new(Gate::new(cm, requester, presence, Duration::from_secs(5)));
        let (tx, mut rx) = mpsc::channel(8);

        let event = SynchronizationEvent {
            round: Round::new(10, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(5),
        };

        let next = gate.on_synchronization_event(event, &tx).await.unwrap();
        assert_eq!(next, Round::new(11, 0));

        match rx.recv().await.unwrap() {
            GateOutput::RoundSwitch { round, .. } => assert_eq!(round, Round::new(11, 0)),
            other => panic!("unexpected output: {other:?}"),
        }

        match rx.recv().await.unwrap() {
            GateOutput::ProposalReady { round, proposal } => {
                assert_eq!(round, Round::new(11, 0));
                assert_eq!(proposal.transactions.len(), 1);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn proposal_is_filtered_against_committed_hashes() {
        let cm = Arc::new(ConnectionManager::new([BlockHash([1; 32]), BlockHash([2; 32])]));
        let requester = Arc::new(FakeRequester {
            proposal: proposal_with(&[1, 2, 3]),
        });
        let presence = Arc::new(FakePresence {
            committed: StdMutex::new(HashSet::from([[1u8; 32]])),
        });
        let gate = Arc::new(Gate::new(cm, requester, presence, Duration::from_secs(5)));
        let (tx, mut rx) = mpsc::channel(8);

        let event = SynchronizationEvent {
            round: Round::new(10, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(5),
        };
        gate.on_synchronization_event(event, &tx).await.unwrap();

        let _ = rx.recv().await; // RoundSwitch
        match rx.recv().await.unwrap() {
            GateOutput::ProposalReady { proposal, .. } => {
                let hashes: Vec<u8> = proposal.transactions.iter().map(|t| t.hash[0]).collect();
                assert_eq!(hashes, vec![2, 3]);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn new_sync_event_supersedes_in_flight_request() {
        let cm = Arc::new(ConnectionManager::new([BlockHash([1; 32]), BlockHash([2; 32])]));
        let requester = Arc::new(NeverRespondsRequester);
        let presence = Arc::new(FakePresence {
            committed: StdMutex::new(HashSet::new()),
        });
        let gate = Arc::new(Gate::new(cm, requester, presence, Duration::from_secs(3600)));
        let (tx, mut rx) = mpsc::channel(8);

        let first = SynchronizationEvent {
            round: Round::new(10, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(5),
        };
        gate.on_synchronization_event(first, &tx).await.unwrap();
        let _ = rx.recv().await; // first RoundSwitch

        // Supersede before the never-responding task can reply.
        let second = SynchronizationEvent {
            round: Round::new(11, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(5),
        };
        let next = gate.on_synchronization_event(second, &tx).await.unwrap();
        assert_eq!(next, Round::new(12, 0));

        // Awaiting state must reflect the newer round, not the stale one.
        assert_eq!(gate.state(), GateState::AwaitingProposal(Round::new(12, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn proposal_request_timeout_emits_empty_proposal() {
        let cm = Arc::new(ConnectionManager::new([BlockHash([1; 32]), BlockHash([2; 32])]));
        let requester = Arc::new(NeverRespondsRequester);
        let presence = Arc::new(FakePresence {
            committed: StdMutex::new(HashSet::new()),
        });
        let gate = Arc::new(Gate::new(cm, requester, presence, Duration::from_millis(50)));
        let (tx, mut rx) = mpsc::channel(8);

        let event = SynchronizationEvent {
            round: Round::new(10, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: peers(5),
        };
        gate.on_synchronization_event(event, &tx).await.unwrap();

        let _ = rx.recv().await; // RoundSwitch
        match rx.recv().await.unwrap() {
            GateOutput::ProposalReady { round, proposal } => {
                assert_eq!(round, Round::new(11, 0));
                assert!(proposal.transactions.is_empty());
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_event_with_no_peers_is_refused() {
        let cm = Arc::new(ConnectionManager::new([BlockHash([1; 32]), BlockHash([2; 32])]));
        let requester = Arc::new(FakeRequester {
            proposal: proposal_with(&[1]),
        });
        let presence = Arc::new(FakePresence {
            committed: StdMutex::new(HashSet::new()),
        });
        let gate = Arc::new(Gate::new(cm, requester, presence, Duration::from_secs(5)));
        let (tx, _rx) = mpsc::channel(8);

        let event = SynchronizationEvent {
            round: Round::new(10, 0),
            sync_outcome: SyncOutcome::Commit,
            ledger_state: LedgerState::new(vec![]),
        };
        assert!(matches!(
            gate.on_synchronization_event(event, &tx).await,
            Err(GateError::Connection(ConnectionError::EmptyLedgerPeers))
        ));
    }
}
