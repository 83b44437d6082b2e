//! # Core Data Model
//!
//! The types shared by every ordering/YAC component: rounds, peers, ledger
//! snapshots, synchronization events, proposals, and vote bundles.
//!
//! None of these types perform I/O or hold a lock. They are the vocabulary
//! the rest of the `ordering` and `yac` modules speak.

use std::cmp::Ordering as CmpOrdering;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::crypto::keys::{NovaPublicKey, NovaSignature};

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// Position in the consensus timeline: `(block_round, reject_round)`.
///
/// `block_round` advances when a block commits; `reject_round` advances
/// when consensus rejects or produces nothing for the current block round.
/// Ordered lexicographically — `block_round` dominates, `reject_round`
/// breaks ties within a block round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Round {
    pub block_round: u64,
    pub reject_round: u32,
}

impl Round {
    pub const fn new(block_round: u64, reject_round: u32) -> Self {
        Self {
            block_round,
            reject_round,
        }
    }

    /// The round a node starts at before any block has committed.
    pub const fn genesis(genesis_height: u64) -> Self {
        Self::new(genesis_height, 0)
    }
}

impl PartialOrd for Round {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Round {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.block_round, self.reject_round).cmp(&(other.block_round, other.reject_round))
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.block_round, self.reject_round)
    }
}

// ---------------------------------------------------------------------------
// BlockHash
// ---------------------------------------------------------------------------

/// A fixed-width, opaque hash. The only property the ordering core relies
/// on is that it is uniformly distributed enough to seed a PRNG — it does
/// not interpret the bytes in any other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

/// A network participant. Identity is the public key; `address` and
/// `tls_certificate` are transport details external to this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub address: String,
    pub public_key: NovaPublicKey,
    pub tls_certificate: Option<Vec<u8>>,
}

impl Peer {
    pub fn new(address: impl Into<String>, public_key: NovaPublicKey) -> Self {
        Self {
            address: address.into(),
            public_key,
            tls_certificate: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// An immutable snapshot handed out by the synchronizer. Shared by `Arc`
/// so it can outlive any single round that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub ledger_peers: Vec<Peer>,
}

impl LedgerState {
    pub fn new(ledger_peers: Vec<Peer>) -> Self {
        Self { ledger_peers }
    }

    pub fn peer_count(&self) -> usize {
        self.ledger_peers.len()
    }
}

// ---------------------------------------------------------------------------
// SynchronizationEvent
// ---------------------------------------------------------------------------

/// The three ways a synchronizer can resolve a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    Commit,
    Reject,
    /// No block materialized for the round. Treated identically to
    /// `Reject` by every consumer in this crate — see DESIGN.md.
    Nothing,
}

/// Emitted by the synchronizer once it resolves a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchronizationEvent {
    pub round: Round,
    pub sync_outcome: SyncOutcome,
    pub ledger_state: LedgerState,
}

// ---------------------------------------------------------------------------
// Transactions and proposals
// ---------------------------------------------------------------------------

/// An admitted transaction. The ordering core treats `payload` as opaque —
/// stateful validation is an external collaborator's job.
#[derive(Debug, Clone)]
pub struct Tx {
    pub hash: [u8; 32],
    pub payload: Vec<u8>,
    pub admitted_at: Instant,
}

impl Tx {
    pub fn new(hash: [u8; 32], payload: Vec<u8>) -> Self {
        Self {
            hash,
            payload,
            admitted_at: Instant::now(),
        }
    }
}

impl PartialEq for Tx {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
impl Eq for Tx {}

/// A wire-serializable transaction handle, used inside `Proposal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef {
    pub hash: [u8; 32],
    pub payload: Vec<u8>,
}

impl From<&Tx> for TxRef {
    fn from(tx: &Tx) -> Self {
        Self {
            hash: tx.hash,
            payload: tx.payload.clone(),
        }
    }
}

/// An ordered batch of transactions assembled for a specific round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub transactions: Vec<TxRef>,
    pub round: Round,
    pub created_time: i64,
}

impl Proposal {
    pub fn empty(round: Round) -> Self {
        Self {
            transactions: Vec::new(),
            round,
            created_time: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

/// A single vote over a proposal hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMessage {
    pub hash: [u8; 32],
    pub signature: NovaSignature,
    pub round: Round,
}

/// Returns `true` if every vote in the bundle shares the same round and the
/// bundle is non-empty. Mirrors the acceptance rule of `receive_state`.
pub fn votes_share_round(votes: &[VoteMessage]) -> bool {
    match votes.first() {
        None => false,
        Some(first) => votes.iter().all(|v| v.round == first.round),
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The five role tags the Connection Manager resolves on every
/// synchronization event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Issuer,
    RejectRejectConsumer,
    CommitRejectConsumer,
    RejectCommitConsumer,
    CommitCommitConsumer,
}

impl Role {
    /// All four transaction-forwarding consumer roles, excluding `Issuer`.
    pub const CONSUMERS: [Role; 4] = [
        Role::RejectRejectConsumer,
        Role::CommitRejectConsumer,
        Role::RejectCommitConsumer,
        Role::CommitCommitConsumer,
    ];
}
