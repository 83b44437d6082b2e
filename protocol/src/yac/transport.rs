//! # Voting Transport (YAC)
//!
//! Fan-out of vote bundles to peers and reception of inbound bundles, with
//! a cooperative shutdown gate. The higher-level consensus state machine
//! (not part of this crate) drives `send_state`/`receive_state`; this
//! module only owns the transport discipline: stop semantics, single
//! weakly-held subscriber, and validation of inbound bundles.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::ordering::types::{votes_share_round, Peer, VoteMessage};

/// Status returned to the inbound handler on `receive_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    Ok,
    /// Malformed bundle (empty, or votes spanning more than one round).
    /// The sender must not retry the same payload.
    Cancelled,
}

/// A single client send. Implemented by the network layer; kept generic
/// here so the transport doesn't need to know about wire framing.
#[async_trait]
pub trait VoteSender: Send + Sync {
    async fn send(&self, peer: &Peer, votes: &[VoteMessage]) -> Result<(), YacError>;
}

/// Notified when a valid vote bundle arrives from a peer.
pub trait NotificationsHandler: Send + Sync {
    fn on_votes(&self, votes: Vec<VoteMessage>);
}

#[derive(Debug, thiserror::Error)]
pub enum YacError {
    #[error("transport transient failure: {0}")]
    Transient(String),
}

/// The YAC voting transport. Owns no consensus state — only the send/
/// receive discipline, the stop flag, and the subscribed handler.
pub struct YacTransport {
    sender: Arc<dyn VoteSender>,
    stopped: Mutex<bool>,
    handler: Mutex<Weak<dyn NotificationsHandler>>,
}

impl YacTransport {
    pub fn new(sender: Arc<dyn VoteSender>) -> Self {
        let empty: Weak<dyn NotificationsHandler> = Weak::<NoopHandler>::new();
        Self {
            sender,
            stopped: Mutex::new(false),
            handler: Mutex::new(empty),
        }
    }

    /// Registers the single notifications handler, weakly. A later call
    /// replaces the prior subscription; it does not stack subscribers.
    pub fn subscribe(&self, handler: &Arc<dyn NotificationsHandler>) {
        *self.handler.lock() = Arc::downgrade(handler);
    }

    /// Sets the stop flag. Idempotent: calling this more than once has no
    /// additional effect beyond the first call.
    pub fn stop(&self) {
        *self.stopped.lock() = true;
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Fire-and-forget send to `peer`. Drops silently (with a warning) if
    /// the transport has been stopped. Transient send failures are logged,
    /// not retried — the consensus layer re-broadcasts as needed.
    pub async fn send_state(&self, peer: &Peer, votes: Vec<VoteMessage>) {
        if *self.stopped.lock() {
            warn!(peer = %peer.address, "send_state dropped: transport is stopped");
            return;
        }

        if let Err(e) = self.sender.send(peer, &votes).await {
            warn!(peer = %peer.address, error = %e, "send_state transient failure, not retrying here");
        }
    }

    /// Validates and hands off an inbound vote bundle to the subscribed
    /// handler. Returns `Cancelled` for malformed bundles without invoking
    /// the handler.
    pub fn receive_state(&self, votes: Vec<VoteMessage>) -> ReceiveStatus {
        if !votes_share_round(&votes) {
            return ReceiveStatus::Cancelled;
        }

        match self.handler.lock().upgrade() {
            Some(handler) => {
                handler.on_votes(votes);
                ReceiveStatus::Ok
            }
            None => {
                debug!("receive_state: no subscriber attached, dropping bundle");
                ReceiveStatus::Ok
            }
        }
    }
}

struct NoopHandler;
impl NotificationsHandler for NoopHandler {
    fn on_votes(&self, _votes: Vec<VoteMessage>) {}
}
