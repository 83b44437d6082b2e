//! Voting transport (YAC): fan-out of vote bundles and reception of
//! inbound bundles, with a cooperative shutdown gate.

pub mod transport;

pub use transport::{
    NotificationsHandler, ReceiveStatus, VoteSender, YacError, YacTransport,
};
