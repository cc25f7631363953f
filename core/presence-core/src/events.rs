//! Transport events delivered from client threads to the controller.

use std::fmt;
use std::sync::Arc;

use crate::error::PresenceError;

/// Identifies one client instance. Minted per `connect`, never reused, so an
/// event from a torn-down client can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
pub enum TransportEvent {
    Ready { handle: HandleId },
    LoginFailed { handle: HandleId, error: PresenceError },
    Disconnected { handle: HandleId },
}

/// Where client threads post their events; usually wraps a channel sender
/// feeding the event loop.
pub type TransportSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;
