//! Seams between the controller and the gateway transport.

use crate::activity::ActivityPayload;
use crate::error::Result;
use crate::events::HandleId;

/// A live gateway client. At most one exists per controller.
pub trait PresenceClient {
    /// Fire-and-forget; an error means this push was lost, nothing more.
    fn set_activity(&mut self, activity: &ActivityPayload) -> Result<()>;

    /// Idempotent teardown. After this returns the client reports no further
    /// transport events.
    fn destroy(&mut self);
}

/// Creates clients and starts their login in the background.
///
/// The login outcome is reported later as a transport event tagged with
/// `handle`. An `Err` here means the login could not even be started and is
/// handled like a failed login.
pub trait ClientFactory {
    type Client: PresenceClient;

    fn login(&mut self, handle: HandleId, client_id: &str) -> Result<Self::Client>;
}
