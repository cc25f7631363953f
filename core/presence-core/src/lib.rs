//! # Presence Core
//!
//! Connection lifecycle and activity composition for the editor presence
//! bridge.
//!
//! The bridge watches what the user edits and pushes a small status payload
//! to the Discord desktop client over its local IPC socket. This crate holds
//! everything except the host plumbing:
//!
//! - [`controller`]: the single owner of the live client, timers and
//!   subscriptions
//! - [`activity`] and [`lookup`]: pure payload composition
//! - [`ipc`]: the real gateway client
//! - [`repository`]: remote URL discovery for the "View Repository" button
//!
//! Nothing here is async. Client threads report through a
//! [`events::TransportSink`] and the caller's event loop feeds those events
//! back into the controller.

pub mod activity;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod indicator;
pub mod ipc;
pub mod lookup;
pub mod notices;
pub mod repository;
pub mod subscriptions;
pub mod timer;

#[cfg(test)]
mod test_support;

pub use activity::{compose_activity, ActivityPayload, EditorBranding, EditorContext};
pub use client::{ClientFactory, PresenceClient};
pub use config::{load_config, PresenceConfig};
pub use controller::{Clock, ConnectionState, ControllerSettings, PresenceController};
pub use error::{PresenceError, Result};
pub use events::{HandleId, TransportEvent, TransportSink};
pub use indicator::{HostCommand, IndicatorState, StatusIndicator};
pub use ipc::{DiscordConnector, DiscordIpcClient};
pub use notices::{Notice, NoticeAction, NoticeLevel, Notifier};
pub use subscriptions::EditorEventKind;
