//! Error types for presence-core operations.

use presence_protocol::FrameError;
use std::path::PathBuf;

/// All errors that can occur while talking to the gateway or loading config.
///
/// Lookup misses (unknown extension or language) are not errors; the
/// composer resolves them with fallback values.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    // ─────────────────────────────────────────────────────────────────────
    // Login Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Discord gateway not found ({tried} socket paths tried)")]
    GatewayUnavailable { tried: usize },

    #[error("Gateway rejected the handshake: {code}: {message}")]
    Handshake { code: i64, message: String },

    #[error("Timed out waiting for the gateway to become ready")]
    LoginTimeout,

    #[error("Gateway connection closed: {0}")]
    Closed(String),

    // ─────────────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Protocol error: {0}")]
    Protocol(#[from] FrameError),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn gateway thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration read failed: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PresenceError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PresenceError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using PresenceError.
pub type Result<T> = std::result::Result<T, PresenceError>;

impl From<PresenceError> for String {
    fn from(err: PresenceError) -> String {
        err.to_string()
    }
}
