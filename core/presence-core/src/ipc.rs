//! Discord IPC client over the gateway's Unix socket.
//!
//! Each client owns one background thread. The thread connects, performs the
//! handshake, reports `Ready` or `LoginFailed`, then keeps reading frames
//! (answering pings) until the socket closes and reports `Disconnected`.
//! Destroying a client shuts the socket down and silences the thread.

use chrono::Utc;
use presence_protocol::{
    read_frame, write_frame, ErrorData, Frame, FrameError, Message, Opcode, SetActivityArgs,
};
use rand::RngCore;
use std::env;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::activity::ActivityPayload;
use crate::client::{ClientFactory, PresenceClient};
use crate::config::PresenceConfig;
use crate::error::{PresenceError, Result};
use crate::events::{HandleId, TransportEvent, TransportSink};

const SOCKET_PREFIX: &str = "discord-ipc-";
const SOCKET_SLOTS: u8 = 10;
const RUNTIME_DIR_ENVS: [&str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];
const FALLBACK_RUNTIME_DIR: &str = "/tmp";
// Sandboxed Discord builds put their socket one level down.
const SANDBOX_SUBDIRS: [&str; 2] = ["app/com.discordapp.Discord", "snap.discord"];
const WRITE_TIMEOUT_MS: u64 = 600;

/// Every socket path a gateway might listen on, in probe order.
pub fn candidate_socket_paths() -> Vec<PathBuf> {
    let base = RUNTIME_DIR_ENVS
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_RUNTIME_DIR));

    let mut paths = Vec::new();
    for slot in 0..SOCKET_SLOTS {
        let name = format!("{}{}", SOCKET_PREFIX, slot);
        paths.push(base.join(&name));
        for subdir in SANDBOX_SUBDIRS {
            paths.push(base.join(subdir).join(&name));
        }
    }
    paths
}

/// Socket paths to try for `config`: the override alone, or discovery.
pub fn socket_paths_for(config: &PresenceConfig) -> Vec<PathBuf> {
    match &config.socket_path {
        Some(path) => vec![path.clone()],
        None => candidate_socket_paths(),
    }
}

/// First path that accepts a connection right now.
pub fn find_gateway_socket(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|path| UnixStream::connect(path).is_ok())
        .cloned()
}

pub struct DiscordConnector {
    candidates: Vec<PathBuf>,
    login_timeout: Duration,
    sink: TransportSink,
}

impl DiscordConnector {
    pub fn new(config: &PresenceConfig, sink: TransportSink) -> Self {
        Self {
            candidates: socket_paths_for(config),
            login_timeout: config.login_timeout(),
            sink,
        }
    }

    pub fn with_candidates(
        candidates: Vec<PathBuf>,
        login_timeout: Duration,
        sink: TransportSink,
    ) -> Self {
        Self {
            candidates,
            login_timeout,
            sink,
        }
    }
}

impl ClientFactory for DiscordConnector {
    type Client = DiscordIpcClient;

    fn login(&mut self, handle: HandleId, client_id: &str) -> Result<DiscordIpcClient> {
        let shared = Arc::new(Shared::default());
        let session = Session {
            handle,
            client_id: client_id.to_string(),
            candidates: self.candidates.clone(),
            login_timeout: self.login_timeout,
            shared: Arc::clone(&shared),
            sink: Arc::clone(&self.sink),
        };

        thread::Builder::new()
            .name(format!("presence-ipc-{}", handle.0))
            .spawn(move || session.run())
            .map_err(PresenceError::ThreadSpawn)?;

        Ok(DiscordIpcClient { handle, shared })
    }
}

#[derive(Default)]
struct Shared {
    destroyed: AtomicBool,
    writer: Mutex<Option<UnixStream>>,
}

impl Shared {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn writer(&self) -> MutexGuard<'_, Option<UnixStream>> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, frame: &Frame) -> Result<()> {
        let mut guard = self.writer();
        let stream = guard
            .as_mut()
            .ok_or_else(|| PresenceError::Closed("client is not connected".to_string()))?;
        write_frame(stream, frame)?;
        Ok(())
    }
}

pub struct DiscordIpcClient {
    handle: HandleId,
    shared: Arc<Shared>,
}

impl PresenceClient for DiscordIpcClient {
    fn set_activity(&mut self, activity: &ActivityPayload) -> Result<()> {
        if self.shared.is_destroyed() {
            return Err(PresenceError::Closed("client was destroyed".to_string()));
        }
        let args = SetActivityArgs {
            pid: std::process::id(),
            activity: Some(activity.into()),
        };
        let message = Message::set_activity(&args, make_nonce())?;
        self.shared.send(&Frame::message(&message)?)
    }

    fn destroy(&mut self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(stream) = self.shared.writer().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        tracing::debug!(handle = %self.handle, "Gateway client destroyed");
    }
}

impl Drop for DiscordIpcClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

struct Session {
    handle: HandleId,
    client_id: String,
    candidates: Vec<PathBuf>,
    login_timeout: Duration,
    shared: Arc<Shared>,
    sink: TransportSink,
}

impl Session {
    fn run(self) {
        let mut reader = match self.login() {
            Ok(reader) => reader,
            Err(err) => {
                if let Some(stream) = self.shared.writer().take() {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                if !self.shared.is_destroyed() {
                    (self.sink)(TransportEvent::LoginFailed {
                        handle: self.handle,
                        error: err,
                    });
                }
                return;
            }
        };

        if self.shared.is_destroyed() {
            return;
        }
        (self.sink)(TransportEvent::Ready {
            handle: self.handle,
        });

        loop {
            match read_frame(&mut reader) {
                Ok(frame) => match frame.opcode {
                    Opcode::Ping => {
                        if let Err(err) = self.shared.send(&Frame::new(Opcode::Pong, frame.body)) {
                            tracing::debug!(handle = %self.handle, error = %err, "Failed to answer ping");
                        }
                    }
                    Opcode::Close => {
                        let data: ErrorData = frame.parse().unwrap_or_default();
                        tracing::info!(
                            handle = %self.handle,
                            code = data.code,
                            message = %data.message,
                            "Gateway closed the connection"
                        );
                        break;
                    }
                    Opcode::Frame => log_inbound(self.handle, &frame),
                    Opcode::Handshake | Opcode::Pong => {}
                },
                Err(err) => {
                    if !self.shared.is_destroyed() && !err.is_closed() {
                        tracing::warn!(handle = %self.handle, error = %err, "Gateway read failed");
                    }
                    break;
                }
            }
        }

        if let Some(stream) = self.shared.writer().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if !self.shared.is_destroyed() {
            (self.sink)(TransportEvent::Disconnected {
                handle: self.handle,
            });
        }
    }

    /// Connects and waits for `READY`. Returns the read half on success.
    fn login(&self) -> Result<UnixStream> {
        let mut stream = connect_first(&self.candidates)?;
        let writer = stream
            .try_clone()
            .map_err(|err| PresenceError::io("Failed to clone gateway socket", err))?;
        let _ = writer.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));
        *self.shared.writer() = Some(writer);

        if self.shared.is_destroyed() {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(PresenceError::Closed(
                "client destroyed during login".to_string(),
            ));
        }

        self.shared.send(&Frame::handshake(&self.client_id))?;

        let deadline = Instant::now() + self.login_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PresenceError::LoginTimeout);
            }
            stream
                .set_read_timeout(Some(remaining))
                .map_err(|err| PresenceError::io("Failed to set read timeout", err))?;

            let frame = read_frame(&mut stream).map_err(login_read_error)?;
            match frame.opcode {
                Opcode::Frame => {
                    let message: Message = frame.parse()?;
                    if message.is_ready() {
                        break;
                    }
                    if let Some(data) = message.error_data() {
                        return Err(PresenceError::Handshake {
                            code: data.code,
                            message: data.message,
                        });
                    }
                }
                Opcode::Close => {
                    let data: ErrorData = frame.parse().unwrap_or_default();
                    return Err(PresenceError::Handshake {
                        code: data.code,
                        message: data.message,
                    });
                }
                Opcode::Ping => {
                    self.shared.send(&Frame::new(Opcode::Pong, frame.body))?;
                }
                Opcode::Handshake | Opcode::Pong => {}
            }
        }

        stream
            .set_read_timeout(None)
            .map_err(|err| PresenceError::io("Failed to clear read timeout", err))?;
        tracing::info!(handle = %self.handle, "Gateway handshake complete");
        Ok(stream)
    }
}

fn connect_first(candidates: &[PathBuf]) -> Result<UnixStream> {
    for path in candidates {
        match UnixStream::connect(path) {
            Ok(stream) => {
                tracing::debug!(path = %path.display(), "Connected to gateway socket");
                return Ok(stream);
            }
            Err(err) => {
                tracing::trace!(path = %path.display(), error = %err, "Gateway socket unavailable");
            }
        }
    }
    Err(PresenceError::GatewayUnavailable {
        tried: candidates.len(),
    })
}

fn login_read_error(err: FrameError) -> PresenceError {
    if err.is_timeout() {
        PresenceError::LoginTimeout
    } else if err.is_closed() {
        PresenceError::Closed("gateway hung up during handshake".to_string())
    } else {
        PresenceError::Protocol(err)
    }
}

fn log_inbound(handle: HandleId, frame: &Frame) {
    match frame.parse::<Message>() {
        Ok(message) => {
            if let Some(data) = message.error_data() {
                tracing::warn!(
                    handle = %handle,
                    code = data.code,
                    message = %data.message,
                    "Gateway reported an error"
                );
            } else {
                tracing::trace!(handle = %handle, cmd = ?message.cmd, "Gateway frame");
            }
        }
        Err(err) => tracing::debug!(handle = %handle, error = %err, "Unparseable gateway frame"),
    }
}

fn make_nonce() -> String {
    let mut random = rand::thread_rng();
    format!(
        "nonce-{}-{:x}",
        Utc::now().timestamp_millis(),
        random.next_u64()
    )
}
