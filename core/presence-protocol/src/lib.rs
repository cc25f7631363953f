//! Discord IPC wire types and frame codec for the presence bridge.
//!
//! This crate is shared by the presence client and its test gateway to prevent
//! schema drift. A frame on the socket is an 8-byte little-endian header
//! (opcode, body length) followed by a JSON body.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};

pub const IPC_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 8;
pub const MAX_FRAME_BYTES: usize = 64 * 1024; // 64KB

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Handshake,
    Frame,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    pub fn from_u32(value: u32) -> Result<Self, FrameError> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Close => 2,
            Opcode::Ping => 3,
            Opcode::Pong => 4,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame body of {0} bytes exceeds maximum size")]
    TooLarge(usize),

    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    #[error("frame body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    /// True when the peer closed the socket or it was shut down locally.
    pub fn is_closed(&self) -> bool {
        match self {
            FrameError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            FrameError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub opcode: Opcode,
    pub body: Value,
}

impl Frame {
    pub fn new(opcode: Opcode, body: Value) -> Self {
        Self { opcode, body }
    }

    pub fn handshake(client_id: &str) -> Self {
        let body = serde_json::json!({ "v": IPC_VERSION, "client_id": client_id });
        Self::new(Opcode::Handshake, body)
    }

    pub fn message(message: &Message) -> Result<Self, FrameError> {
        Ok(Self::new(Opcode::Frame, serde_json::to_value(message)?))
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let body = serde_json::to_vec(&self.body)?;
        if body.len() > MAX_FRAME_BYTES {
            return Err(FrameError::TooLarge(body.len()));
        }

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&self.opcode.as_u32().to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<(), FrameError> {
    let bytes = frame.encode()?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame, FrameError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;

    let opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if length > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(length));
    }
    let opcode = Opcode::from_u32(opcode)?;

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;

    let body = if body.iter().all(|b| b.is_ascii_whitespace()) {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };

    Ok(Frame { opcode, body })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Dispatch,
    SetActivity,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    Ready,
    Error,
    #[serde(other)]
    Unknown,
}

/// Body of every `FRAME` opcode, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub cmd: Command,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evt: Option<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl Message {
    pub fn dispatch(evt: Event, data: Value) -> Self {
        Self {
            cmd: Command::Dispatch,
            evt: Some(evt),
            data: Some(data),
            args: None,
            nonce: None,
        }
    }

    pub fn set_activity(args: &SetActivityArgs, nonce: String) -> Result<Self, FrameError> {
        Ok(Self {
            cmd: Command::SetActivity,
            evt: None,
            data: None,
            args: Some(serde_json::to_value(args)?),
            nonce: Some(nonce),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.cmd == Command::Dispatch && self.evt == Some(Event::Ready)
    }

    pub fn error_data(&self) -> Option<ErrorData> {
        if self.evt != Some(Event::Error) {
            return None;
        }
        let data = self.data.clone()?;
        serde_json::from_value(data).ok()
    }
}

/// Error body sent with `evt: ERROR` and with `CLOSE` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorData {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetActivityArgs {
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
}

/// Unix timestamps in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Assets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn encodes_little_endian_header() {
        let frame = Frame::handshake("123");
        let bytes = frame.encode().expect("encode");

        assert_eq!(&bytes[..4], &0u32.to_le_bytes());
        let length = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        assert_eq!(length, bytes.len() - HEADER_LEN);

        let body: Value = serde_json::from_slice(&bytes[HEADER_LEN..]).expect("body");
        assert_eq!(body["v"], 1);
        assert_eq!(body["client_id"], "123");
    }

    #[test]
    fn reads_ready_dispatch() {
        let message = Message::dispatch(Event::Ready, serde_json::json!({ "v": 1 }));
        let bytes = Frame::message(&message)
            .and_then(|frame| frame.encode())
            .expect("encode");

        let frame = read_frame(&mut Cursor::new(bytes)).expect("read");
        assert_eq!(frame.opcode, Opcode::Frame);
        let parsed: Message = frame.parse().expect("parse");
        assert!(parsed.is_ready());
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&((MAX_FRAME_BYTES as u32) + 1).to_le_bytes());

        let err = read_frame(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge(_)));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(b"{}");

        let err = read_frame(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, FrameError::UnknownOpcode(9)));
    }

    #[test]
    fn truncated_stream_reports_closed() {
        let err = read_frame(&mut Cursor::new(vec![1u8, 0, 0])).unwrap_err();
        assert!(err.is_closed());
    }

    #[test]
    fn set_activity_omits_missing_fields() {
        let args = SetActivityArgs {
            pid: 42,
            activity: Some(Activity {
                state: Some("Not editing a file".to_string()),
                ..Activity::default()
            }),
        };
        let message = Message::set_activity(&args, "nonce-1".to_string()).expect("message");
        let value = serde_json::to_value(&message).expect("value");

        assert_eq!(value["cmd"], "SET_ACTIVITY");
        assert_eq!(value["args"]["pid"], 42);
        assert_eq!(value["args"]["activity"]["state"], "Not editing a file");
        assert!(value["args"]["activity"].get("details").is_none());
        assert!(value["args"]["activity"].get("buttons").is_none());
        assert!(value.get("evt").is_none());
    }

    #[test]
    fn error_dispatch_exposes_code_and_message() {
        let message = Message::dispatch(
            Event::Error,
            serde_json::json!({ "code": 4000, "message": "Invalid Client ID" }),
        );
        let data = message.error_data().expect("error data");
        assert_eq!(data.code, 4000);
        assert_eq!(data.message, "Invalid Client ID");
    }

    #[test]
    fn unknown_event_names_deserialize() {
        let value = serde_json::json!({ "cmd": "SUBSCRIBE", "evt": "ACTIVITY_JOIN" });
        let message: Message = serde_json::from_value(value).expect("parse");
        assert_eq!(message.cmd, Command::Unknown);
        assert_eq!(message.evt, Some(Event::Unknown));
    }
}
