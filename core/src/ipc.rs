//! Finder → overlay wire protocol
//!
//! One message per TCP connection on the loopback interface: the client
//! connects, writes a single newline-terminated JSON object and closes.
//!
//! ```json
//! {"v":1,"kind":"show","question":"capital of france","answers":["Paris"]}
//! {"v":1,"kind":"hide"}
//! {"v":1,"kind":"ping"}
//! ```
//!
//! Unknown fields are ignored so newer senders can add fields. Unknown
//! `kind`s, invalid JSON and frames over [`MAX_FRAME_BYTES`] are rejected.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::MatchResult;

pub const DEFAULT_PORT: u16 = 12345;
pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Connect, write and read timeout for a single exchange
pub const IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Content shown by the overlay for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayPayload {
    pub question: String,
    pub answers: Vec<String>,
}

impl From<&MatchResult> for OverlayPayload {
    fn from(result: &MatchResult) -> Self {
        Self {
            question: result.entry.question.clone(),
            answers: result.entry.answers.clone(),
        }
    }
}

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WireMessage {
    Show(OverlayPayload),
    Hide,
    Ping,
}

impl WireMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Show(_) => "show",
            Self::Hide => "hide",
            Self::Ping => "ping",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(default = "default_version")]
    v: u32,
    #[serde(flatten)]
    message: WireMessage,
}

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect to overlay at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(serde_json::Error),

    #[error("malformed message: {0}")]
    Malformed(serde_json::Error),

    #[error("frame exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("connection closed without a message")]
    Empty,
}

/// Loopback address of the overlay listener
pub fn overlay_addr(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize a message as one newline-terminated frame
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, TransportError> {
    let envelope = Envelope {
        v: PROTOCOL_VERSION,
        message: message.clone(),
    };
    let mut frame = serde_json::to_vec(&envelope).map_err(TransportError::Encode)?;
    frame.push(b'\n');
    if frame.len() > MAX_FRAME_BYTES {
        return Err(TransportError::TooLarge {
            limit: MAX_FRAME_BYTES,
        });
    }
    Ok(frame)
}

/// Parse one frame. Trailing newline and surrounding whitespace are allowed.
pub fn decode(frame: &[u8]) -> Result<WireMessage, TransportError> {
    if frame.len() > MAX_FRAME_BYTES {
        return Err(TransportError::TooLarge {
            limit: MAX_FRAME_BYTES,
        });
    }
    if frame.iter().all(u8::is_ascii_whitespace) {
        return Err(TransportError::Empty);
    }
    let envelope: Envelope = serde_json::from_slice(frame).map_err(TransportError::Malformed)?;
    if envelope.v > PROTOCOL_VERSION {
        tracing::debug!(
            version = envelope.v,
            supported = PROTOCOL_VERSION,
            "Message from newer protocol version"
        );
    }
    Ok(envelope.message)
}

/// Read a single frame from a connection: up to the first newline or EOF.
pub fn read_message<R: Read>(reader: R) -> Result<WireMessage, TransportError> {
    let mut limited = BufReader::new(reader.take(MAX_FRAME_BYTES as u64 + 1));
    let mut frame = Vec::new();
    limited.read_until(b'\n', &mut frame)?;
    decode(&frame)
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Deliver one message to the overlay and close the connection
pub fn send_message(
    addr: SocketAddr,
    message: &WireMessage,
    timeout: Duration,
) -> Result<(), TransportError> {
    let frame = encode(message)?;
    let mut stream = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| TransportError::Connect { addr, source: e })?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_nodelay(true)?;
    stream.write_all(&frame)?;
    stream.flush()?;
    // Peer may already have closed after reading the frame
    let _ = stream.shutdown(Shutdown::Write);
    Ok(())
}
