//! Wire format for remote runs.
//!
//! Every message is a frame: a little-endian `u32` payload length followed by that many bytes of
//! JSON. A connection carries exactly one run:
//!
//! ```text
//! client                                server
//!   Run { version, argv }  ------------>
//!                          <------------  Accepted { version } | Rejected { reason }
//!                          <------------  Stdout / Stderr      (any number, in write order)
//!                          <------------  Finished { success }
//! ```
//!
//! ## Notes
//!
//! - Frames larger than [`MAX_FRAME_SIZE`] are refused before the payload is read.
//! - A clean end of stream before a length prefix is reported as `None`, not as an error.

use std::io;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame payload.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Current protocol version for new connections.
pub const CURRENT_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V1;

/// Minimum supported protocol version.
pub const MIN_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V1;

const LENGTH_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum ProtocolVersion {
    #[default]
    V1,
}

impl ProtocolVersion {
    pub fn is_supported(&self) -> bool {
        (MIN_PROTOCOL_VERSION..=CURRENT_PROTOCOL_VERSION).contains(self)
    }

    /// The version to speak with a client that asked for `requested`.
    pub fn negotiate(requested: u32) -> Result<ProtocolVersion, ProtocolError> {
        let version = ProtocolVersion::try_from(requested)?;
        if version.is_supported() {
            Ok(version)
        } else {
            Err(ProtocolError::UnsupportedVersion { requested })
        }
    }
}

impl From<ProtocolVersion> for u32 {
    fn from(version: ProtocolVersion) -> u32 {
        match version {
            ProtocolVersion::V1 => 1,
        }
    }
}

impl TryFrom<u32> for ProtocolVersion {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProtocolVersion::V1),
            requested => Err(ProtocolError::UnsupportedVersion { requested }),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("unsupported protocol version {requested}")]
    UnsupportedVersion { requested: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("connection closed before the run finished")]
    ConnectionClosed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Run with `argv`, the remote form of the client's command line.
    Run { version: u32, argv: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Accepted { version: ProtocolVersion },
    Rejected { reason: String },
    Stdout { data: Vec<u8> },
    Stderr { data: Vec<u8> },
    Finished { success: bool },
}

/// Serialize `message` into a complete frame.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(message)?;
    check_size(payload.len())?;
    let mut frame = Vec::with_capacity(LENGTH_PREFIX + payload.len());
    // check_size bounds the length well below u32::MAX
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode the first frame in `bytes`. Returns the message and the number of bytes consumed.
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<(T, usize), ProtocolError> {
    let Some(prefix) = bytes.get(..LENGTH_PREFIX) else {
        return Err(ProtocolError::Truncated {
            needed: LENGTH_PREFIX,
            available: bytes.len(),
        });
    };
    let size = payload_size(prefix)?;
    let end = LENGTH_PREFIX + size;
    let payload = bytes.get(LENGTH_PREFIX..end).ok_or(ProtocolError::Truncated {
        needed: end,
        available: bytes.len(),
    })?;
    Ok((serde_json::from_slice(payload)?, end))
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message. `Ok(None)` means the peer closed the stream between frames.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; LENGTH_PREFIX];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(error) => return Err(error.into()),
    }
    let size = payload_size(&prefix)?;
    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload).await?;
    Ok(Some(serde_json::from_slice(&payload)?))
}

fn payload_size(prefix: &[u8]) -> Result<usize, ProtocolError> {
    let mut length = [0u8; LENGTH_PREFIX];
    length.copy_from_slice(prefix);
    let size = u32::from_le_bytes(length) as usize;
    check_size(size)?;
    Ok(size)
}

fn check_size(size: usize) -> Result<(), ProtocolError> {
    if size > MAX_FRAME_SIZE {
        Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        })
    } else {
        Ok(())
    }
}
