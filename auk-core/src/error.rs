//! Domain-specific error types for the auk client.
//!
//! All fallible operations return `Result<T, AukError>`.
//! No panics on invalid input — every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the auk client.
#[derive(Debug, Error)]
pub enum AukError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// Received bytes that do not form a valid transport envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(&'static str),

    /// An inner packet body failed decryption (bad key or corrupt frame).
    #[error("body decryption failed")]
    DecryptFailed,

    /// The packet payload failed checksum verification.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A decoder could not parse a command payload.
    #[error("decode error for {command}: {reason}")]
    Decode { command: String, reason: String },

    /// A correlated response arrived but carried the wrong variant for
    /// the request that was issued.
    #[error("unexpected response for {command}")]
    UnexpectedResponse { command: &'static str },

    // ── Framing Errors ───────────────────────────────────────────
    /// The 4-byte length prefix announced a frame below the minimum size.
    #[error("short frame length: {0}")]
    ShortFrameLength(u32),

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation was attempted without an established connection.
    #[error("not connected")]
    NotConnected,

    /// `login` was called while the session is already online.
    #[error("session is already online")]
    AlreadyOnline,

    /// An internal channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// A correlated request received no matching response in time.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding or decoding of a payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Application Errors ───────────────────────────────────────
    /// The server answered with a non-zero result code.
    #[error("server rejected request: {message} (code {code})")]
    ServerReject { code: i32, message: String },

    /// An outgoing message exceeds the hard protocol ceiling and can
    /// never be transmitted, inline or split.
    #[error("message too large to transmit")]
    MessageTooLarge,

    /// A forward bundle carries too many nodes for the upload path.
    #[error("forward bundle has {0} nodes (limit 199)")]
    BundleTooLarge(usize),

    /// An image query came back clean but the content is unknown to the
    /// server.
    #[error("image does not exist on the server")]
    ImageNotExists,

    /// Every candidate upload server refused or failed the transfer.
    #[error("upload failed on all candidate servers")]
    UploadFailed,
}

// ── Convenient From implementations ──────────────────────────────

impl From<Box<bincode::ErrorKind>> for AukError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        AukError::Encoding(e.to_string())
    }
}
