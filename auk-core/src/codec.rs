//! Length-prefixed framing for the coordinator link.
//!
//! ## Wire format
//!
//! ```text
//! total_length:  u32  big-endian, includes the 4 prefix bytes
//! frame:         [u8] (total_length − 4 bytes)
//! ```
//!
//! A prefix below 4 is nonsense but the stream is still aligned, so the
//! decoder consumes it and reports [`FrameError::ShortLength`]; the
//! session loop treats that as a soft error (sleep and retry) rather
//! than tearing the link down.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on a single frame (16 MiB). A prefix above this means the
/// stream is corrupt.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const PREFIX_LEN: usize = 4;

/// Errors produced by [`FrameCodec`].
#[derive(Debug, Error)]
pub enum FrameError {
    /// The length prefix was below the minimum frame size.
    #[error("short frame length: {0}")]
    ShortLength(u32),

    /// The length prefix exceeded [`MAX_FRAME_SIZE`].
    #[error("frame too large: {0} bytes")]
    Oversize(u32),

    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Codec applying the 4-byte big-endian total-length prefix.
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PREFIX_LEN {
            return Ok(None);
        }
        let total = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if (total as usize) < PREFIX_LEN {
            // Consume the bogus prefix so the stream can continue.
            src.advance(PREFIX_LEN);
            return Err(FrameError::ShortLength(total));
        }
        if total as usize > MAX_FRAME_SIZE {
            src.advance(PREFIX_LEN);
            return Err(FrameError::Oversize(total));
        }
        let body_len = total as usize - PREFIX_LEN;
        if src.len() < PREFIX_LEN + body_len {
            src.reserve(PREFIX_LEN + body_len - src.len());
            return Ok(None);
        }
        src.advance(PREFIX_LEN);
        Ok(Some(src.split_to(body_len).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() + PREFIX_LEN > MAX_FRAME_SIZE {
            return Err(FrameError::Oversize((item.len() + PREFIX_LEN) as u32));
        }
        dst.reserve(PREFIX_LEN + item.len());
        dst.put_u32((item.len() + PREFIX_LEN) as u32);
        dst.put_slice(&item);
        Ok(())
    }
}

impl From<FrameError> for crate::error::AukError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::ShortLength(n) => crate::error::AukError::ShortFrameLength(n),
            FrameError::Oversize(n) => crate::error::AukError::FrameTooLarge {
                size: n as usize,
                max: MAX_FRAME_SIZE,
            },
            FrameError::Io(io) => crate::error::AukError::Connection(io),
        }
    }
}

// ── Direct frame reads ───────────────────────────────────────────

/// Read one frame directly from a stream: the 4-byte big-endian prefix,
/// then the body.
///
/// The session loop uses this instead of a framed stream because its
/// error handling is positional: a short prefix is a soft error (the 4
/// bytes are consumed, the stream continues), while end-of-stream
/// surfaces as an `Io` error and triggers the reconnect path. Framed
/// adapters treat any decode error as fatal, which is the wrong policy
/// here.
pub async fn read_frame<R>(reader: &mut R) -> Result<Bytes, FrameError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;

    let total = reader.read_u32().await?;
    if (total as usize) < PREFIX_LEN {
        return Err(FrameError::ShortLength(total));
    }
    if total as usize > MAX_FRAME_SIZE {
        return Err(FrameError::Oversize(total));
    }
    let mut body = vec![0u8; total as usize - PREFIX_LEN];
    reader.read_exact(&mut body).await?;
    Ok(Bytes::from(body))
}

// ── Tests ────────────────────────────────────────────────────────
