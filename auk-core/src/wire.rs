//! Wire-codec contract and the reference implementation.
//!
//! The production protocol's envelope cipher, TLV layout and key
//! schedule live outside this crate; the session engine only needs the
//! three operations of [`WireCodec`]. [`ClearCodec`] is the reference
//! implementation used by the test suite and the CLI: bincode envelopes
//! with a blake3-derived payload checksum and a keystream-XOR body
//! cipher. It is deliberately NOT the production cipher — a real
//! deployment injects its own codec through [`ClientBuilder`].
//!
//! [`ClientBuilder`]: crate::client::ClientBuilder

use serde::{Deserialize, Serialize};

use crate::error::AukError;
use crate::packet::{PacketFlags, RequestEnvelope, TransportPacket};

/// Framing, envelope encryption and request building.
///
/// Implementations must be cheap to call concurrently; the session loop
/// invokes `parse_incoming`/`decrypt_body` from per-packet tasks while
/// callers build requests on their own tasks.
pub trait WireCodec: Send + Sync + 'static {
    /// Decode one framed payload (length prefix already stripped) into a
    /// transport packet, removing the outer envelope encryption keyed by
    /// the session credential `d2_key`.
    fn parse_incoming(&self, frame: &[u8], d2_key: &[u8]) -> Result<TransportPacket, AukError>;

    /// Remove the inner body encryption keyed by the per-connection
    /// random key. Only called when the packet's flag word says the body
    /// is encrypted.
    fn decrypt_body(&self, payload: &[u8], random_key: &[u8]) -> Result<Vec<u8>, AukError>;

    /// Serialize one outgoing request envelope (without length prefix).
    fn build_request(&self, envelope: &RequestEnvelope) -> Result<Vec<u8>, AukError>;
}

// ── Reference codec ──────────────────────────────────────────────

/// Magic prefix inside an encrypted body; survives only under the right
/// key, which is what makes a bad decrypt detectable.
const BODY_MAGIC: &[u8; 4] = b"AUK1";

/// First four bytes of the blake3 hash, little-endian.
fn payload_checksum(payload: &[u8]) -> u32 {
    let hash = blake3::hash(payload);
    u32::from_le_bytes([hash.as_bytes()[0], hash.as_bytes()[1], hash.as_bytes()[2], hash.as_bytes()[3]])
}

fn xor_keystream(data: &mut [u8], key: &[u8]) {
    if key.is_empty() {
        return;
    }
    for (i, b) in data.iter_mut().enumerate() {
        *b ^= key[i % key.len()];
    }
}

/// Inbound envelope layout of the reference wire format.
#[derive(Debug, Serialize, Deserialize)]
struct WireFrame {
    command: String,
    seq: u16,
    flags: u8,
    checksum: u32,
    payload: Vec<u8>,
}

/// Reference [`WireCodec`]: bincode + checksum + XOR body cipher.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearCodec;

impl ClearCodec {
    /// Server-side helper: encode one inbound packet the way
    /// `parse_incoming` expects it. Used by mock coordinators in tests.
    pub fn encode_packet(
        command: &str,
        seq: u16,
        flags: PacketFlags,
        payload: &[u8],
    ) -> Result<Vec<u8>, AukError> {
        let frame = WireFrame {
            command: command.to_owned(),
            seq,
            flags: flags.bits(),
            checksum: payload_checksum(payload),
            payload: payload.to_vec(),
        };
        Ok(bincode::serialize(&frame)?)
    }

    /// Server-side helper: encrypt a body with the client's random key
    /// so it round-trips through [`WireCodec::decrypt_body`].
    pub fn seal_body(body: &[u8], random_key: &[u8]) -> Vec<u8> {
        let mut sealed = Vec::with_capacity(BODY_MAGIC.len() + body.len());
        sealed.extend_from_slice(BODY_MAGIC);
        sealed.extend_from_slice(body);
        xor_keystream(&mut sealed, random_key);
        sealed
    }

    /// Server-side helper: decode a request envelope built by
    /// [`WireCodec::build_request`].
    pub fn decode_request(frame: &[u8]) -> Result<RequestEnvelope, AukError> {
        Ok(bincode::deserialize(frame)?)
    }
}

impl WireCodec for ClearCodec {
    fn parse_incoming(&self, frame: &[u8], _d2_key: &[u8]) -> Result<TransportPacket, AukError> {
        let wire: WireFrame = bincode::deserialize(frame)
            .map_err(|_| AukError::InvalidEnvelope("malformed transport frame"))?;
        if payload_checksum(&wire.payload) != wire.checksum {
            return Err(AukError::ChecksumMismatch);
        }
        let flags = PacketFlags::from_bits_truncate(wire.flags);
        Ok(TransportPacket {
            command: wire.command,
            seq: wire.seq,
            flags,
            payload: wire.payload,
        })
    }

    fn decrypt_body(&self, payload: &[u8], random_key: &[u8]) -> Result<Vec<u8>, AukError> {
        if payload.len() < BODY_MAGIC.len() {
            return Err(AukError::DecryptFailed);
        }
        let mut plain = payload.to_vec();
        xor_keystream(&mut plain, random_key);
        if &plain[..BODY_MAGIC.len()] != BODY_MAGIC {
            return Err(AukError::DecryptFailed);
        }
        Ok(plain.split_off(BODY_MAGIC.len()))
    }

    fn build_request(&self, envelope: &RequestEnvelope) -> Result<Vec<u8>, AukError> {
        Ok(bincode::serialize(envelope)?)
    }
}

// ── Tests ────────────────────────────────────────────────────────
