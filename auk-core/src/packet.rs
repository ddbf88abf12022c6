//! Transport packet shapes shared by the wire codec, the dispatcher and
//! the session loop.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Flag word carried on every inbound transport envelope.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PacketFlags: u8 {
        /// The body is additionally encrypted with the session's
        /// per-connection random key.
        const BODY_ENCRYPTED = 0b0000_0010;
    }
}

/// Outer packet kind, mirroring the two envelope layouts the coordinator
/// accepts.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketKind {
    /// Login-style envelope (credential handshake, keepalive).
    Login = 10,
    /// Ordinary request envelope.
    Simple = 11,
}

/// A decrypted inbound transport packet, ready for dispatch.
#[derive(Debug, Clone)]
pub struct TransportPacket {
    /// Protocol command name, e.g. `"wtlogin.login"`.
    pub command: String,
    /// Transport sequence id used for request/response correlation.
    pub seq: u16,
    pub flags: PacketFlags,
    /// Command payload. Still ciphertext when
    /// [`PacketFlags::BODY_ENCRYPTED`] is set.
    pub payload: Vec<u8>,
}

impl TransportPacket {
    pub fn body_encrypted(&self) -> bool {
        self.flags.contains(PacketFlags::BODY_ENCRYPTED)
    }
}

/// Everything the wire codec needs to build one outgoing request.
///
/// The session-credential fields (`session_id`, `ksid`, `imei`) are
/// opaque pass-through blobs echoed on every request after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub uin: i64,
    pub kind: PacketKind,
    pub command: String,
    pub seq: u16,
    pub session_id: [u8; 4],
    pub ksid: Vec<u8>,
    pub imei: String,
    pub body: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypted_flag_is_wire_value_two() {
        assert_eq!(PacketFlags::BODY_ENCRYPTED.bits(), 2);
        let pkt = TransportPacket {
            command: "OnlinePush.ReqPush".into(),
            seq: 4,
            flags: PacketFlags::BODY_ENCRYPTED,
            payload: vec![1, 2, 3],
        };
        assert!(pkt.body_encrypted());
    }
}
