//! Per-session mutable state: identity, credentials, counters, caches.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::seq::SequenceSpaces;

/// Session identifier echoed on every outgoing envelope.
pub const SESSION_ID: [u8; 4] = [0x02, 0xB0, 0x5B, 0x8B];

/// Device/session ksid blob issued out-of-band and echoed verbatim.
pub const KSID: &[u8] = b"|454001228437590|A8.2.7.27f6ea96";

/// Credential bundle received at login. Opaque to the engine beyond
/// being forwarded on later requests; only `d2_key` is consumed locally
/// (envelope decryption).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SigInfo {
    pub login_bitmap: u64,
    pub tgt: Vec<u8>,
    pub tgt_key: Vec<u8>,
    pub user_st_key: Vec<u8>,
    pub user_st_web_sig: Vec<u8>,
    pub s_key: Vec<u8>,
    pub d2: Vec<u8>,
    pub d2_key: Vec<u8>,
    pub wt_session_ticket_key: Vec<u8>,
    pub device_token: Vec<u8>,
}

/// State owned by one authenticated connection.
///
/// Created at client construction with default counters; the credential
/// bundle is populated only after a successful login; the push-dedup
/// cache is cleared on every (re)connect.
#[derive(Debug)]
pub struct Session {
    pub uin: i64,
    pub password_digest: [u8; 16],
    pub nickname: Mutex<String>,
    online: AtomicBool,

    pub seqs: SequenceSpaces,
    pub sig: Mutex<SigInfo>,

    /// Per-connection random key used for inner body decryption.
    pub random_key: [u8; 16],
    pub session_id: [u8; 4],
    pub ksid: Vec<u8>,

    last_lost_reason: Mutex<String>,
    online_push_cache: Mutex<Vec<i16>>,
    last_seen_seq: Mutex<HashMap<i64, i32>>,
}

impl Session {
    pub fn new(uin: i64, password_digest: [u8; 16]) -> Self {
        let mut random_key = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut random_key);
        Self {
            uin,
            password_digest,
            nickname: Mutex::new(String::new()),
            online: AtomicBool::new(false),
            seqs: SequenceSpaces::new(),
            sig: Mutex::new(SigInfo::default()),
            random_key,
            session_id: SESSION_ID,
            ksid: KSID.to_vec(),
            last_lost_reason: Mutex::new(String::new()),
            online_push_cache: Mutex::new(Vec::new()),
            last_seen_seq: Mutex::new(HashMap::new()),
        }
    }

    // ── Online flag ──────────────────────────────────────────────

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    // ── Connection-scoped caches ─────────────────────────────────

    /// Reset connection-scoped state. Called on every dial, including
    /// mid-session re-dials.
    pub fn reset_connection_state(&self) {
        self.online_push_cache.lock().expect("push cache poisoned").clear();
    }

    /// Record a push sequence; returns `true` when it was already seen
    /// on this connection (duplicate delivery).
    pub fn push_seen(&self, seq: i16) -> bool {
        let mut cache = self.online_push_cache.lock().expect("push cache poisoned");
        if cache.contains(&seq) {
            return true;
        }
        cache.push(seq);
        false
    }

    #[cfg(test)]
    pub(crate) fn push_cache_len(&self) -> usize {
        self.online_push_cache.lock().expect("push cache poisoned").len()
    }

    /// Last message sequence observed from a friend; returns the
    /// previous value.
    pub fn note_friend_seq(&self, friend_uin: i64, seq: i32) -> Option<i32> {
        self.last_seen_seq
            .lock()
            .expect("seq map poisoned")
            .insert(friend_uin, seq)
    }

    pub fn last_friend_seq(&self, friend_uin: i64) -> Option<i32> {
        self.last_seen_seq.lock().expect("seq map poisoned").get(&friend_uin).copied()
    }

    // ── Disconnect reason ────────────────────────────────────────

    pub fn note_disconnect_reason(&self, reason: impl Into<String>) {
        *self.last_lost_reason.lock().expect("reason poisoned") = reason.into();
    }

    pub fn clear_disconnect_reason(&self) {
        self.last_lost_reason.lock().expect("reason poisoned").clear();
    }

    /// Best-known reason for the session ending, with the generic
    /// fallback when nothing more specific was recorded.
    pub fn disconnect_reason(&self) -> String {
        let reason = self.last_lost_reason.lock().expect("reason poisoned");
        if reason.is_empty() {
            "Connection lost.".into()
        } else {
            reason.clone()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(123456789, [7u8; 16])
    }

    #[test]
    fn starts_offline_with_default_counters() {
        let s = session();
        assert!(!s.is_online());
        assert_eq!(s.seqs.next_transport(), 0x3636);
        assert!(s.sig.lock().unwrap().d2_key.is_empty());
    }

    #[test]
    fn random_key_differs_between_sessions() {
        assert_ne!(session().random_key, session().random_key);
    }

    #[test]
    fn push_dedup_and_reset() {
        let s = session();
        assert!(!s.push_seen(300));
        assert!(s.push_seen(300));
        assert!(!s.push_seen(301));
        s.reset_connection_state();
        assert_eq!(s.push_cache_len(), 0);
        assert!(!s.push_seen(300));
    }

    #[test]
    fn disconnect_reason_defaults() {
        let s = session();
        assert_eq!(s.disconnect_reason(), "Connection lost.");
        s.note_disconnect_reason("Kicked by server.");
        assert_eq!(s.disconnect_reason(), "Kicked by server.");
        s.clear_disconnect_reason();
        assert_eq!(s.disconnect_reason(), "Connection lost.");
    }

    #[test]
    fn friend_seq_tracking() {
        let s = session();
        assert_eq!(s.note_friend_seq(42, 100), None);
        assert_eq!(s.note_friend_seq(42, 101), Some(100));
        assert_eq!(s.last_friend_seq(42), Some(101));
        assert_eq!(s.last_friend_seq(43), None);
    }
}
