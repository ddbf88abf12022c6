//! Push-style events and the subscriber registry.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::message::{GroupMessage, PrivateMessage};

// ── System-message request records ───────────────────────────────

/// Someone asked to join a group this account administers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserJoinGroupRequest {
    pub request_id: i64,
    pub requester_uin: i64,
    pub requester_nick: String,
    pub group_code: i64,
    pub group_name: String,
}

/// This account was invited into a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInvitedRequest {
    pub request_id: i64,
    pub invitor_uin: i64,
    pub invitor_nick: String,
    pub group_code: i64,
    pub group_name: String,
}

/// Incoming friend request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFriendRequest {
    pub request_id: i64,
    pub requester_uin: i64,
    pub requester_nick: String,
    pub message: String,
}

// ── Events ───────────────────────────────────────────────────────

/// Everything the engine surfaces to embedders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// The session terminated; emitted exactly once per session with the
    /// best-known reason.
    Disconnected { message: String },
    GroupMessage(GroupMessage),
    PrivateMessage(PrivateMessage),
    GroupMemberLeft { group_code: i64, member_uin: i64 },
    JoinGroupRequest(UserJoinGroupRequest),
    GroupInvited(GroupInvitedRequest),
    FriendRequest(NewFriendRequest),
    /// The server force-closed the session (logged in elsewhere, etc.).
    ForceOffline { message: String },
}

// ── Subscriber registry ──────────────────────────────────────────

pub type EventHandler = Box<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; pass it back to
/// [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

struct WrappedHandler {
    id: u64,
    handler: EventHandler,
}

/// Fan-out registry for push events. Emission iterates subscribers under
/// a read lock; subscription churn takes the write lock briefly.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<WrappedHandler>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers
            .write()
            .expect("event bus poisoned")
            .push(WrappedHandler { id, handler: Box::new(handler) });
        HandlerId(id)
    }

    pub fn unsubscribe(&self, id: HandlerId) {
        self.handlers
            .write()
            .expect("event bus poisoned")
            .retain(|w| w.id != id.0);
    }

    pub fn emit(&self, event: &Event) {
        for wrapped in self.handlers.read().expect("event bus poisoned").iter() {
            (wrapped.handler)(event);
        }
    }
}

// ── Receipt waiters ──────────────────────────────────────────────

/// Transient listeners for group-send receipts, keyed by a correlation
/// token and matched on the random tag carried by the send.
///
/// A sender registers before transmitting and is guaranteed to be
/// deregistered on return (see the drop guard in the messaging path),
/// so the table cannot grow past the number of in-flight sends.
#[derive(Default)]
pub(crate) struct ReceiptWaiters {
    slots: std::sync::Mutex<std::collections::HashMap<u64, ReceiptSlot>>,
    next_token: AtomicU64,
}

struct ReceiptSlot {
    rand: u32,
    tx: tokio::sync::oneshot::Sender<i32>,
}

impl ReceiptWaiters {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for a receipt carrying `rand`; returns the
    /// deregistration token and the receiving half.
    pub(crate) fn register(&self, rand: u32) -> (u64, tokio::sync::oneshot::Receiver<i32>) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.slots
            .lock()
            .expect("receipt table poisoned")
            .insert(token, ReceiptSlot { rand, tx });
        (token, rx)
    }

    /// Deliver an assigned message id to every waiter matching `rand`.
    pub(crate) fn deliver(&self, rand: u32, seq: i32) {
        let mut slots = self.slots.lock().expect("receipt table poisoned");
        let tokens: Vec<u64> =
            slots.iter().filter(|(_, s)| s.rand == rand).map(|(&t, _)| t).collect();
        for token in tokens {
            if let Some(slot) = slots.remove(&token) {
                let _ = slot.tx.send(seq);
            }
        }
    }

    pub(crate) fn deregister(&self, token: u64) {
        self.slots.lock().expect("receipt table poisoned").remove(&token);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().expect("receipt table poisoned").len()
    }
}

// ── Tests ────────────────────────────────────────────────────────
