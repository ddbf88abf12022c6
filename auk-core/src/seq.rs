//! Sequence-number allocation across the six independent counter spaces.
//!
//! Every outgoing request draws a correlation id from one of these
//! counters. Each space has its own seed, step and wraparound rule:
//!
//! | space               | seed        | step | wrap                  |
//! |---------------------|-------------|------|-----------------------|
//! | transport           | 0x3635      | +1   | 15-bit, never 0       |
//! | request-id          | 1921334513  | +2   | natural i32 overflow  |
//! | group message       | 22911       | +2   | natural i32 overflow  |
//! | friend message      | 22911       | +1   | natural i32 overflow  |
//! | group data transfer | 45291       | +2   | natural i32 overflow  |
//! | highway apply       | 77918       | +2   | natural i32 overflow  |
//!
//! The 32-bit counters return the pre-increment value, so concurrent
//! callers never observe the same id twice within a space.

use std::sync::atomic::{AtomicI32, AtomicU16, Ordering};

const TRANSPORT_SEED: u16 = 0x3635;
const REQUEST_ID_SEED: i32 = 1921334513;
const GROUP_MSG_SEED: i32 = 22911;
const FRIEND_MSG_SEED: i32 = 22911;
const GROUP_DATA_TRANS_SEED: i32 = 45291;
const HIGHWAY_APPLY_SEED: i32 = 77918;

/// The six per-session counters. All methods are lock-free.
#[derive(Debug)]
pub struct SequenceSpaces {
    transport: AtomicU16,
    request_id: AtomicI32,
    group_msg: AtomicI32,
    friend_msg: AtomicI32,
    group_data_trans: AtomicI32,
    highway_apply: AtomicI32,
}

impl SequenceSpaces {
    pub fn new() -> Self {
        Self {
            transport: AtomicU16::new(TRANSPORT_SEED),
            request_id: AtomicI32::new(REQUEST_ID_SEED),
            group_msg: AtomicI32::new(GROUP_MSG_SEED),
            friend_msg: AtomicI32::new(FRIEND_MSG_SEED),
            group_data_trans: AtomicI32::new(GROUP_DATA_TRANS_SEED),
            highway_apply: AtomicI32::new(HIGHWAY_APPLY_SEED),
        }
    }

    /// Next transport sequence: 15-bit space, increments by one, skips 0.
    pub fn next_transport(&self) -> u16 {
        // fetch_update yields the pre-update value; the closure is
        // infallible, so the Err arm is unreachable.
        let prev = self
            .transport
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some(Self::bump(v)))
            .unwrap_or(TRANSPORT_SEED);
        Self::bump(prev)
    }

    fn bump(v: u16) -> u16 {
        let next = (v + 1) & 0x7FFF;
        if next == 0 { 1 } else { next }
    }

    pub fn next_request_id(&self) -> i32 {
        self.request_id.fetch_add(2, Ordering::SeqCst)
    }

    pub fn next_group_seq(&self) -> i32 {
        self.group_msg.fetch_add(2, Ordering::SeqCst)
    }

    pub fn next_friend_seq(&self) -> i32 {
        self.friend_msg.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_group_data_trans_seq(&self) -> i32 {
        self.group_data_trans.fetch_add(2, Ordering::SeqCst)
    }

    pub fn next_highway_apply_seq(&self) -> i32 {
        self.highway_apply.fetch_add(2, Ordering::SeqCst)
    }
}

impl Default for SequenceSpaces {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────
