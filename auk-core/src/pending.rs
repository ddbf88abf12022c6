//! Outstanding-request table: the request/response correlation primitive.
//!
//! Each in-flight correlated request owns exactly one slot keyed by its
//! transport sequence id. The slot is removed at the moment it is
//! completed, which is what makes fulfillment exactly-once: a duplicate
//! packet for the same sequence finds no slot and is dropped.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::error::AukError;

type Slot<T> = oneshot::Sender<Result<T, AukError>>;

/// Concurrent map of sequence id → one-shot completion signal.
///
/// Generic over the response payload so the engine and its tests can use
/// it independently of the protocol's response enum.
#[derive(Debug)]
pub struct PendingRequests<T> {
    slots: Mutex<HashMap<u16, Slot<T>>>,
}

impl<T> PendingRequests<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Register a waiter for `seq` and return the receiving half.
    ///
    /// At most one waiter may exist per sequence id; a second
    /// registration while the first is outstanding replaces it (the
    /// allocator's monotonicity makes this unreachable in practice, but
    /// the table must not leak the stale sender either way).
    pub fn register(&self, seq: u16) -> oneshot::Receiver<Result<T, AukError>> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().expect("pending table poisoned").insert(seq, tx);
        rx
    }

    /// Complete the waiter for `seq`, removing it from the table.
    ///
    /// Returns `true` when a waiter existed. Completing a sequence with
    /// no waiter is not an error — server pushes outnumber correlated
    /// responses.
    pub fn complete(&self, seq: u16, result: Result<T, AukError>) -> bool {
        let slot = self.slots.lock().expect("pending table poisoned").remove(&seq);
        match slot {
            Some(tx) => {
                // The receiver may have timed out concurrently; either
                // way the slot is gone, which is the invariant we need.
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Drop the waiter for `seq` without completing it (timeout path).
    pub fn discard(&self, seq: u16) {
        self.slots.lock().expect("pending table poisoned").remove(&seq);
    }

    /// Number of in-flight requests.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("pending table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for PendingRequests<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn complete_delivers_and_removes() {
        let table: PendingRequests<u32> = PendingRequests::new();
        let rx = table.register(7);
        assert_eq!(table.len(), 1);

        assert!(table.complete(7, Ok(42)));
        assert!(table.is_empty());
        assert_eq!(rx.await.unwrap().unwrap(), 42);
    }

    #[tokio::test]
    async fn duplicate_completion_finds_no_slot() {
        let table: PendingRequests<u32> = PendingRequests::new();
        let _rx = table.register(7);
        assert!(table.complete(7, Ok(1)));
        // A late duplicate packet for the same sequence must not fulfill.
        assert!(!table.complete(7, Ok(2)));
    }

    #[tokio::test]
    async fn completion_without_waiter_is_noop() {
        let table: PendingRequests<u32> = PendingRequests::new();
        assert!(!table.complete(1234, Ok(9)));
    }

    #[tokio::test]
    async fn discard_removes_without_completing() {
        let table: PendingRequests<u32> = PendingRequests::new();
        let rx = table.register(9);
        table.discard(9);
        assert!(table.is_empty());
        // Sender dropped: receiver observes closure, not a value.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn error_results_propagate() {
        let table: PendingRequests<u32> = PendingRequests::new();
        let rx = table.register(3);
        table.complete(3, Err(AukError::Timeout(Duration::from_secs(15))));
        assert!(matches!(rx.await.unwrap(), Err(AukError::Timeout(_))));
    }

    #[tokio::test]
    async fn timeout_path_leaves_table_clean() {
        let table: PendingRequests<u32> = PendingRequests::new();
        let rx = table.register(5);
        let res = tokio::time::timeout(Duration::from_millis(20), rx).await;
        assert!(res.is_err());
        table.discard(5);
        assert!(table.is_empty());
        // The sequence id is reusable afterwards.
        let rx2 = table.register(5);
        assert!(table.complete(5, Ok(1)));
        assert_eq!(rx2.await.unwrap().unwrap(), 1);
    }
}
