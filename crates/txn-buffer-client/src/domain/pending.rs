//! Pending request table.
//!
//! Maps request ids to in-flight end-of-transaction requests. Every terminal event
//! (reply, timeout sweep, close, send failure) goes through `take`/`take_expired`/`drain`,
//! so whichever event removes an entry first is the only one that completes it.
//!
//! Entries are kept ordered by request id. Ids are handed out monotonically and the
//! operation timeout is the same for every request of a handler, so id order is also
//! deadline order. `take_expired` relies on this to stop at the first live entry.

use crate::domain::{EndTxnRequest, TxnId};
use crate::error::TxnBufferResult;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Completion slot handed to the caller; single assignment.
pub type Completion = oneshot::Sender<TxnBufferResult<TxnId>>;

/// Monotonic request id source, never reused for the lifetime of a handler.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// An in-flight request waiting for its reply.
#[derive(Debug)]
pub struct PendingRequest {
    pub request_id: u64,
    pub request: EndTxnRequest,
    pub created_at: Instant,
    pub deadline: Instant,
    completion: Completion,
}

impl PendingRequest {
    pub fn new(
        request_id: u64,
        request: EndTxnRequest,
        created_at: Instant,
        deadline: Instant,
        completion: Completion,
    ) -> Self {
        Self {
            request_id,
            request,
            created_at,
            deadline,
            completion,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline <= now
    }

    /// Assign the terminal outcome.
    ///
    /// Returns false if the caller already dropped its future.
    pub fn complete(self, result: TxnBufferResult<TxnId>) -> bool {
        self.completion.send(result).is_ok()
    }
}

/// Ordered table of pending requests, safe for concurrent use.
///
/// The internal lock is held only for map operations; completions happen after
/// the entry has left the table.
#[derive(Debug, Default)]
pub struct PendingRequestTable {
    entries: Mutex<BTreeMap<u64, PendingRequest>>,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. Hands the entry back if the id is already present.
    pub fn insert(&self, pending: PendingRequest) -> Result<(), PendingRequest> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&pending.request_id) {
            return Err(pending);
        }
        entries.insert(pending.request_id, pending);
        Ok(())
    }

    /// Remove and return the entry for `request_id`, if still pending.
    pub fn take(&self, request_id: u64) -> Option<PendingRequest> {
        self.entries.lock().remove(&request_id)
    }

    /// Remove every entry whose deadline has passed, oldest first.
    ///
    /// Stops at the first entry that has not expired yet.
    pub fn take_expired(&self, now: Instant) -> Vec<PendingRequest> {
        let mut entries = self.entries.lock();
        let mut expired = Vec::new();
        while let Some(oldest) = entries.first_entry() {
            if !oldest.get().is_expired(now) {
                break;
            }
            expired.push(oldest.remove());
        }
        expired
    }

    /// Remove every entry, in id order.
    pub fn drain(&self) -> Vec<PendingRequest> {
        let entries = std::mem::take(&mut *self.entries.lock());
        entries.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, request_id: u64) -> bool {
        self.entries.lock().contains_key(&request_id)
    }
}
