//! Request outcome counters.

use crate::domain::TxnAction;
use crate::error::TxnBufferError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for one client instance.
#[derive(Debug, Default)]
pub struct ClientStats {
    /// Requests handed to a connection
    pub total_submitted: AtomicU64,
    /// Commits acknowledged by the owning broker
    pub total_committed: AtomicU64,
    /// Aborts acknowledged by the owning broker
    pub total_aborted: AtomicU64,
    /// Requests rejected by the broker
    pub total_remote_failures: AtomicU64,
    /// Requests evicted by the timeout sweep
    pub total_timeouts: AtomicU64,
    /// Requests failed by close
    pub total_closed: AtomicU64,
    /// Requests whose frame the connection refused
    pub total_connection_failures: AtomicU64,
    /// Operations that never reached the handler because lookup failed
    pub total_lookup_failures: AtomicU64,
    /// Replies for ids no longer pending
    pub total_stale_replies: AtomicU64,
}

/// Point-in-time copy of [`ClientStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_submitted: u64,
    pub total_committed: u64,
    pub total_aborted: u64,
    pub total_remote_failures: u64,
    pub total_timeouts: u64,
    pub total_closed: u64,
    pub total_connection_failures: u64,
    pub total_lookup_failures: u64,
    pub total_stale_replies: u64,
}

impl ClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, action: TxnAction) {
        match action {
            TxnAction::Commit => self.total_committed.fetch_add(1, Ordering::Relaxed),
            TxnAction::Abort => self.total_aborted.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Count a failed request under its error kind.
    pub fn record_failure(&self, error: &TxnBufferError) {
        let counter = match error {
            TxnBufferError::Lookup(_) => &self.total_lookup_failures,
            TxnBufferError::RequestTimeout { .. } => &self.total_timeouts,
            TxnBufferError::RemoteExecution { .. } => &self.total_remote_failures,
            TxnBufferError::ClientClosed => &self.total_closed,
            TxnBufferError::Connection(_) => &self.total_connection_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_submitted: self.total_submitted.load(Ordering::Relaxed),
            total_committed: self.total_committed.load(Ordering::Relaxed),
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            total_remote_failures: self.total_remote_failures.load(Ordering::Relaxed),
            total_timeouts: self.total_timeouts.load(Ordering::Relaxed),
            total_closed: self.total_closed.load(Ordering::Relaxed),
            total_connection_failures: self.total_connection_failures.load(Ordering::Relaxed),
            total_lookup_failures: self.total_lookup_failures.load(Ordering::Relaxed),
            total_stale_replies: self.total_stale_replies.load(Ordering::Relaxed),
        }
    }
}
