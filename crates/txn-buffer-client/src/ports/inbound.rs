//! Driving port: the API the transaction coordinator calls.

use crate::domain::{StatsSnapshot, TxnId};
use crate::error::TxnBufferResult;
use async_trait::async_trait;

/// Ends transactions on the brokers that own the affected topics and subscriptions.
///
/// Each call resolves the owning broker, sends one command and resolves to the
/// transaction id echoed by the broker. Failures are reported per call and are
/// never retried internally.
#[async_trait]
pub trait TransactionBufferClient: Send + Sync {
    /// Commit the transaction's buffered messages on `topic`.
    async fn commit_txn_on_topic(
        &self,
        topic: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId>;

    /// Abort the transaction's buffered messages on `topic`.
    async fn abort_txn_on_topic(
        &self,
        topic: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId>;

    /// Commit the transaction's acknowledgements on `subscription` of `topic`.
    async fn commit_txn_on_subscription(
        &self,
        topic: &str,
        subscription: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId>;

    /// Abort the transaction's acknowledgements on `subscription` of `topic`.
    async fn abort_txn_on_subscription(
        &self,
        topic: &str,
        subscription: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId>;

    /// Fail every pending request with `ClientClosed` and stop the timeout sweep.
    ///
    /// Idempotent.
    fn close(&self);

    /// Number of requests currently awaiting a reply.
    fn pending_count(&self) -> usize;

    fn stats(&self) -> StatsSnapshot;
}
