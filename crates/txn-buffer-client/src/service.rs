//! Transaction Buffer Client Service - the facade the coordinator calls
//!
//! Resolves the broker owning a topic, then hands the command to the request
//! handler. A failed lookup never reaches the handler, so it leaves no pending entry.

use crate::config::{ConfigError, TxnBufferClientConfig};
use crate::domain::{EndTxnRequest, StatsSnapshot, TxnAction, TxnId};
use crate::error::{TxnBufferError, TxnBufferResult};
use crate::ipc::handler::TransactionBufferHandler;
use crate::ports::inbound::TransactionBufferClient;
use crate::ports::outbound::ConnectionLookup;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transaction buffer client backed by a connection lookup and a request handler.
pub struct TransactionBufferClientService<L>
where
    L: ConnectionLookup,
{
    lookup: Arc<L>,
    handler: TransactionBufferHandler,
}

impl<L> TransactionBufferClientService<L>
where
    L: ConnectionLookup,
{
    /// Create a client with its own request handler.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: TxnBufferClientConfig, lookup: Arc<L>) -> Result<Self, ConfigError> {
        let handler = TransactionBufferHandler::new(config)?;
        Ok(Self::with_handler(lookup, handler))
    }

    /// Create a client around an existing handler.
    pub fn with_handler(lookup: Arc<L>, handler: TransactionBufferHandler) -> Self {
        Self { lookup, handler }
    }

    pub fn handler(&self) -> &TransactionBufferHandler {
        &self.handler
    }

    async fn end_txn(&self, request: EndTxnRequest) -> TxnBufferResult<TxnId> {
        let connection = match self.lookup.resolve(&request.topic).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(
                    topic = %request.topic,
                    txn_id = %request.txn_id,
                    action = %request.action,
                    error = %e,
                    "Lookup failed for end-txn request"
                );
                let error = TxnBufferError::from(e);
                self.handler.record_failure(&error);
                return Err(error);
            }
        };

        debug!(
            topic = %request.topic,
            broker = connection.remote_address(),
            "Resolved owning broker"
        );

        self.handler.submit(&connection, request).await
    }
}

#[async_trait]
impl<L> TransactionBufferClient for TransactionBufferClientService<L>
where
    L: ConnectionLookup + 'static,
{
    async fn commit_txn_on_topic(
        &self,
        topic: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId> {
        self.end_txn(EndTxnRequest::on_topic(
            topic,
            TxnId::new(txn_most_bits, txn_least_bits),
            TxnAction::Commit,
            low_water_mark,
        ))
        .await
    }

    async fn abort_txn_on_topic(
        &self,
        topic: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId> {
        self.end_txn(EndTxnRequest::on_topic(
            topic,
            TxnId::new(txn_most_bits, txn_least_bits),
            TxnAction::Abort,
            low_water_mark,
        ))
        .await
    }

    async fn commit_txn_on_subscription(
        &self,
        topic: &str,
        subscription: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId> {
        self.end_txn(EndTxnRequest::on_subscription(
            topic,
            subscription,
            TxnId::new(txn_most_bits, txn_least_bits),
            TxnAction::Commit,
            low_water_mark,
        ))
        .await
    }

    async fn abort_txn_on_subscription(
        &self,
        topic: &str,
        subscription: &str,
        txn_most_bits: u64,
        txn_least_bits: u64,
        low_water_mark: i64,
    ) -> TxnBufferResult<TxnId> {
        self.end_txn(EndTxnRequest::on_subscription(
            topic,
            subscription,
            TxnId::new(txn_most_bits, txn_least_bits),
            TxnAction::Abort,
            low_water_mark,
        ))
        .await
    }

    fn close(&self) {
        self.handler.close();
    }

    fn pending_count(&self) -> usize {
        self.handler.pending_count()
    }

    fn stats(&self) -> StatsSnapshot {
        self.handler.stats()
    }
}
