//! Request handler: correlates end-of-transaction commands with their replies.
//!
//! Flow:
//! 1. `submit` allocates a request id and registers a pending entry
//! 2. The encoded command goes out on the broker connection with the handler's reply sink
//! 3. The reply listener decodes replies and calls `handle_response`
//! 4. The timeout scheduler evicts entries that outlived the operation timeout
//!
//! Whichever of reply, timeout, close or send failure takes the entry out of the
//! pending table first decides the outcome; the others find nothing and do nothing.

use crate::config::{ConfigError, TxnBufferClientConfig};
use crate::domain::{
    ClientStats, EndTxnRequest, PendingRequest, PendingRequestTable, RequestIdGenerator,
    StatsSnapshot, TxnId,
};
use crate::error::{ConnectionError, TxnBufferError, TxnBufferResult};
use crate::ipc::commands::{decode_reply, encode_command, EndTxnCommand, EndTxnReply, ReplyOutcome};
use crate::metrics;
use crate::ports::outbound::{BrokerConnection, ReplySink};
use crate::scheduler::{TickControl, TimeoutScheduler};
use bytes::Bytes;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Future resolving to the outcome of one submitted request.
#[derive(Debug)]
pub struct TxnFuture {
    request_id: Option<u64>,
    rx: oneshot::Receiver<TxnBufferResult<TxnId>>,
}

impl TxnFuture {
    /// Request id assigned at submission; `None` if the handler was already closed.
    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }
}

impl Future for TxnFuture {
    type Output = TxnBufferResult<TxnId>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped completion slot means the handler went away with the entry.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TxnBufferError::ClientClosed)))
    }
}

struct HandlerInner {
    config: TxnBufferClientConfig,
    pending: PendingRequestTable,
    request_ids: RequestIdGenerator,
    stats: ClientStats,
    reply_sink: ReplySink,
    closed: AtomicBool,
    scheduler: Mutex<Option<TimeoutScheduler>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for HandlerInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

/// Transaction buffer request handler.
///
/// Cheap to clone; clones share the same pending table. Must be created inside
/// a tokio runtime because it spawns the reply listener and the timeout scheduler.
#[derive(Clone)]
pub struct TransactionBufferHandler {
    inner: Arc<HandlerInner>,
}

impl TransactionBufferHandler {
    pub fn new(config: TxnBufferClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let tick = config.tick_interval;
        let inner = Arc::new(HandlerInner {
            config,
            pending: PendingRequestTable::new(),
            request_ids: RequestIdGenerator::new(),
            stats: ClientStats::new(),
            reply_sink: ReplySink::new(reply_tx),
            closed: AtomicBool::new(false),
            scheduler: Mutex::new(None),
            listener: Mutex::new(None),
        });

        // Background tasks hold weak references so dropping the last handler
        // clone releases everything even without close().
        let weak = Arc::downgrade(&inner);
        let scheduler = TimeoutScheduler::start(tick, move || match weak.upgrade() {
            Some(inner) => {
                TransactionBufferHandler { inner }.sweep_expired(Instant::now());
                TickControl::Continue
            }
            None => TickControl::Stop,
        });
        let listener = tokio::spawn(reply_listener(Arc::downgrade(&inner), reply_rx));

        *inner.scheduler.lock() = Some(scheduler);
        *inner.listener.lock() = Some(listener);

        info!(
            operation_timeout_ms = inner.config.operation_timeout.as_millis() as u64,
            tick_ms = inner.config.tick_interval.as_millis() as u64,
            "Transaction buffer handler started"
        );

        Ok(Self { inner })
    }

    /// Send one end-of-transaction command over an already resolved connection.
    ///
    /// Returns immediately; the future resolves on reply, timeout, close or send failure.
    pub fn submit(&self, connection: &Arc<dyn BrokerConnection>, request: EndTxnRequest) -> TxnFuture {
        let (tx, rx) = oneshot::channel();

        if self.is_closed() {
            self.record_failure(&TxnBufferError::ClientClosed);
            let _ = tx.send(Err(TxnBufferError::ClientClosed));
            return TxnFuture {
                request_id: None,
                rx,
            };
        }

        let request_id = self.inner.request_ids.next_id();
        let command = EndTxnCommand::from_request(request_id, &request);
        let frame = match encode_command(&command) {
            Ok(frame) => frame,
            Err(e) => {
                let error = TxnBufferError::Connection(ConnectionError::SendFailed(e.to_string()));
                self.record_failure(&error);
                let _ = tx.send(Err(error));
                return TxnFuture {
                    request_id: Some(request_id),
                    rx,
                };
            }
        };

        let now = Instant::now();
        let Some(deadline) = now.checked_add(self.inner.config.operation_timeout) else {
            // Not reachable with a validated config.
            let error = TxnBufferError::RequestTimeout {
                request_id,
                timeout_ms: self.inner.config.operation_timeout.as_millis() as u64,
            };
            warn!(request_id, "Operation timeout does not yield a representable deadline");
            self.record_failure(&error);
            let _ = tx.send(Err(error));
            return TxnFuture {
                request_id: Some(request_id),
                rx,
            };
        };

        let action = request.action;
        let pending = PendingRequest::new(request_id, request, now, deadline, tx);
        if !self.admit(pending) {
            return TxnFuture {
                request_id: Some(request_id),
                rx,
            };
        }

        debug!(
            request_id,
            topic = %command.topic,
            scope = command.scope.as_str(),
            txn_id = %command.txn_id,
            action = %action,
            broker = connection.remote_address(),
            "Sending end-txn command"
        );

        if let Err(e) = connection.send(frame, &self.inner.reply_sink) {
            warn!(
                request_id,
                broker = connection.remote_address(),
                error = %e,
                "Connection refused end-txn command"
            );
            if let Some(pending) = self.inner.pending.take(request_id) {
                self.finish(pending, Err(TxnBufferError::Connection(e)));
            }
        }

        TxnFuture {
            request_id: Some(request_id),
            rx,
        }
    }

    /// Register a pending entry and count it as submitted.
    ///
    /// Returns false if the entry was completed instead of admitted: its id was
    /// already pending, or the handler closed while it was being inserted.
    fn admit(&self, pending: PendingRequest) -> bool {
        let request_id = pending.request_id;
        let action = pending.request.action;

        if let Err(duplicate) = self.inner.pending.insert(pending) {
            // Ids come from a monotonic counter; a clash means the counter wrapped.
            warn!(request_id, "Request id already pending, rejecting submission");
            let error = TxnBufferError::Connection(ConnectionError::SendFailed(
                "request id collision".into(),
            ));
            self.record_failure(&error);
            duplicate.complete(Err(error));
            return false;
        }

        self.inner.stats.total_submitted.fetch_add(1, Ordering::Relaxed);
        metrics::record_submitted(action.as_str());
        metrics::set_pending_requests(self.inner.pending.len());

        // close() may have drained the table between the caller's check and the insert.
        if self.is_closed() {
            if let Some(pending) = self.inner.pending.take(request_id) {
                self.finish(pending, Err(TxnBufferError::ClientClosed));
            }
            return false;
        }

        true
    }

    /// Complete the pending request a reply belongs to.
    ///
    /// Returns false if the request is no longer pending (timed out, closed,
    /// already answered or never issued); such replies are dropped.
    pub fn handle_response(&self, reply: EndTxnReply) -> bool {
        let Some(pending) = self.inner.pending.take(reply.request_id) else {
            self.inner.stats.total_stale_replies.fetch_add(1, Ordering::Relaxed);
            debug!(
                request_id = reply.request_id,
                txn_id = %reply.txn_id,
                "Reply for unknown or expired request id"
            );
            return false;
        };

        let result = match reply.outcome {
            ReplyOutcome::Success => Ok(reply.txn_id),
            ReplyOutcome::Failure { error, message } => {
                Err(TxnBufferError::RemoteExecution { error, message })
            }
        };
        self.finish(pending, result);
        true
    }

    /// Decode an encoded reply frame and hand it to `handle_response`.
    pub fn handle_frame(&self, frame: &[u8]) -> bool {
        match decode_reply(frame) {
            Ok(reply) => self.handle_response(reply),
            Err(e) => {
                warn!(error = %e, len = frame.len(), "Dropping undecodable reply frame");
                false
            }
        }
    }

    /// Fail every request whose deadline is at or before `now`.
    ///
    /// Returns the number of evicted requests.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let expired = self.inner.pending.take_expired(now);
        let evicted = expired.len();
        let timeout_ms = self.inner.config.operation_timeout.as_millis() as u64;

        for pending in expired {
            warn!(
                request_id = pending.request_id,
                topic = %pending.request.topic,
                txn_id = %pending.request.txn_id,
                timeout_ms,
                "End-txn request timed out"
            );
            let request_id = pending.request_id;
            self.finish(
                pending,
                Err(TxnBufferError::RequestTimeout {
                    request_id,
                    timeout_ms,
                }),
            );
        }

        if evicted > 0 {
            debug!(evicted, "Swept expired requests");
        }
        evicted
    }

    /// Stop the timeout sweep and the reply listener, failing every pending
    /// request with `ClientClosed`. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(scheduler) = self.inner.scheduler.lock().take() {
            scheduler.cancel();
        }
        if let Some(listener) = self.inner.listener.lock().take() {
            listener.abort();
        }

        let drained = self.inner.pending.drain();
        let count = drained.len();
        for pending in drained {
            self.finish(pending, Err(TxnBufferError::ClientClosed));
        }

        info!(failed_pending = count, "Transaction buffer handler closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn config(&self) -> &TxnBufferClientConfig {
        &self.inner.config
    }

    pub(crate) fn record_failure(&self, error: &TxnBufferError) {
        self.inner.stats.record_failure(error);
        metrics::record_failed(error.kind());
    }

    fn finish(&self, pending: PendingRequest, result: TxnBufferResult<TxnId>) {
        let request_id = pending.request_id;
        match &result {
            Ok(txn_id) => {
                let latency = pending.created_at.elapsed();
                self.inner.stats.record_success(pending.request.action);
                metrics::record_succeeded(pending.request.action.as_str(), latency.as_secs_f64());
                debug!(
                    request_id,
                    txn_id = %txn_id,
                    action = %pending.request.action,
                    latency_us = latency.as_micros() as u64,
                    "End-txn request completed"
                );
            }
            Err(e) => {
                self.record_failure(e);
                debug!(request_id, kind = e.kind(), error = %e, "End-txn request failed");
            }
        }
        metrics::set_pending_requests(self.inner.pending.len());

        if !pending.complete(result) {
            debug!(request_id, "Caller dropped its future before completion");
        }
    }
}

/// Reads reply frames delivered through the handler's reply sink.
async fn reply_listener(handler: Weak<HandlerInner>, mut replies: mpsc::UnboundedReceiver<Bytes>) {
    while let Some(frame) = replies.recv().await {
        let Some(inner) = handler.upgrade() else {
            break;
        };
        TransactionBufferHandler { inner }.handle_frame(&frame);
    }
    debug!("Reply listener stopped");
}
