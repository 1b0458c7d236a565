//! # Request Lifecycle
//!
//! Timeouts swept by the tick task, replies arriving after their request is
//! gone, and shutdown of a client with requests in flight.

#[cfg(test)]
mod tests {
    use super::super::{cluster_client, partition};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;
    use txn_buffer_client::adapters::{FixedLookup, TopicBehavior};
    use txn_buffer_client::ipc::commands::{decode_command, encode_reply, EndTxnCommand};
    use txn_buffer_client::{
        BrokerConnection, ConnectionError, EndTxnReply, ReplySink, TransactionBufferClient,
        TransactionBufferClientService, TxnBufferClientConfig, TxnBufferError, TxnId,
    };

    /// Broker connection the test answers by hand, at any time.
    #[derive(Default)]
    struct ManualConnection {
        received: Mutex<Vec<(EndTxnCommand, ReplySink)>>,
    }

    impl ManualConnection {
        fn received(&self) -> usize {
            self.received.lock().len()
        }

        fn answer(&self, index: usize) -> bool {
            let (command, sink) = self.received.lock()[index].clone();
            let reply = EndTxnReply::success(command.request_id, command.txn_id);
            sink.deliver(encode_reply(&reply).unwrap())
        }
    }

    impl BrokerConnection for ManualConnection {
        fn remote_address(&self) -> &str {
            "manual:6650"
        }

        fn send(&self, frame: Bytes, reply_to: &ReplySink) -> Result<(), ConnectionError> {
            let command = decode_command(&frame).unwrap();
            self.received.lock().push((command, reply_to.clone()));
            Ok(())
        }
    }

    fn manual_client(
        timeout: Duration,
    ) -> (
        Arc<ManualConnection>,
        Arc<TransactionBufferClientService<FixedLookup>>,
    ) {
        let manual = Arc::new(ManualConnection::default());
        let connection: Arc<dyn BrokerConnection> = manual.clone();
        let config = TxnBufferClientConfig::default()
            .with_operation_timeout(timeout)
            .with_tick_interval(Duration::from_millis(100));
        let client =
            TransactionBufferClientService::new(config, Arc::new(FixedLookup::new(connection)))
                .unwrap();
        (manual, Arc::new(client))
    }

    async fn wait_for_pending<C: TransactionBufferClient>(client: &C, count: usize) {
        for _ in 0..1_000 {
            if client.pending_count() == count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("pending count never reached {}", count);
    }

    // =========================================================================
    // TIMEOUTS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_silent_broker_times_out_after_timeout() {
        let (cluster, client) = cluster_client(Duration::from_secs(2));
        let client = Arc::new(client);
        let topic = partition(0);
        cluster.set_topic_behavior(topic.clone(), TopicBehavior::Silent);

        let before = client.pending_count();
        let started = Instant::now();
        let call = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.abort_txn_on_topic(&topic, 1, 1, 1).await })
        };

        wait_for_pending(client.as_ref(), before + 1).await;

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            TxnBufferError::RequestTimeout {
                timeout_ms: 2000,
                ..
            }
        ));
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(client.pending_count(), before);
        assert_eq!(client.stats().total_timeouts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_do_not_affect_answered_requests() {
        let (manual, client) = manual_client(Duration::from_secs(2));

        let slow = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.commit_txn_on_topic("slow", 1, 1, 0).await })
        };
        let fast = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.commit_txn_on_topic("fast", 1, 2, 0).await })
        };
        wait_for_pending(client.as_ref(), 2).await;

        let fast_index = {
            let received = manual.received.lock();
            received
                .iter()
                .position(|(c, _)| c.topic == "fast")
                .unwrap()
        };
        assert!(manual.answer(fast_index));

        assert_eq!(fast.await.unwrap().unwrap(), TxnId::new(1, 2));
        assert!(matches!(
            slow.await.unwrap(),
            Err(TxnBufferError::RequestTimeout { .. })
        ));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_timeout_is_dropped() {
        let (manual, client) = manual_client(Duration::from_secs(1));

        let err = client.commit_txn_on_topic("late", 3, 3, 0).await.unwrap_err();
        assert!(matches!(err, TxnBufferError::RequestTimeout { .. }));
        assert_eq!(manual.received(), 1);

        assert!(manual.answer(0));
        for _ in 0..1_000 {
            if client.stats().total_stale_replies == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }

        let stats = client.stats();
        assert_eq!(stats.total_stale_replies, 1);
        assert_eq!(stats.total_committed, 0);
        assert_eq!(client.pending_count(), 0);
    }

    // =========================================================================
    // CLOSE
    // =========================================================================

    #[tokio::test]
    async fn test_close_fails_in_flight_requests_once() {
        let (manual, client) = manual_client(Duration::from_secs(30));

        let calls: Vec<_> = (0..3u64)
            .map(|i| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.abort_txn_on_topic("t", 1, i, 0).await })
            })
            .collect();
        wait_for_pending(client.as_ref(), 3).await;

        client.close();
        client.close();

        for call in calls {
            assert_eq!(call.await.unwrap(), Err(TxnBufferError::ClientClosed));
        }
        assert_eq!(client.pending_count(), 0);
        assert_eq!(client.stats().total_closed, 3);

        // A reply racing the close finds nothing to complete
        manual.answer(0);
        tokio::task::yield_now().await;
        assert_eq!(client.stats().total_aborted, 0);
    }

    #[tokio::test]
    async fn test_operations_after_close_fail_fast() {
        let (manual, client) = manual_client(Duration::from_secs(30));
        client.close();

        let err = client
            .commit_txn_on_subscription("t", "sub", 1, 1, 0)
            .await
            .unwrap_err();
        assert_eq!(err, TxnBufferError::ClientClosed);
        assert!(!err.is_retryable());
        assert_eq!(manual.received(), 0);
        assert_eq!(client.stats().total_submitted, 0);
    }
}
