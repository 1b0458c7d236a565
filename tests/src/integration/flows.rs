//! # Commit / Abort Flows
//!
//! Drives the client facade against an in-memory cluster whose brokers own
//! partitions by hash:
//!
//! 1. Commit and abort on every partition, both scopes
//! 2. Lookup failure while ownership is unreachable, then recovery
//! 3. Lookup of topics the cluster has never seen
//! 4. Broker-side rejections surfacing as remote execution failures

#[cfg(test)]
mod tests {
    use super::super::{cluster_client, partition, PARTITIONS};
    use futures::future::join_all;
    use std::sync::Arc;
    use std::time::Duration;
    use txn_buffer_client::adapters::{InMemoryCluster, TopicBehavior};
    use txn_buffer_client::{
        LookupError, ServerError, TransactionBufferClient, TransactionBufferClientService,
        TxnBufferClientConfig, TxnBufferError, TxnId,
    };

    const SUBSCRIPTION: &str = "test";

    // =========================================================================
    // PARTITIONED TOPIC FLOWS
    // =========================================================================

    #[tokio::test]
    async fn test_commit_on_every_partition() {
        let (_cluster, client) = cluster_client(Duration::from_secs(30));

        let topics: Vec<String> = (0..PARTITIONS).map(partition).collect();
        let results = join_all(
            topics
                .iter()
                .enumerate()
                .map(|(i, topic)| client.commit_txn_on_topic(topic, 1, i as u64, i64::MIN)),
        )
        .await;

        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), TxnId::new(1, i as u64));
        }
        assert_eq!(client.pending_count(), 0);
        assert_eq!(client.stats().total_committed, PARTITIONS);
    }

    #[tokio::test]
    async fn test_abort_on_every_partition() {
        let (_cluster, client) = cluster_client(Duration::from_secs(30));

        let topics: Vec<String> = (0..PARTITIONS).map(partition).collect();
        let results = join_all(
            topics
                .iter()
                .enumerate()
                .map(|(i, topic)| client.abort_txn_on_topic(topic, 1, i as u64, i64::MIN)),
        )
        .await;

        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap(), TxnId::new(1, i as u64));
        }
        assert_eq!(client.stats().total_aborted, PARTITIONS);
    }

    #[tokio::test]
    async fn test_commit_and_abort_on_subscription() {
        let (_cluster, client) = cluster_client(Duration::from_secs(30));

        let topics: Vec<String> = (0..PARTITIONS).map(partition).collect();
        let commits = join_all(topics.iter().enumerate().map(|(i, topic)| {
            client.commit_txn_on_subscription(topic, SUBSCRIPTION, 1, i as u64, -1)
        }))
        .await;
        let aborts = join_all(topics.iter().enumerate().map(|(i, topic)| {
            client.abort_txn_on_subscription(topic, SUBSCRIPTION, 1, i as u64, -1)
        }))
        .await;

        for (i, (commit, abort)) in commits.into_iter().zip(aborts).enumerate() {
            assert_eq!(commit.unwrap(), TxnId::new(1, i as u64));
            assert_eq!(abort.unwrap(), TxnId::new(1, i as u64));
        }

        let stats = client.stats();
        assert_eq!(stats.total_submitted, 2 * PARTITIONS);
        assert_eq!(stats.total_committed, PARTITIONS);
        assert_eq!(stats.total_aborted, PARTITIONS);
        assert_eq!(client.pending_count(), 0);
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    #[tokio::test]
    async fn test_unreachable_ownership_then_recovery() {
        let (cluster, client) = cluster_client(Duration::from_secs(30));
        let topic = partition(0);

        cluster.set_ownership_reachable(false);
        let before = client.pending_count();

        let err = client
            .abort_txn_on_subscription(&topic, SUBSCRIPTION, 1, 7, -1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TxnBufferError::Lookup(LookupError::TopicNotRoutable { .. })
        ));
        assert!(err.is_retryable());

        let err = client.abort_txn_on_topic(&topic, 1, 7, -1).await.unwrap_err();
        assert!(matches!(err, TxnBufferError::Lookup(_)));
        assert_eq!(client.pending_count(), before);
        assert_eq!(cluster.frames_received(), 0);

        cluster.set_ownership_reachable(true);

        assert_eq!(
            client
                .abort_txn_on_subscription(&topic, SUBSCRIPTION, 1, 7, -1)
                .await
                .unwrap(),
            TxnId::new(1, 7)
        );
        assert_eq!(
            client.abort_txn_on_topic(&topic, 1, 7, -1).await.unwrap(),
            TxnId::new(1, 7)
        );

        let stats = client.stats();
        assert_eq!(stats.total_lookup_failures, 2);
        assert_eq!(stats.total_aborted, 2);
    }

    #[tokio::test]
    async fn test_lookup_of_unseen_topics() {
        let (cluster, client) = cluster_client(Duration::from_secs(30));

        for i in 0..PARTITIONS {
            let topic = format!("persistent://public/test/tb-lookup-{}", i);
            assert_eq!(
                client.commit_txn_on_topic(&topic, 2, i, 0).await.unwrap(),
                TxnId::new(2, i)
            );
        }
        assert_eq!(cluster.frames_received(), PARTITIONS);
    }

    #[tokio::test]
    async fn test_offline_owner_fails_lookup() {
        let (cluster, client) = cluster_client(Duration::from_secs(30));
        let topic = partition(3);
        let owner = cluster.owner_index(&topic);

        cluster.set_broker_online(owner, false);
        let err = client.commit_txn_on_topic(&topic, 1, 3, 0).await.unwrap_err();
        assert!(matches!(
            err,
            TxnBufferError::Lookup(LookupError::ConnectionUnavailable { .. })
        ));

        cluster.set_broker_online(owner, true);
        assert!(client.commit_txn_on_topic(&topic, 1, 3, 0).await.is_ok());
    }

    // =========================================================================
    // REMOTE FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_rejected_command_surfaces_server_error() {
        let (cluster, client) = cluster_client(Duration::from_secs(30));
        let topic = partition(4);
        cluster.set_topic_behavior(
            topic.clone(),
            TopicBehavior::Reject {
                error: ServerError::TransactionConflict,
                message: "txn (1,4) already committed".into(),
            },
        );

        match client.abort_txn_on_topic(&topic, 1, 4, 0).await {
            Err(TxnBufferError::RemoteExecution { error, message }) => {
                assert_eq!(error, ServerError::TransactionConflict);
                assert!(message.contains("already committed"));
            }
            other => panic!("expected remote execution failure, got {:?}", other),
        }

        // Other partitions are unaffected
        assert!(client.abort_txn_on_topic(&partition(5), 1, 5, 0).await.is_ok());
        assert_eq!(client.stats().total_remote_failures, 1);
    }

    #[tokio::test]
    async fn test_clients_sharing_brokers_keep_replies_apart() {
        let cluster = Arc::new(InMemoryCluster::new(2));
        let first = TransactionBufferClientService::new(
            TxnBufferClientConfig::default(),
            Arc::clone(&cluster),
        )
        .unwrap();
        let second = TransactionBufferClientService::new(
            TxnBufferClientConfig::default(),
            Arc::clone(&cluster),
        )
        .unwrap();

        // Both clients allocate request id 0 first
        let topic = partition(0);
        let (a, b) = tokio::join!(
            first.commit_txn_on_topic(&topic, 10, 1, 0),
            second.commit_txn_on_topic(&topic, 20, 2, 0)
        );

        assert_eq!(a.unwrap(), TxnId::new(10, 1));
        assert_eq!(b.unwrap(), TxnId::new(20, 2));
        assert_eq!(first.stats().total_stale_replies, 0);
        assert_eq!(second.stats().total_stale_replies, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_all_resolve() {
        let (_cluster, client) = cluster_client(Duration::from_secs(30));
        let client = Arc::new(client);

        let mut tasks = Vec::new();
        for worker in 0..8u64 {
            let client = Arc::clone(&client);
            tasks.push(tokio::spawn(async move {
                for i in 0..25u64 {
                    let topic = partition(i % PARTITIONS);
                    let txn = client.commit_txn_on_topic(&topic, worker, i, 0).await.unwrap();
                    assert_eq!(txn, TxnId::new(worker, i));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(client.stats().total_committed, 200);
        assert_eq!(client.pending_count(), 0);
    }
}
