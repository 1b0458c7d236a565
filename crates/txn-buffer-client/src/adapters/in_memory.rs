//! In-memory broker cluster and fixed lookups.
//!
//! Each simulated broker runs as a tokio task that decodes command frames and
//! answers through the reply sink sent with each frame. Topic ownership is a hash
//! of the topic name over the brokers and can be made unreachable as a whole.

use crate::error::{ConnectionError, LookupError};
use crate::ipc::commands::{decode_command, encode_reply, EndTxnReply, ServerError};
use crate::ports::outbound::{BrokerConnection, ConnectionLookup, ReplySink};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How a broker answers commands for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicBehavior {
    /// Apply the command and echo the transaction id
    Acknowledge,
    /// Reply with a failure
    Reject { error: ServerError, message: String },
    /// Accept the frame and never reply
    Silent,
}

type Behaviors = Arc<RwLock<HashMap<String, TopicBehavior>>>;

/// Connection to one simulated broker.
pub struct InMemoryBrokerConnection {
    address: String,
    frames: mpsc::UnboundedSender<(Bytes, ReplySink)>,
    online: AtomicBool,
    received: AtomicU64,
}

impl InMemoryBrokerConnection {
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Frames accepted by this connection.
    pub fn frames_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl BrokerConnection for InMemoryBrokerConnection {
    fn remote_address(&self) -> &str {
        &self.address
    }

    fn send(&self, frame: Bytes, reply_to: &ReplySink) -> Result<(), ConnectionError> {
        if !self.is_online() {
            return Err(ConnectionError::Closed);
        }
        self.frames
            .send((frame, reply_to.clone()))
            .map_err(|_| ConnectionError::Closed)?;
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A set of simulated brokers that also acts as the topic ownership lookup.
pub struct InMemoryCluster {
    brokers: Vec<Arc<InMemoryBrokerConnection>>,
    behaviors: Behaviors,
    ownership_reachable: AtomicBool,
}

impl InMemoryCluster {
    /// Start `broker_count` brokers (at least one) on the current tokio runtime.
    pub fn new(broker_count: usize) -> Self {
        let behaviors: Behaviors = Arc::new(RwLock::new(HashMap::new()));
        let brokers = (0..broker_count.max(1))
            .map(|i| {
                let address = format!("broker-{}:6650", i);
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(run_broker(address.clone(), rx, Arc::clone(&behaviors)));
                Arc::new(InMemoryBrokerConnection {
                    address,
                    frames: tx,
                    online: AtomicBool::new(true),
                    received: AtomicU64::new(0),
                })
            })
            .collect();

        Self {
            brokers,
            behaviors,
            ownership_reachable: AtomicBool::new(true),
        }
    }

    /// Make the ownership table reachable or not. While unreachable every lookup fails.
    pub fn set_ownership_reachable(&self, reachable: bool) {
        self.ownership_reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_topic_behavior(&self, topic: impl Into<String>, behavior: TopicBehavior) {
        self.behaviors.write().insert(topic.into(), behavior);
    }

    /// Take a broker's connection down or bring it back. Sends to a down broker fail.
    pub fn set_broker_online(&self, index: usize, online: bool) {
        if let Some(broker) = self.brokers.get(index) {
            broker.online.store(online, Ordering::SeqCst);
        }
    }

    pub fn broker(&self, index: usize) -> Option<Arc<InMemoryBrokerConnection>> {
        self.brokers.get(index).cloned()
    }

    pub fn broker_count(&self) -> usize {
        self.brokers.len()
    }

    /// Index of the broker owning `topic`.
    pub fn owner_index(&self, topic: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        topic.hash(&mut hasher);
        (hasher.finish() % self.brokers.len() as u64) as usize
    }

    /// Frames accepted across all brokers.
    pub fn frames_received(&self) -> u64 {
        self.brokers.iter().map(|b| b.frames_received()).sum()
    }
}

#[async_trait]
impl ConnectionLookup for InMemoryCluster {
    async fn resolve(&self, topic: &str) -> Result<Arc<dyn BrokerConnection>, LookupError> {
        if !self.ownership_reachable.load(Ordering::SeqCst) {
            return Err(LookupError::TopicNotRoutable {
                topic: topic.to_string(),
            });
        }

        let owner = &self.brokers[self.owner_index(topic)];
        if !owner.is_online() {
            return Err(LookupError::ConnectionUnavailable {
                topic: topic.to_string(),
                broker: owner.address.clone(),
                reason: "broker offline".to_string(),
            });
        }

        let connection: Arc<dyn BrokerConnection> = owner.clone();
        Ok(connection)
    }
}

async fn run_broker(
    address: String,
    mut frames: mpsc::UnboundedReceiver<(Bytes, ReplySink)>,
    behaviors: Behaviors,
) {
    while let Some((frame, reply_to)) = frames.recv().await {
        let command = match decode_command(&frame) {
            Ok(command) => command,
            Err(e) => {
                warn!(broker = %address, error = %e, "Broker dropping undecodable command");
                continue;
            }
        };

        let behavior = behaviors
            .read()
            .get(&command.topic)
            .cloned()
            .unwrap_or(TopicBehavior::Acknowledge);

        let reply = match behavior {
            TopicBehavior::Acknowledge => EndTxnReply::success(command.request_id, command.txn_id),
            TopicBehavior::Reject { error, message } => {
                EndTxnReply::failure(command.request_id, command.txn_id, error, message)
            }
            TopicBehavior::Silent => continue,
        };

        debug!(
            broker = %address,
            request_id = command.request_id,
            topic = %command.topic,
            action = %command.action,
            "Broker answering end-txn command"
        );

        match encode_reply(&reply) {
            Ok(encoded) => {
                if !reply_to.deliver(encoded) {
                    debug!(broker = %address, "Reply sink closed, client gone");
                }
            }
            Err(e) => warn!(broker = %address, error = %e, "Broker failed to encode reply"),
        }
    }
}

/// Connection that accepts every frame and never replies.
pub struct SilentConnection {
    address: String,
    received: AtomicU64,
}

impl SilentConnection {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            received: AtomicU64::new(0),
        }
    }

    pub fn frames_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

impl BrokerConnection for SilentConnection {
    fn remote_address(&self) -> &str {
        &self.address
    }

    fn send(&self, _frame: Bytes, _reply_to: &ReplySink) -> Result<(), ConnectionError> {
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Lookup that resolves every topic to the same connection, or fails every lookup.
pub struct FixedLookup {
    connection: Option<Arc<dyn BrokerConnection>>,
}

impl FixedLookup {
    pub fn new(connection: Arc<dyn BrokerConnection>) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    pub fn unreachable() -> Self {
        Self { connection: None }
    }
}

#[async_trait]
impl ConnectionLookup for FixedLookup {
    async fn resolve(&self, topic: &str) -> Result<Arc<dyn BrokerConnection>, LookupError> {
        self.connection
            .clone()
            .ok_or_else(|| LookupError::TopicNotRoutable {
                topic: topic.to_string(),
            })
    }
}
