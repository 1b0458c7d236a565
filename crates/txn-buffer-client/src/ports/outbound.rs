//! Driven ports: broker routing and broker connections.
//!
//! Wire encoding, connection establishment and pooling live behind these traits.

use crate::error::{ConnectionError, LookupError};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Return path for encoded reply frames.
///
/// Each command frame is sent together with the sink its reply must be delivered
/// to, so one connection can serve several clients whose request ids overlap.
#[derive(Debug, Clone)]
pub struct ReplySink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ReplySink {
    pub fn new(tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { tx }
    }

    /// Deliver an encoded reply. Returns false once the receiving handler is gone.
    pub fn deliver(&self, frame: Bytes) -> bool {
        self.tx.send(frame).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Connection to the broker that owns a topic.
pub trait BrokerConnection: Send + Sync {
    /// Address of the remote broker, for logs.
    fn remote_address(&self) -> &str;

    /// Enqueue an encoded command frame.
    ///
    /// Must not block. An `Err` means the frame was not accepted and no reply
    /// will ever arrive for it.
    fn send(&self, frame: Bytes, reply_to: &ReplySink) -> Result<(), ConnectionError>;
}

/// Resolves the connection currently serving a topic.
#[async_trait]
pub trait ConnectionLookup: Send + Sync {
    async fn resolve(&self, topic: &str) -> Result<Arc<dyn BrokerConnection>, LookupError>;
}
