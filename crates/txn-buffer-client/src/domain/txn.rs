//! Transaction identity and end-of-transaction intent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction identifier: two 64-bit halves assigned by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxnId {
    pub most_sig_bits: u64,
    pub least_sig_bits: u64,
}

impl TxnId {
    pub const fn new(most_sig_bits: u64, least_sig_bits: u64) -> Self {
        Self {
            most_sig_bits,
            least_sig_bits,
        }
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.most_sig_bits, self.least_sig_bits)
    }
}

/// How a transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnAction {
    Commit,
    Abort,
}

impl TxnAction {
    /// Stable lowercase label, used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnAction::Commit => "commit",
            TxnAction::Abort => "abort",
        }
    }
}

impl fmt::Display for TxnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the end-of-transaction command targets on the owning broker.
///
/// `Topic` ends the transaction in the topic's transaction buffer; `Subscription`
/// ends it on the named subscription's cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnScope {
    Topic,
    Subscription { name: String },
}

impl TxnScope {
    pub fn subscription(name: impl Into<String>) -> Self {
        TxnScope::Subscription { name: name.into() }
    }

    pub fn subscription_name(&self) -> Option<&str> {
        match self {
            TxnScope::Topic => None,
            TxnScope::Subscription { name } => Some(name),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxnScope::Topic => "topic",
            TxnScope::Subscription { .. } => "subscription",
        }
    }
}

/// A single end-of-transaction intent, before a request id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndTxnRequest {
    pub scope: TxnScope,
    /// Fully qualified topic name (e.g. `persistent://public/default/orders-partition-3`)
    pub topic: String,
    pub txn_id: TxnId,
    pub action: TxnAction,
    /// Opaque ordering token forwarded to the broker unchanged
    pub low_water_mark: i64,
}

impl EndTxnRequest {
    pub fn on_topic(
        topic: impl Into<String>,
        txn_id: TxnId,
        action: TxnAction,
        low_water_mark: i64,
    ) -> Self {
        Self {
            scope: TxnScope::Topic,
            topic: topic.into(),
            txn_id,
            action,
            low_water_mark,
        }
    }

    pub fn on_subscription(
        topic: impl Into<String>,
        subscription: impl Into<String>,
        txn_id: TxnId,
        action: TxnAction,
        low_water_mark: i64,
    ) -> Self {
        Self {
            scope: TxnScope::subscription(subscription),
            topic: topic.into(),
            txn_id,
            action,
            low_water_mark,
        }
    }
}
