//! Domain types for the transaction buffer client.
//!
//! - txn: transaction identity, action and scope
//! - pending: ordered pending request table and request id allocation
//! - stats: outcome counters

pub mod pending;
pub mod stats;
pub mod txn;

pub use pending::{Completion, PendingRequest, PendingRequestTable, RequestIdGenerator};
pub use stats::{ClientStats, StatsSnapshot};
pub use txn::{EndTxnRequest, TxnAction, TxnId, TxnScope};
