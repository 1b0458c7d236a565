//! Transaction Buffer Client - ends transactions on the brokers that own their topics.
//!
//! The transaction coordinator uses this client to commit or abort a transaction's
//! effects on a topic or on one subscription of a topic. Each call resolves the
//! owning broker, sends a correlated end-txn command and resolves once the broker
//! replies, the request times out or the client is closed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  TRANSACTION BUFFER CLIENT                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────┐                  │
//! │  │   TransactionBufferClientService (facade)   │                  │
//! │  └──────────┬──────────────────────┬──────────┘                  │
//! │             │                      │                             │
//! │  ┌──────────┴─────────┐  ┌─────────┴───────────────────────┐     │
//! │  │  ConnectionLookup  │  │   TransactionBufferHandler      │     │
//! │  │  (topic → broker)  │  │   request ids + pending table   │     │
//! │  └────────────────────┘  └─────────┬─────────────┬─────────┘     │
//! │                                    │             │               │
//! │                          ┌─────────┴──────┐ ┌────┴────────────┐  │
//! │                          │ reply listener │ │ timeout ticker  │  │
//! │                          └────────────────┘ └─────────────────┘  │
//! └──────────────────────────────────┼───────────────────────────────┘
//!                                    │
//!                         end-txn command / reply frames
//!                                    │
//!                             owning broker
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use txn_buffer_client::{TransactionBufferClient, TransactionBufferClientService, TxnBufferClientConfig};
//!
//! let client = TransactionBufferClientService::new(TxnBufferClientConfig::default(), lookup)?;
//! let txn = client.commit_txn_on_topic("persistent://public/default/t", 1, 7, i64::MIN).await?;
//! client.close();
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ipc;
pub mod metrics;
pub mod ports;
pub mod scheduler;
pub mod service;
pub mod telemetry;

// Re-exports for public API
pub use config::{ConfigError, TxnBufferClientConfig};
pub use domain::{EndTxnRequest, StatsSnapshot, TxnAction, TxnId, TxnScope};
pub use error::{CodecError, ConnectionError, LookupError, TxnBufferError, TxnBufferResult};
pub use ipc::{EndTxnReply, ServerError, TransactionBufferHandler, TxnFuture};
pub use ports::{BrokerConnection, ConnectionLookup, ReplySink, TransactionBufferClient};
pub use service::TransactionBufferClientService;
pub use telemetry::{init_logging, TelemetryConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
