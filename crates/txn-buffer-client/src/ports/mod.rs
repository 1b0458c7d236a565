//! Ports for the transaction buffer client

pub mod inbound;
pub mod outbound;

pub use inbound::TransactionBufferClient;
pub use outbound::{BrokerConnection, ConnectionLookup, ReplySink};
