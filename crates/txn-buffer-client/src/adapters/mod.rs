//! Adapters for the transaction buffer client.
//!
//! In-memory brokers and lookups used by tests and local runs.

pub mod in_memory;

pub use in_memory::{FixedLookup, InMemoryBrokerConnection, InMemoryCluster, SilentConnection, TopicBehavior};
