//! Error types for the transaction buffer client.
//!
//! Every failure is local to one request's future. The client never retries on
//! its own; `TxnBufferError::is_retryable` tells the coordinator whether trying
//! the same operation again can help.

use crate::ipc::commands::ServerError;
use thiserror::Error;

/// Failure resolving the broker connection that owns a topic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// No broker currently owns the topic (ownership table empty or unreachable)
    #[error("no broker owns topic {topic}")]
    TopicNotRoutable { topic: String },

    /// The owning broker is known but a connection could not be established
    #[error("connection to {broker} for topic {topic} unavailable: {reason}")]
    ConnectionUnavailable {
        topic: String,
        broker: String,
        reason: String,
    },
}

/// Failure handing an encoded frame to a broker connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Failure encoding or decoding a wire frame.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Error surfaced through a request's future.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TxnBufferError {
    /// No connection could be resolved for the topic
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// No reply arrived within the configured operation timeout
    #[error("request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout { request_id: u64, timeout_ms: u64 },

    /// The broker explicitly rejected the operation
    #[error("remote execution failed ({error:?}): {message}")]
    RemoteExecution { error: ServerError, message: String },

    /// The handler was closed while the request was pending, or before submission
    #[error("transaction buffer client closed")]
    ClientClosed,

    /// The connection refused the command frame
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
}

impl TxnBufferError {
    /// Whether re-issuing the same operation later may succeed.
    ///
    /// Routing failures, timeouts and refused sends are transient. A broker
    /// rejection is a transaction-level verdict and a closed client stays closed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TxnBufferError::Lookup(_)
            | TxnBufferError::RequestTimeout { .. }
            | TxnBufferError::Connection(_) => true,
            TxnBufferError::RemoteExecution { .. } | TxnBufferError::ClientClosed => false,
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TxnBufferError::Lookup(_) => "lookup",
            TxnBufferError::RequestTimeout { .. } => "timeout",
            TxnBufferError::RemoteExecution { .. } => "remote_execution",
            TxnBufferError::ClientClosed => "client_closed",
            TxnBufferError::Connection(_) => "connection",
        }
    }
}

/// Result type for transaction buffer operations
pub type TxnBufferResult<T> = Result<T, TxnBufferError>;
