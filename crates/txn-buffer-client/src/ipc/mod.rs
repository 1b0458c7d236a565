//! IPC with the brokers that own topics: command/reply frames and the request handler.

pub mod commands;
pub mod handler;

pub use commands::{EndTxnCommand, EndTxnReply, ReplyOutcome, ServerError};
pub use handler::{TransactionBufferHandler, TxnFuture};
