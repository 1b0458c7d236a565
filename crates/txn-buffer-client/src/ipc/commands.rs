//! End-of-transaction command and reply frames.
//!
//! Frames are serde types encoded with bincode. The client encodes commands and
//! decodes replies; a broker does the reverse.

use crate::domain::{EndTxnRequest, TxnAction, TxnId, TxnScope};
use crate::error::CodecError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Command sent to the broker owning `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTxnCommand {
    pub request_id: u64,
    pub action: TxnAction,
    pub scope: TxnScope,
    pub topic: String,
    pub txn_id: TxnId,
    pub low_water_mark: i64,
}

impl EndTxnCommand {
    pub fn from_request(request_id: u64, request: &EndTxnRequest) -> Self {
        Self {
            request_id,
            action: request.action,
            scope: request.scope.clone(),
            topic: request.topic.clone(),
            txn_id: request.txn_id,
            low_water_mark: request.low_water_mark,
        }
    }
}

/// Error category reported by a broker that rejected a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerError {
    UnknownError,
    ServiceNotReady,
    TopicNotFound,
    SubscriptionNotFound,
    TransactionNotFound,
    TransactionConflict,
    NotAllowed,
}

/// Outcome carried by a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyOutcome {
    Success,
    Failure { error: ServerError, message: String },
}

/// Reply for one command, keyed by its request id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTxnReply {
    pub request_id: u64,
    pub txn_id: TxnId,
    pub outcome: ReplyOutcome,
}

impl EndTxnReply {
    pub fn success(request_id: u64, txn_id: TxnId) -> Self {
        Self {
            request_id,
            txn_id,
            outcome: ReplyOutcome::Success,
        }
    }

    pub fn failure(
        request_id: u64,
        txn_id: TxnId,
        error: ServerError,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            txn_id,
            outcome: ReplyOutcome::Failure {
                error,
                message: message.into(),
            },
        }
    }
}

pub fn encode_command(command: &EndTxnCommand) -> Result<Bytes, CodecError> {
    encode(command)
}

pub fn decode_command(frame: &[u8]) -> Result<EndTxnCommand, CodecError> {
    decode(frame)
}

pub fn encode_reply(reply: &EndTxnReply) -> Result<Bytes, CodecError> {
    encode(reply)
}

pub fn decode_reply(frame: &[u8]) -> Result<EndTxnReply, CodecError> {
    decode(frame)
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes, CodecError> {
    bincode::serialize(value)
        .map(Bytes::from)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(frame).map_err(|e| CodecError::Decode(e.to_string()))
}
