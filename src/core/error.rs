//! Error handling - typed failures per concern

use thiserror::Error;

use crate::core::types::{OrderId, StrategyId};

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// A wire message that could not be decoded. Non-fatal to the session: the
/// message is discarded and consumption continues.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown event header: {0}")]
    UnknownHeader(String),

    #[error("malformed message: {0}")]
    Malformed(&'static str),

    #[error("wrong field count for {header}: expected {expected}, got {actual}")]
    FieldCount {
        header: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid {what} token: {value}")]
    InvalidToken { what: &'static str, value: String },

    #[error("invalid {what} literal: {value}")]
    InvalidNumber { what: &'static str, value: String },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("message is not valid UTF-8")]
    InvalidUtf8,
}

/// No usable transport session. Surfaced synchronously to command callers;
/// retry policy is theirs.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no connection has been established to the execution service")]
    NotConnected,

    #[error("execution service unreachable: {0}")]
    Unreachable(String),
}

/// Top-level error for execution client operations.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("order id already registered: {0}")]
    DuplicateOrder(OrderId),

    #[error("strategy id already registered: {0}")]
    DuplicateStrategy(StrategyId),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}
