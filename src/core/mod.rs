//! Core module - Common types, config, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::{BusConfig, Config, ORDER_COMMAND_CHANNEL, ORDER_EVENT_CHANNEL};
pub use error::{ConnectionError, ExecutionError, ProtocolError, Result};
pub use types::*;
