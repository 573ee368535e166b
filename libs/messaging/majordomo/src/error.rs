//! # Majordomo Error Types
//!
//! Errors surfaced by the broker, worker and client. Lower layers convert in
//! through `#[from]` so callers can use `?` across crate boundaries.

use codec::ProtocolError;
use dialogue_config::ConfigError;
use network::TransportError;
use thiserror::Error;

/// Majordomo operation errors
#[derive(Error, Debug)]
pub enum MdpError {
    /// Malformed or unexpected protocol message
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Socket level failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No reply after every attempt
    #[error("Request to service '{service}' timed out after {attempts} attempts")]
    Timeout { service: String, attempts: u32 },

    /// Reply came back for a different service than requested
    #[error("Reply for service '{got}' does not match request to '{expected}'")]
    UnexpectedReply { expected: String, got: String },

    /// Request handler failed to produce a reply
    #[error("Handler error: {0}")]
    Handler(String),
}

impl MdpError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// Result type alias for Majordomo operations
pub type Result<T> = std::result::Result<T, MdpError>;
