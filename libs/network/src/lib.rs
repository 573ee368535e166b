//! Network Infrastructure
//!
//! Framed TCP transport for the Majordomo broker, its workers and clients.
//! Messages from `codec` are carried as length-prefixed frames; this crate
//! owns sockets, buffering and transport errors and nothing about routing.

pub mod error;
pub mod framed;
pub mod tcp;

pub use error::{Result, TransportError};
pub use framed::{FrameReader, FrameWriter, DEFAULT_BUFFER_SIZE};
pub use tcp::{accept, bind, connect, ConnectionStats, TcpConnection};

/// Default timeout for establishing TCP connections in milliseconds
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 5000;
