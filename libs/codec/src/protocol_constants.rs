//! Protocol-level constants for the Majordomo Protocol
//!
//! This module contains immutable protocol constants that are part of the
//! wire format. These values MUST remain byte-for-byte identical across all
//! peers for protocol compatibility.

use crate::ProtocolError;
use std::fmt;

/// Protocol header sent by clients (`MDPC01`)
pub const C_CLIENT: &[u8] = b"MDPC01";

/// Protocol header sent by workers (`MDPW01`)
pub const S_WORKER: &[u8] = b"MDPW01";

/// Worker command: ready to accept requests for a service
pub const S_READY: &[u8] = &[1];

/// Worker command: request forwarded from the broker
pub const S_REQUEST: &[u8] = &[2];

/// Worker command: reply sent back through the broker
pub const S_REPLY: &[u8] = &[3];

/// Worker command: liveness heartbeat
pub const S_HEARTBEAT: &[u8] = &[4];

/// Worker command: disconnect
pub const S_DISCONNECT: &[u8] = &[5];

/// Default dialogue server port
pub const DEFAULT_PORT: &str = "5590";

/// Namespace reserved for broker-internal services (MMI)
pub const INTERNAL_SERVICE_PREFIX: &str = "mmi.";

/// MMI service lookup: "is there a worker for this service?"
pub const MMI_SERVICE: &str = "mmi.service";

/// MMI status: service has at least one worker
pub const MMI_OK: &str = "200";

/// MMI status: service unknown or without workers
pub const MMI_NOT_FOUND: &str = "404";

/// MMI status: internal service not implemented
pub const MMI_NOT_IMPLEMENTED: &str = "501";

/// Heartbeats a peer may miss before it is considered dead
pub const HEARTBEAT_LIVENESS: u32 = 3;

/// Interval between heartbeats in milliseconds
pub const HEARTBEAT_INTERVAL_MS: u64 = 2500;

/// Delay before a worker reconnects to the broker in milliseconds
pub const RECONNECT_DELAY_MS: u64 = 2500;

/// Client request timeout in milliseconds
pub const REQUEST_TIMEOUT_MS: u64 = 2500;

/// Client attempts after the first request times out
pub const REQUEST_RETRIES: u32 = 3;

/// Returns true if `service` is answered by the broker itself
pub fn is_internal_service(service: &[u8]) -> bool {
    service.starts_with(INTERNAL_SERVICE_PREFIX.as_bytes())
}

/// Role announced in the protocol header frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Header {
    Client,
    Worker,
}

impl Header {
    pub fn as_frame(self) -> &'static [u8] {
        match self {
            Header::Client => C_CLIENT,
            Header::Worker => S_WORKER,
        }
    }
}

impl TryFrom<&[u8]> for Header {
    type Error = ProtocolError;

    fn try_from(frame: &[u8]) -> Result<Self, Self::Error> {
        match frame {
            C_CLIENT => Ok(Header::Client),
            S_WORKER => Ok(Header::Worker),
            other => Err(ProtocolError::unknown_header(other)),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Headers are ASCII by construction
        f.write_str(std::str::from_utf8(self.as_frame()).unwrap_or("?"))
    }
}

/// Worker protocol command
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Ready = 1,
    Request = 2,
    Reply = 3,
    Heartbeat = 4,
    Disconnect = 5,
}

impl Command {
    /// Single-byte frame carrying this command
    pub fn as_frame(self) -> &'static [u8] {
        match self {
            Command::Ready => S_READY,
            Command::Request => S_REQUEST,
            Command::Reply => S_REPLY,
            Command::Heartbeat => S_HEARTBEAT,
            Command::Disconnect => S_DISCONNECT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Ready => "READY",
            Command::Request => "REQUEST",
            Command::Reply => "REPLY",
            Command::Heartbeat => "HEARTBEAT",
            Command::Disconnect => "DISCONNECT",
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Command::Ready),
            2 => Ok(Command::Request),
            3 => Ok(Command::Reply),
            4 => Ok(Command::Heartbeat),
            5 => Ok(Command::Disconnect),
            _ => Err(ProtocolError::unknown_command(&[value])),
        }
    }
}

impl TryFrom<&[u8]> for Command {
    type Error = ProtocolError;

    fn try_from(frame: &[u8]) -> Result<Self, Self::Error> {
        match frame {
            [value] => Command::try_from(*value),
            other => Err(ProtocolError::unknown_command(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
