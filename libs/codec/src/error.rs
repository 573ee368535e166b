//! Protocol-level errors for Majordomo message processing
//!
//! Each variant carries enough context to tell a framing problem (bad bytes
//! on the stream) from a protocol problem (well-framed message with the
//! wrong shape).

use thiserror::Error;

/// Protocol and framing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Header frame is neither `MDPC01` nor `MDPW01`
    #[error("Unknown protocol header: {frame:02x?}")]
    UnknownHeader { frame: Vec<u8> },

    /// Command frame is not one of READY..DISCONNECT
    #[error("Unknown worker command: {frame:02x?}")]
    UnknownCommand { frame: Vec<u8> },

    /// Message does not have the frames its role requires
    #[error("Malformed {context} message: expected at least {need} frames, got {got}")]
    MissingFrames {
        context: &'static str,
        need: usize,
        got: usize,
    },

    /// Envelope delimiter was expected to be empty
    #[error("Malformed envelope: delimiter frame is {len} bytes, expected empty")]
    BadDelimiter { len: usize },

    /// Frame exceeds the protocol size limit
    #[error("Frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Message exceeds the protocol frame count limit
    #[error("Too many frames: message has more than {max} frames")]
    TooManyFrames { max: usize },

    /// Frame flag byte has reserved bits set
    #[error("Invalid frame flags {flags:#04x}")]
    InvalidFlags { flags: u8 },

    /// Messages must carry at least one frame
    #[error("Cannot encode an empty message")]
    EmptyMessage,

    /// Service name is not valid UTF-8
    #[error("Service name is not valid UTF-8")]
    InvalidServiceName,

    /// Address frame does not name a known peer
    #[error("Invalid address frame of {len} bytes")]
    InvalidAddress { len: usize },
}

impl ProtocolError {
    pub fn unknown_header(frame: &[u8]) -> Self {
        Self::UnknownHeader {
            frame: frame.to_vec(),
        }
    }

    pub fn unknown_command(frame: &[u8]) -> Self {
        Self::UnknownCommand {
            frame: frame.to_vec(),
        }
    }

    pub fn missing_frames(context: &'static str, need: usize, got: usize) -> Self {
        Self::MissingFrames { context, need, got }
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ProtocolError::missing_frames("client", 2, 1);
        assert_eq!(
            err.to_string(),
            "Malformed client message: expected at least 2 frames, got 1"
        );

        let err = ProtocolError::unknown_command(&[9]);
        assert!(err.to_string().contains("09"));
    }
}
