//! # Majordomo Protocol Codec
//!
//! ## Purpose
//!
//! This crate contains the "Rules" layer of the dialogue system:
//! - Protocol constants of the Majordomo Protocol (MDP/0.1) and its MMI extension
//! - Multipart message type with ZeroMQ-style envelope helpers
//! - Frame encoding/decoding for carrying multipart messages over a byte stream
//!
//! ## Architecture Role
//!
//! ```text
//! [codec] → network/ → messaging/majordomo → services/dialogue
//!    ↓          ↓               ↓
//! Constants  Framed TCP     Broker, worker,
//! Messages   Connections    client state machines
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Network transport logic (belongs in network/)
//! - Broker routing or worker/client state (belongs in messaging/majordomo)

pub mod error;
pub mod frame;
pub mod message;
pub mod protocol_constants;

pub use error::{ProtocolError, Result};
pub use frame::{decode, encode, FRAME_HEADER_SIZE, FRAME_MORE, MAX_FRAMES, MAX_FRAME_SIZE};
pub use message::Message;
pub use protocol_constants::*;
