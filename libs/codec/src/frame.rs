//! Frame encoding for multipart messages on a byte stream
//!
//! ```text
//! frame   := flags:u8 | length:u32 (big-endian) | body[length]
//! message := frame+            (every frame but the last has FRAME_MORE set)
//! ```
//!
//! [`decode`] is incremental: it only consumes bytes from the buffer once a
//! complete message is available, so a reader can keep appending socket
//! reads to the same buffer until a message comes out.

use crate::{Message, ProtocolError, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Flag bit: another frame of the same message follows
pub const FRAME_MORE: u8 = 0x01;

/// Flag byte plus big-endian length
pub const FRAME_HEADER_SIZE: usize = 5;

/// Maximum body size of a single frame (1MB)
pub const MAX_FRAME_SIZE: usize = 1_048_576;

/// Maximum number of frames in one message
pub const MAX_FRAMES: usize = 64;

/// Append the wire form of `message` to `dst`
pub fn encode(message: &Message, dst: &mut BytesMut) -> Result<()> {
    if message.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if message.len() > MAX_FRAMES {
        return Err(ProtocolError::TooManyFrames { max: MAX_FRAMES });
    }

    // Nothing is written unless the whole message fits
    if let Some(frame) = message.frames().find(|f| f.len() > MAX_FRAME_SIZE) {
        return Err(ProtocolError::FrameTooLarge {
            size: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    dst.reserve(message.len() * FRAME_HEADER_SIZE + message.body_len());
    let last = message.len() - 1;
    for (index, frame) in message.frames().enumerate() {
        dst.put_u8(if index < last { FRAME_MORE } else { 0 });
        dst.put_u32(frame.len() as u32);
        dst.extend_from_slice(frame);
    }
    Ok(())
}

/// Take one complete message off the front of `src`
///
/// Returns `Ok(None)` and leaves `src` untouched while the message is still
/// incomplete.
pub fn decode(src: &mut BytesMut) -> Result<Option<Message>> {
    // First pass validates headers and finds the message boundary
    let mut offset = 0;
    let mut frame_count = 0;
    loop {
        if src.len() < offset + FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let flags = src[offset];
        if flags & !FRAME_MORE != 0 {
            return Err(ProtocolError::InvalidFlags { flags });
        }
        let len = u32::from_be_bytes([
            src[offset + 1],
            src[offset + 2],
            src[offset + 3],
            src[offset + 4],
        ]) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }
        frame_count += 1;
        if frame_count > MAX_FRAMES {
            return Err(ProtocolError::TooManyFrames { max: MAX_FRAMES });
        }
        offset += FRAME_HEADER_SIZE + len;
        if flags & FRAME_MORE == 0 {
            break;
        }
    }
    if src.len() < offset {
        return Ok(None);
    }

    let mut raw = src.split_to(offset);
    let mut message = Message::new();
    while raw.has_remaining() {
        raw.advance(1);
        let len = raw.get_u32() as usize;
        message.push_back(raw.split_to(len).freeze());
    }
    Ok(Some(message))
}
