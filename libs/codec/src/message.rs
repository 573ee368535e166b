//! Multipart message with ZeroMQ-style envelope handling
//!
//! A [`Message`] is an ordered list of frames. Routing envelopes are built
//! with [`Message::wrap`] (address frame followed by an empty delimiter) and
//! taken apart with [`Message::unwrap`], the same way a ROUTER socket
//! stacks and strips return addresses.

use crate::{ProtocolError, Result};
use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt;

/// Ordered list of frames
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Message {
    frames: VecDeque<Bytes>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message from any sequence of frame-like values
    pub fn from_frames<I, F>(frames: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Bytes>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push_front(&mut self, frame: impl Into<Bytes>) {
        self.frames.push_front(frame.into());
    }

    pub fn push_back(&mut self, frame: impl Into<Bytes>) {
        self.frames.push_back(frame.into());
    }

    pub fn pop_front(&mut self) -> Option<Bytes> {
        self.frames.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<Bytes> {
        self.frames.pop_back()
    }

    pub fn front(&self) -> Option<&Bytes> {
        self.frames.front()
    }

    pub fn back(&self) -> Option<&Bytes> {
        self.frames.back()
    }

    /// Pop the first frame, failing with `context` if the message is empty
    pub fn pop_required(&mut self, context: &'static str) -> Result<Bytes> {
        let got = self.frames.len();
        self.frames
            .pop_front()
            .ok_or_else(|| ProtocolError::missing_frames(context, got + 1, got))
    }

    /// Pop the first frame and require it to be the empty delimiter
    pub fn pop_delimiter(&mut self, context: &'static str) -> Result<()> {
        let frame = self.pop_required(context)?;
        if !frame.is_empty() {
            return Err(ProtocolError::BadDelimiter { len: frame.len() });
        }
        Ok(())
    }

    /// Push `address` and an empty delimiter onto the front
    pub fn wrap(&mut self, address: impl Into<Bytes>) {
        self.frames.push_front(Bytes::new());
        self.frames.push_front(address.into());
    }

    /// Pop the address frame and the delimiter that follows it, if present
    pub fn unwrap(&mut self) -> Option<Bytes> {
        let address = self.frames.pop_front()?;
        if self.frames.front().is_some_and(|frame| frame.is_empty()) {
            self.frames.pop_front();
        }
        Some(address)
    }

    pub fn frames(&self) -> impl Iterator<Item = &Bytes> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<Bytes> {
        self.frames.into()
    }

    /// Total body size of all frames in bytes
    pub fn body_len(&self) -> usize {
        self.frames.iter().map(Bytes::len).sum()
    }
}

impl From<Vec<Bytes>> for Message {
    fn from(frames: Vec<Bytes>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl IntoIterator for Message {
    type Item = Bytes;
    type IntoIter = std::collections::vec_deque::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for frame in &self.frames {
            match std::str::from_utf8(frame) {
                Ok(text) if frame.iter().all(|b| !b.is_ascii_control()) => {
                    list.entry(&text);
                }
                _ => {
                    list.entry(&format_args!("{:02x?}", &frame[..]));
                }
            }
        }
        list.finish()
    }
}
