//! Message framing over async byte streams
//!
//! [`FrameReader`] accumulates socket reads into a single buffer and hands
//! out complete messages. `read_message` is cancel safe: bytes already read
//! stay in the buffer if the future is dropped inside a `select!`.

use crate::{Result, TransportError};
use bytes::BytesMut;
use codec::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Initial capacity of read and write buffers
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Reads multipart messages from a byte stream
pub struct FrameReader<R> {
    inner: R,
    buffer: BytesMut,
    bytes_received: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            bytes_received: 0,
        }
    }

    /// Read the next complete message
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly between
    /// messages.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        loop {
            if let Some(message) = codec::decode(&mut self.buffer)? {
                return Ok(Some(message));
            }

            let read = self
                .inner
                .read_buf(&mut self.buffer)
                .await
                .map_err(|e| TransportError::network_with_source("Failed to read from stream", e))?;
            if read == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(TransportError::UnexpectedEof {
                    buffered: self.buffer.len(),
                });
            }
            self.bytes_received += read as u64;
        }
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

/// Writes multipart messages to a byte stream
pub struct FrameWriter<W> {
    inner: W,
    buffer: BytesMut,
    bytes_sent: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            bytes_sent: 0,
        }
    }

    /// Encode and flush one message with a single write
    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        self.buffer.clear();
        codec::encode(message, &mut self.buffer)?;

        self.inner
            .write_all(&self.buffer)
            .await
            .map_err(|e| TransportError::network_with_source("Failed to write message", e))?;
        self.inner
            .flush()
            .await
            .map_err(|e| TransportError::network_with_source("Failed to flush stream", e))?;

        self.bytes_sent += self.buffer.len() as u64;
        Ok(())
    }

    /// Shut down the write side of the stream
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .map_err(|e| TransportError::network_with_source("Failed to shut down stream", e))
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}
