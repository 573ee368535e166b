//! TCP Transport
//!
//! Connection setup for brokers, workers and clients. A [`TcpConnection`]
//! owns a framed reader and writer over the two halves of one socket so the
//! halves can be moved into separate tasks.

use crate::framed::{FrameReader, FrameWriter};
use crate::{Result, TransportError};
use codec::Message;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

/// Framed TCP connection to one peer
pub struct TcpConnection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
    peer_addr: SocketAddr,
    connected_at: Instant,
}

impl TcpConnection {
    /// Wrap an accepted or connected stream
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
            peer_addr,
            connected_at: Instant::now(),
        }
    }

    pub async fn send(&mut self, message: &Message) -> Result<()> {
        self.writer.write_message(message).await?;
        debug!(peer = %self.peer_addr, frames = message.len(), "Sent message");
        Ok(())
    }

    /// Receive the next message, `None` once the peer has closed
    pub async fn recv(&mut self) -> Result<Option<Message>> {
        let message = self.reader.read_message().await?;
        if let Some(message) = &message {
            debug!(peer = %self.peer_addr, frames = message.len(), "Received message");
        }
        Ok(message)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            peer_addr: self.peer_addr,
            connected_duration: self.connected_at.elapsed(),
            bytes_sent: self.writer.bytes_sent(),
            bytes_received: self.reader.bytes_received(),
        }
    }

    /// Split into independently owned reader and writer
    pub fn into_split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }

    /// Close the write side so the peer sees end of stream
    pub async fn close(mut self) -> Result<()> {
        let stats = self.stats();
        self.writer.shutdown().await?;
        info!(
            peer = %stats.peer_addr,
            bytes_sent = stats.bytes_sent,
            bytes_received = stats.bytes_received,
            "Closed TCP connection"
        );
        Ok(())
    }
}

/// Connection statistics
#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub peer_addr: SocketAddr,
    pub connected_duration: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Connect to `addr`, failing after `timeout`
pub async fn connect(addr: impl ToSocketAddrs, timeout: Duration) -> Result<TcpConnection> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| TransportError::timeout("TCP connect", timeout.as_millis() as u64))?
        .map_err(|e| TransportError::network_with_source("Failed to connect to TCP peer", e))?;

    let peer_addr = stream
        .peer_addr()
        .map_err(|e| TransportError::network_with_source("Failed to get peer address", e))?;

    debug!("Connected to TCP peer at {}", peer_addr);
    Ok(TcpConnection::new(stream, peer_addr))
}

/// Bind a listener on `addr`
pub async fn bind(addr: impl ToSocketAddrs) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::network_with_source("Failed to bind TCP listener", e))?;
    if let Ok(local) = listener.local_addr() {
        info!("TCP server listening on {}", local);
    }
    Ok(listener)
}

/// Accept one connection from `listener`
pub async fn accept(listener: &TcpListener) -> Result<TcpConnection> {
    let (stream, peer_addr) = listener
        .accept()
        .await
        .map_err(|e| TransportError::connection_with_source("Failed to accept TCP connection", None, e))?;
    debug!("Accepted TCP connection from {}", peer_addr);
    Ok(TcpConnection::new(stream, peer_addr))
}
