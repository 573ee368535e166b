//! # Majordomo Broker
//!
//! Accepts TCP connections from clients and workers and routes between
//! them. Each connection gets a [`PeerId`] and two tasks:
//!
//! - **Read task**: decodes messages and forwards them to the broker loop
//! - **Write task**: drains a per-peer queue onto the socket
//!
//! The broker loop itself owns [`BrokerState`] exclusively, so routing needs
//! no locks. It wakes on inbound messages, new connections, the heartbeat
//! ticker and shutdown.

mod state;

pub use state::{parse_peer_address, peer_address, BrokerState};

use crate::{Result, Shutdown};
use codec::Message;
use dialogue_config::RuntimeConfig;
use network::{FrameReader, FrameWriter, TcpConnection};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Unique identifier for a broker connection
pub type PeerId = u64;

/// Messages buffered per peer before new ones are dropped
const PEER_QUEUE_SIZE: usize = 1024;

/// How long shutdown waits for DISCONNECTs to reach workers
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Events from connection tasks to the broker loop
#[derive(Debug)]
enum PeerEvent {
    Message(PeerId, Message),
    Closed(PeerId),
}

/// Majordomo broker bound to a TCP listener
pub struct Broker {
    runtime: RuntimeConfig,
    listener: TcpListener,
}

impl Broker {
    /// Bind `bind_address:port` from the runtime configuration
    pub async fn bind(runtime: &RuntimeConfig) -> Result<Self> {
        let listener = network::bind(runtime.listen_address()?).await?;
        Ok(Self::from_listener(runtime, listener))
    }

    /// Use an already bound listener
    pub fn from_listener(runtime: &RuntimeConfig, listener: TcpListener) -> Self {
        Self {
            runtime: runtime.clone(),
            listener,
        }
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener.local_addr().map_err(|e| {
            network::TransportError::network_with_source("Failed to read listener address", e).into()
        })
    }

    /// Route messages until `shutdown` fires
    ///
    /// On shutdown every registered worker is sent DISCONNECT before the
    /// connections are closed.
    pub async fn run(self, mut shutdown: Shutdown) -> Result<()> {
        let verbose = self.runtime.verbose;
        let heartbeat = self.runtime.heartbeat;
        let mut state = BrokerState::new(heartbeat, Instant::now());

        let (event_tx, mut event_rx) = mpsc::channel::<PeerEvent>(PEER_QUEUE_SIZE);
        let mut peers: HashMap<PeerId, mpsc::Sender<Message>> = HashMap::new();
        let mut readers = JoinSet::new();
        let mut writers = JoinSet::new();
        let mut next_peer: PeerId = 1;

        let mut ticker = tokio::time::interval(heartbeat.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "Majordomo broker running");
        }

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Broker received shutdown signal");
                    break;
                }
                accepted = network::accept(&self.listener) => match accepted {
                    Ok(connection) => {
                        let peer = next_peer;
                        next_peer += 1;
                        debug!(peer, addr = %connection.peer_addr(), "Peer connected");
                        let queue = spawn_peer(peer, connection, event_tx.clone(), &mut readers, &mut writers);
                        peers.insert(peer, queue);
                    }
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
                Some(event) = event_rx.recv() => match event {
                    PeerEvent::Message(peer, mut msg) => {
                        if verbose {
                            debug!(peer, ?msg, "Received message");
                        }
                        msg.push_front(peer_address(peer));
                        if let Err(e) = state.process(msg, Instant::now()) {
                            warn!(peer, error = %e, "Dropping malformed message");
                        }
                    }
                    PeerEvent::Closed(peer) => {
                        debug!(peer, "Peer disconnected");
                        peers.remove(&peer);
                        state.peer_disconnected(peer);
                    }
                },
                _ = ticker.tick() => {}
            }

            state.on_tick(Instant::now());
            route_outbox(&mut state, &peers, verbose);
        }

        state.shutdown();
        route_outbox(&mut state, &peers, verbose);

        // Writers finish once their queue is drained and closed
        drop(peers);
        readers.abort_all();
        let flushed = tokio::time::timeout(SHUTDOWN_FLUSH_TIMEOUT, async {
            while writers.join_next().await.is_some() {}
        })
        .await;
        if flushed.is_err() {
            warn!("Timed out flushing peer connections");
            writers.abort_all();
        }

        info!("Broker stopped");
        Ok(())
    }
}

/// Start read and write tasks for a new connection
fn spawn_peer(
    peer: PeerId,
    connection: TcpConnection,
    events: mpsc::Sender<PeerEvent>,
    readers: &mut JoinSet<()>,
    writers: &mut JoinSet<()>,
) -> mpsc::Sender<Message> {
    let (reader, writer) = connection.into_split();
    let (queue_tx, queue_rx) = mpsc::channel(PEER_QUEUE_SIZE);
    readers.spawn(read_peer(peer, reader, events));
    writers.spawn(write_peer(peer, writer, queue_rx));
    queue_tx
}

async fn read_peer(peer: PeerId, mut reader: FrameReader<OwnedReadHalf>, events: mpsc::Sender<PeerEvent>) {
    loop {
        match reader.read_message().await {
            Ok(Some(msg)) => {
                if events.send(PeerEvent::Message(peer, msg)).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(peer, error = %e, category = e.category(), "Peer read failed");
                break;
            }
        }
    }
    let _ = events.send(PeerEvent::Closed(peer)).await;
}

async fn write_peer(peer: PeerId, mut writer: FrameWriter<OwnedWriteHalf>, mut queue: mpsc::Receiver<Message>) {
    while let Some(msg) = queue.recv().await {
        if let Err(e) = writer.write_message(&msg).await {
            warn!(peer, error = %e, "Peer write failed");
            return;
        }
    }
    let _ = writer.shutdown().await;
}

fn route_outbox(state: &mut BrokerState, peers: &HashMap<PeerId, mpsc::Sender<Message>>, verbose: bool) {
    for (peer, msg) in state.take_outbox() {
        if verbose {
            debug!(peer, ?msg, "Sending message");
        }
        match peers.get(&peer) {
            Some(queue) => {
                if let Err(e) = queue.try_send(msg) {
                    error!(peer, error = %e, "Peer queue unavailable, dropping message");
                }
            }
            None => debug!(peer, "Dropping message for departed peer"),
        }
    }
}
