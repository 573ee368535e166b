//! # Majordomo Worker
//!
//! Registers a service with the broker and answers its requests through a
//! [`RequestHandler`]. The worker owns reconnection: if the broker goes
//! quiet for `liveness` heartbeat intervals, or tells it to DISCONNECT, it
//! waits the reconnect delay, connects again and re-announces READY.

use crate::{MdpError, Result, Shutdown};
use async_trait::async_trait;
use bytes::Bytes;
use codec::{Command, Header, Message};
use dialogue_config::{HeartbeatConfig, RuntimeConfig};
use network::TcpConnection;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Application logic behind a service
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Turn request body frames into reply body frames
    async fn handle(&self, request: Vec<Bytes>) -> Result<Vec<Bytes>>;
}

/// What the connection loop should do after a message
enum Next {
    Continue,
    Reconnect,
}

/// Majordomo worker for one service
pub struct Worker<H> {
    endpoint: String,
    service: String,
    handler: H,
    heartbeat: HeartbeatConfig,
    verbose: bool,
}

impl<H: RequestHandler> Worker<H> {
    pub fn new(
        endpoint: impl Into<String>,
        service: impl Into<String>,
        handler: H,
        runtime: &RuntimeConfig,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            service: service.into(),
            handler,
            heartbeat: runtime.heartbeat,
            verbose: runtime.verbose,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Serve requests until `shutdown` fires
    pub async fn run(self, mut shutdown: Shutdown) -> Result<()> {
        loop {
            if shutdown.is_triggered() {
                return Ok(());
            }

            match self.connect().await {
                Ok(mut connection) => {
                    if self.serve(&mut connection, &mut shutdown).await {
                        return Ok(());
                    }
                }
                Err(e) => warn!(
                    service = %self.service,
                    endpoint = %self.endpoint,
                    error = %e,
                    "Failed to connect to broker"
                ),
            }

            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                _ = tokio::time::sleep(self.heartbeat.reconnect()) => {}
            }
        }
    }

    /// Connect and announce READY for our service
    async fn connect(&self) -> Result<TcpConnection> {
        let timeout = Duration::from_millis(network::DEFAULT_CONNECTION_TIMEOUT_MS);
        let mut connection = network::connect(self.endpoint.as_str(), timeout).await?;
        self.send_command(&mut connection, Command::Ready, vec![Bytes::from(self.service.clone())])
            .await?;
        info!(service = %self.service, endpoint = %self.endpoint, "Worker connected to broker");
        Ok(connection)
    }

    /// Run one connection; returns true once shut down
    async fn serve(&self, connection: &mut TcpConnection, shutdown: &mut Shutdown) -> bool {
        let interval = self.heartbeat.interval();
        let mut liveness = self.heartbeat.liveness;
        let mut heartbeat_at = Instant::now() + interval;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!(service = %self.service, "Worker shutting down");
                    if let Err(e) = self.send_command(connection, Command::Disconnect, Vec::new()).await {
                        debug!(error = %e, "Could not send DISCONNECT");
                    }
                    return true;
                }
                received = connection.recv() => match received {
                    Ok(Some(msg)) => {
                        liveness = self.heartbeat.liveness;
                        match self.handle_message(connection, msg).await {
                            Ok(Next::Continue) => {}
                            Ok(Next::Reconnect) => return false,
                            Err(e) => {
                                warn!(service = %self.service, error = %e, "Failed to answer broker");
                                return false;
                            }
                        }
                    }
                    Ok(None) => {
                        warn!(service = %self.service, "Broker closed the connection");
                        return false;
                    }
                    Err(e) => {
                        warn!(service = %self.service, error = %e, "Broker connection failed");
                        return false;
                    }
                },
                _ = tokio::time::sleep(interval) => {
                    liveness = liveness.saturating_sub(1);
                    if liveness == 0 {
                        warn!(service = %self.service, "Broker unreachable, reconnecting");
                        return false;
                    }
                }
            }

            if Instant::now() >= heartbeat_at {
                if let Err(e) = self.send_command(connection, Command::Heartbeat, Vec::new()).await {
                    warn!(service = %self.service, error = %e, "Failed to send heartbeat");
                    return false;
                }
                heartbeat_at = Instant::now() + interval;
            }
        }
    }

    /// Handle `["", MDPW01, command, ...]` from the broker
    async fn handle_message(&self, connection: &mut TcpConnection, mut msg: Message) -> Result<Next> {
        if self.verbose {
            debug!(service = %self.service, ?msg, "Received message from broker");
        }

        let command = match parse_command(&mut msg) {
            Ok(command) => command,
            Err(e) => {
                warn!(service = %self.service, error = %e, "Ignoring invalid broker message");
                return Ok(Next::Continue);
            }
        };

        match command {
            Command::Request => {
                let Some(client) = msg.unwrap() else {
                    warn!(service = %self.service, "REQUEST without client envelope");
                    return Ok(Next::Continue);
                };
                let reply = match self.handler.handle(msg.into_frames()).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(service = %self.service, error = %e, "Request handler failed");
                        let reason = match e {
                            MdpError::Handler(reason) => reason,
                            other => other.to_string(),
                        };
                        vec![Bytes::from(format!("error: {}", reason))]
                    }
                };

                let mut frames = vec![client, Bytes::new()];
                frames.extend(reply);
                self.send_command(connection, Command::Reply, frames).await?;
                Ok(Next::Continue)
            }
            Command::Heartbeat => Ok(Next::Continue),
            Command::Disconnect => {
                info!(service = %self.service, "Broker requested disconnect");
                Ok(Next::Reconnect)
            }
            other => {
                warn!(service = %self.service, command = %other, "Unexpected command from broker");
                Ok(Next::Continue)
            }
        }
    }

    /// Send `["", MDPW01, command, frames...]`
    async fn send_command(
        &self,
        connection: &mut TcpConnection,
        command: Command,
        frames: Vec<Bytes>,
    ) -> Result<()> {
        let mut msg = Message::from(frames);
        msg.push_front(command.as_frame());
        msg.push_front(Header::Worker.as_frame());
        msg.push_front(Bytes::new());
        if self.verbose {
            debug!(service = %self.service, ?msg, "Sending message to broker");
        }
        connection.send(&msg).await.map_err(MdpError::from)
    }
}

/// Strip `["", MDPW01, command]` off a broker message
fn parse_command(msg: &mut Message) -> codec::Result<Command> {
    msg.pop_delimiter("broker")?;
    let header = msg.pop_required("broker")?;
    if Header::try_from(&header[..])? != Header::Worker {
        return Err(codec::ProtocolError::unknown_header(&header));
    }
    let command = msg.pop_required("broker")?;
    Command::try_from(&command[..])
}
