//! # Majordomo Client
//!
//! Synchronous request/reply against a broker: one outstanding request at a
//! time. If no reply arrives within the timeout the connection is dropped,
//! so a late reply can never be mistaken for the answer to the next request,
//! and the request is sent again on a fresh connection.

use crate::{MdpError, Result};
use bytes::Bytes;
use codec::{Header, Message, MMI_OK, MMI_SERVICE};
use dialogue_config::{ClientSettings, RuntimeConfig};
use network::TcpConnection;
use tracing::{debug, info, warn};

/// Majordomo client connection
pub struct Client {
    endpoint: String,
    settings: ClientSettings,
    verbose: bool,
    connection: Option<TcpConnection>,
}

impl Client {
    pub fn new(endpoint: impl Into<String>, runtime: &RuntimeConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            settings: runtime.client,
            verbose: runtime.verbose,
            connection: None,
        }
    }

    pub fn with_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `body` to `service` and wait for the reply body
    ///
    /// Tries once plus `retries` more times, reconnecting before each retry.
    pub async fn send(&mut self, service: &str, body: Vec<Bytes>) -> Result<Vec<Bytes>> {
        let mut request = Message::from(body);
        request.push_front(Bytes::copy_from_slice(service.as_bytes()));
        request.push_front(Header::Client.as_frame());
        request.push_front(Bytes::new());

        let attempts = self.settings.retries + 1;
        for attempt in 1..=attempts {
            match self.attempt(&request).await {
                Ok(Some(reply)) => return parse_reply(service, reply),
                Ok(None) => {
                    warn!(service, attempt, attempts, "No reply within timeout, reconnecting");
                }
                Err(e) if attempt < attempts => {
                    warn!(service, attempt, attempts, error = %e, "Request failed, retrying");
                    // Pace retries against a broker that is down
                    tokio::time::sleep(self.settings.timeout()).await;
                }
                Err(e) => return Err(e),
            }
            self.connection = None;
        }

        Err(MdpError::Timeout {
            service: service.to_string(),
            attempts,
        })
    }

    /// Send the request once; `Ok(None)` on timeout
    async fn attempt(&mut self, request: &Message) -> Result<Option<Message>> {
        let timeout = self.settings.timeout();
        let connection = match self.connection.take() {
            Some(connection) => self.connection.insert(connection),
            None => {
                let connection = network::connect(self.endpoint.as_str(), timeout).await?;
                info!(endpoint = %self.endpoint, "Client connected to broker");
                self.connection.insert(connection)
            }
        };

        if self.verbose {
            debug!(msg = ?request, "Sending request");
        }
        connection.send(request).await?;

        match tokio::time::timeout(timeout, connection.recv()).await {
            Ok(Ok(Some(reply))) => {
                if self.verbose {
                    debug!(msg = ?reply, "Received reply");
                }
                Ok(Some(reply))
            }
            Ok(Ok(None)) => Err(network::TransportError::network("Broker closed the connection").into()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(None),
        }
    }

    /// Ask the broker whether `service` has any registered worker
    pub async fn service_available(&mut self, service: &str) -> Result<bool> {
        let reply = self
            .send(MMI_SERVICE, vec![Bytes::copy_from_slice(service.as_bytes())])
            .await?;
        Ok(reply.first().is_some_and(|code| &code[..] == MMI_OK.as_bytes()))
    }

    /// Drop the connection, closing it cleanly when possible
    pub async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                debug!(error = %e, "Error closing client connection");
            }
        }
    }
}

/// Strip `["", MDPC01, service]` off a reply and check it answers `service`
fn parse_reply(service: &str, mut reply: Message) -> Result<Vec<Bytes>> {
    reply.pop_delimiter("reply")?;
    let header = reply.pop_required("reply")?;
    if Header::try_from(&header[..])? != Header::Client {
        return Err(codec::ProtocolError::unknown_header(&header).into());
    }
    let replied = reply.pop_required("reply")?;
    if &replied[..] != service.as_bytes() {
        return Err(MdpError::UnexpectedReply {
            expected: service.to_string(),
            got: String::from_utf8_lossy(&replied).into_owned(),
        });
    }
    Ok(reply.into_frames())
}
