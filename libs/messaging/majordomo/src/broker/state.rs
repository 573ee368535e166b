//! # Broker Routing State
//!
//! The Majordomo broker core with no sockets in it. Inbound messages arrive
//! ROUTER-style, prefixed by the sender's address frame; everything the
//! broker wants to send is pushed to an outbox of `(PeerId, Message)` pairs
//! that the IO loop drains. Time is always passed in, which keeps heartbeat
//! and expiry behaviour deterministic under test.
//!
//! ## Bookkeeping
//!
//! ```text
//! services: name → { queued requests, waiting workers }
//! workers:  peer → { service, expiry }
//! waiting:  every idle worker, oldest first
//! ```
//!
//! A worker is idle (in both waiting lists) from READY until it is handed a
//! request, and again after each REPLY.

use super::PeerId;
use bytes::Bytes;
use codec::{
    is_internal_service, Command, Header, Message, ProtocolError, MMI_NOT_FOUND,
    MMI_NOT_IMPLEMENTED, MMI_OK, MMI_SERVICE,
};
use dialogue_config::HeartbeatConfig;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Encode a peer id as the 8-byte address frame used in envelopes
pub fn peer_address(peer: PeerId) -> Bytes {
    Bytes::copy_from_slice(&peer.to_be_bytes())
}

/// Decode an address frame back into a peer id
pub fn parse_peer_address(frame: &[u8]) -> codec::Result<PeerId> {
    let bytes: [u8; 8] = frame
        .try_into()
        .map_err(|_| ProtocolError::InvalidAddress { len: frame.len() })?;
    Ok(PeerId::from_be_bytes(bytes))
}

/// A named service and its queues
#[derive(Debug, Default)]
struct Service {
    /// Client requests as `[client, "", body...]`
    requests: VecDeque<Message>,
    waiting: VecDeque<PeerId>,
}

#[derive(Debug)]
struct WorkerEntry {
    service: String,
    expiry: Instant,
}

/// Majordomo broker state
#[derive(Debug)]
pub struct BrokerState {
    services: HashMap<String, Service>,
    workers: HashMap<PeerId, WorkerEntry>,
    waiting: VecDeque<PeerId>,
    heartbeat_interval: Duration,
    heartbeat_expiry: Duration,
    heartbeat_at: Instant,
    outbox: Vec<(PeerId, Message)>,
}

impl BrokerState {
    pub fn new(heartbeat: HeartbeatConfig, now: Instant) -> Self {
        Self {
            services: HashMap::new(),
            workers: HashMap::new(),
            waiting: VecDeque::new(),
            heartbeat_interval: heartbeat.interval(),
            heartbeat_expiry: heartbeat.expiry(),
            heartbeat_at: now + heartbeat.interval(),
            outbox: Vec::new(),
        }
    }

    /// Process one inbound `[sender, "", header, ...]` message
    ///
    /// Malformed messages are reported as errors and leave the state
    /// untouched; the caller decides whether to log or drop them.
    pub fn process(&mut self, mut msg: Message, now: Instant) -> codec::Result<()> {
        let sender = parse_peer_address(&msg.pop_required("routed")?)?;
        msg.pop_delimiter("routed")?;
        let header = msg.pop_required("routed")?;

        match Header::try_from(&header[..])? {
            Header::Client => self.process_client(sender, msg, now),
            Header::Worker => self.process_worker(sender, msg, now),
        }
    }

    /// Client `[service, body...]`
    fn process_client(&mut self, sender: PeerId, mut msg: Message, now: Instant) -> codec::Result<()> {
        if msg.len() < 2 {
            return Err(ProtocolError::missing_frames("client", 2, msg.len()));
        }
        let service_frame = msg.pop_required("client")?;
        let service = service_name(&service_frame)?;

        // Reply envelope back to the client
        msg.wrap(peer_address(sender));

        if is_internal_service(&service_frame) {
            self.service_internal(service_frame, msg)
        } else {
            self.services.entry(service.clone()).or_default().requests.push_back(msg);
            self.dispatch(&service, now);
            Ok(())
        }
    }

    /// Worker `[command, ...]`
    fn process_worker(&mut self, sender: PeerId, mut msg: Message, now: Instant) -> codec::Result<()> {
        let command_frame = msg.pop_required("worker")?;
        let command = match Command::try_from(&command_frame[..]) {
            Ok(command) => command,
            Err(e) => {
                warn!(peer = sender, error = %e, "Ignoring invalid worker command");
                return Ok(());
            }
        };
        let known = self.workers.contains_key(&sender);

        match command {
            Command::Ready => {
                let service_frame = msg.pop_required("worker READY")?;
                let service = service_name(&service_frame)?;
                if known || is_internal_service(&service_frame) {
                    warn!(peer = sender, service = %service, "Rejecting READY");
                    self.delete_worker(sender, true);
                } else {
                    info!(peer = sender, service = %service, "Worker registered");
                    self.workers.insert(
                        sender,
                        WorkerEntry {
                            service,
                            expiry: now + self.heartbeat_expiry,
                        },
                    );
                    self.worker_waiting(sender, now);
                }
            }
            Command::Reply => match self.workers.get(&sender).map(|w| w.service.clone()) {
                Some(service) => {
                    let client = match reply_client(&mut msg) {
                        Ok(client) => client,
                        Err(e) => {
                            warn!(peer = sender, error = %e, "Malformed REPLY, disconnecting worker");
                            self.delete_worker(sender, true);
                            return Err(e);
                        }
                    };
                    msg.push_front(Bytes::from(service.into_bytes()));
                    msg.push_front(Header::Client.as_frame());
                    msg.push_front(Bytes::new());
                    self.outbox.push((client, msg));
                    self.worker_waiting(sender, now);
                }
                None => self.delete_worker(sender, true),
            },
            Command::Heartbeat => {
                if let Some(worker) = self.workers.get_mut(&sender) {
                    worker.expiry = now + self.heartbeat_expiry;
                } else {
                    self.delete_worker(sender, true);
                }
            }
            Command::Disconnect => {
                debug!(peer = sender, "Worker disconnected");
                self.delete_worker(sender, false);
            }
            Command::Request => {
                warn!(peer = sender, "Ignoring REQUEST sent by a worker");
            }
        }
        Ok(())
    }

    /// Answer `mmi.*` requests; `msg` is `[client, "", body...]`
    fn service_internal(&mut self, service_frame: Bytes, mut msg: Message) -> codec::Result<()> {
        let code = if &service_frame[..] == MMI_SERVICE.as_bytes() {
            let target = msg.back().map(|frame| &frame[..]).unwrap_or_default();
            let target = std::str::from_utf8(target).unwrap_or_default();
            if self.has_workers(target) {
                MMI_OK
            } else {
                MMI_NOT_FOUND
            }
        } else {
            MMI_NOT_IMPLEMENTED
        };

        let client = msg
            .unwrap()
            .ok_or_else(|| ProtocolError::missing_frames("client", 1, 0))?;
        let client = parse_peer_address(&client)?;

        let mut reply = Message::from_frames([Bytes::from_static(code.as_bytes())]);
        reply.push_front(service_frame);
        reply.push_front(Header::Client.as_frame());
        reply.push_front(Bytes::new());
        self.outbox.push((client, reply));
        Ok(())
    }

    /// Mark a worker idle and try to hand it queued work
    fn worker_waiting(&mut self, peer: PeerId, now: Instant) {
        let Some(worker) = self.workers.get_mut(&peer) else {
            return;
        };
        worker.expiry = now + self.heartbeat_expiry;
        let service = worker.service.clone();

        if !self.waiting.contains(&peer) {
            self.waiting.push_back(peer);
            self.services.entry(service.clone()).or_default().waiting.push_back(peer);
        }
        self.dispatch(&service, now);
    }

    /// Pair waiting workers with queued requests
    fn dispatch(&mut self, service: &str, now: Instant) {
        self.purge_workers(now);

        let Some(entry) = self.services.get_mut(service) else {
            return;
        };
        while !entry.waiting.is_empty() && !entry.requests.is_empty() {
            let (Some(worker), Some(mut request)) =
                (entry.waiting.pop_front(), entry.requests.pop_front())
            else {
                break;
            };
            self.waiting.retain(|&peer| peer != worker);

            request.push_front(Command::Request.as_frame());
            request.push_front(Header::Worker.as_frame());
            request.push_front(Bytes::new());
            self.outbox.push((worker, request));
        }
        if entry.requests.is_empty() && entry.waiting.is_empty() {
            self.services.remove(service);
        }
    }

    /// Delete idle workers that have been silent past their expiry
    pub fn purge_workers(&mut self, now: Instant) {
        let expired: Vec<PeerId> = self
            .waiting
            .iter()
            .copied()
            .filter(|peer| self.workers.get(peer).is_some_and(|w| w.expiry < now))
            .collect();

        for peer in expired {
            info!(peer, "Purging expired worker");
            self.delete_worker(peer, false);
        }
    }

    /// Purge expired workers and heartbeat idle ones when due
    pub fn on_tick(&mut self, now: Instant) {
        self.purge_workers(now);

        if now >= self.heartbeat_at {
            for &peer in &self.waiting {
                self.outbox.push((peer, command_message(Command::Heartbeat)));
            }
            self.heartbeat_at = now + self.heartbeat_interval;
        }
    }

    /// Forget a peer whose connection is gone
    ///
    /// A worker on that connection is deleted; requests queued by it as a
    /// client are dropped since nobody is left to receive the reply.
    pub fn peer_disconnected(&mut self, peer: PeerId) {
        if self.workers.contains_key(&peer) {
            self.delete_worker(peer, false);
        }

        let address = peer_address(peer);
        self.services.retain(|_, service| {
            service
                .requests
                .retain(|request| request.front() != Some(&address));
            !service.requests.is_empty() || !service.waiting.is_empty()
        });
    }

    /// Send DISCONNECT to every worker and forget them
    pub fn shutdown(&mut self) {
        let peers: Vec<PeerId> = self.workers.keys().copied().collect();
        for peer in peers {
            self.delete_worker(peer, true);
        }
    }

    fn delete_worker(&mut self, peer: PeerId, disconnect: bool) {
        if disconnect {
            self.outbox.push((peer, command_message(Command::Disconnect)));
        }
        if let Some(worker) = self.workers.remove(&peer) {
            if let Some(service) = self.services.get_mut(&worker.service) {
                service.waiting.retain(|&p| p != peer);
                if service.waiting.is_empty() && service.requests.is_empty() {
                    self.services.remove(&worker.service);
                }
            }
        }
        self.waiting.retain(|&p| p != peer);
    }

    fn has_workers(&self, service: &str) -> bool {
        self.workers.values().any(|worker| worker.service == service)
    }

    /// Drain everything queued for sending
    pub fn take_outbox(&mut self) -> Vec<(PeerId, Message)> {
        std::mem::take(&mut self.outbox)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// Services with queued requests or idle workers
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn queued_requests(&self, service: &str) -> usize {
        self.services.get(service).map_or(0, |s| s.requests.len())
    }

    pub fn next_heartbeat(&self) -> Instant {
        self.heartbeat_at
    }
}

/// `["", MDPW01, command]`
fn command_message(command: Command) -> Message {
    Message::from_frames([
        Bytes::new(),
        Bytes::from_static(Header::Worker.as_frame()),
        Bytes::from_static(command.as_frame()),
    ])
}

/// Pop the `[client, ""]` envelope a worker puts in front of its reply
fn reply_client(msg: &mut Message) -> codec::Result<PeerId> {
    let client = msg
        .unwrap()
        .ok_or_else(|| ProtocolError::missing_frames("worker REPLY", 1, 0))?;
    parse_peer_address(&client)
}

fn service_name(frame: &Bytes) -> codec::Result<String> {
    std::str::from_utf8(frame)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidServiceName)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{C_CLIENT, S_WORKER};

    const CLIENT: PeerId = 1;
    const WORKER: PeerId = 2;

    fn heartbeat() -> HeartbeatConfig {
        HeartbeatConfig {
            liveness: 3,
            interval_ms: 1000,
            reconnect_ms: 1000,
        }
    }

    fn routed(sender: PeerId, frames: &[&[u8]]) -> Message {
        let mut msg = Message::from_frames(frames.iter().map(|f| Bytes::copy_from_slice(f)));
        msg.push_front(Bytes::new());
        msg.push_front(peer_address(sender));
        msg
    }

    fn frames(msg: &Message) -> Vec<Vec<u8>> {
        msg.frames().map(|f| f.to_vec()).collect()
    }

    fn ready(state: &mut BrokerState, peer: PeerId, service: &str, now: Instant) {
        state
            .process(routed(peer, &[S_WORKER, Command::Ready.as_frame(), service.as_bytes()]), now)
            .unwrap();
    }

    #[test]
    fn test_peer_address_roundtrip() {
        assert_eq!(parse_peer_address(&peer_address(42)).unwrap(), 42);
        assert_eq!(
            parse_peer_address(b"abc"),
            Err(ProtocolError::InvalidAddress { len: 3 })
        );
    }

    #[test]
    fn test_request_waits_for_worker_then_dispatches() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);

        state.process(routed(CLIENT, &[C_CLIENT, b"nlu", b"hello"]), now).unwrap();
        assert_eq!(state.queued_requests("nlu"), 1);
        assert!(state.take_outbox().is_empty());

        ready(&mut state, WORKER, "nlu", now);
        let outbox = state.take_outbox();
        assert_eq!(outbox.len(), 1);
        let (peer, request) = &outbox[0];
        assert_eq!(*peer, WORKER);
        assert_eq!(
            frames(request),
            vec![
                vec![],
                S_WORKER.to_vec(),
                vec![2],
                peer_address(CLIENT).to_vec(),
                vec![],
                b"hello".to_vec(),
            ]
        );
        assert_eq!(state.queued_requests("nlu"), 0);
        assert_eq!(state.waiting_count(), 0);
    }

    #[test]
    fn test_reply_is_routed_to_client() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, WORKER, "nlu", now);
        state.process(routed(CLIENT, &[C_CLIENT, b"nlu", b"hello"]), now).unwrap();
        state.take_outbox();

        let client = peer_address(CLIENT);
        state
            .process(routed(WORKER, &[S_WORKER, &[3], &client, b"", b"tokens"]), now)
            .unwrap();

        let outbox = state.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].0, CLIENT);
        assert_eq!(
            frames(&outbox[0].1),
            vec![vec![], C_CLIENT.to_vec(), b"nlu".to_vec(), b"tokens".to_vec()]
        );
        // Worker is idle again
        assert_eq!(state.waiting_count(), 1);
    }

    #[test]
    fn test_requests_are_served_in_order() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        for body in [&b"one"[..], b"two"] {
            state.process(routed(CLIENT, &[C_CLIENT, b"nlu", body]), now).unwrap();
        }
        ready(&mut state, WORKER, "nlu", now);
        let first = state.take_outbox();
        assert_eq!(&first[0].1.back().unwrap()[..], b"one");

        let client = peer_address(CLIENT);
        state
            .process(routed(WORKER, &[S_WORKER, &[3], &client, b"", b"1"]), now)
            .unwrap();
        let second = state.take_outbox();
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].0, WORKER);
        assert_eq!(&second[1].1.back().unwrap()[..], b"two");
    }

    #[test]
    fn test_mmi_service_lookup() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);

        state.process(routed(CLIENT, &[C_CLIENT, b"mmi.service", b"nlu"]), now).unwrap();
        let outbox = state.take_outbox();
        assert_eq!(
            frames(&outbox[0].1),
            vec![vec![], C_CLIENT.to_vec(), b"mmi.service".to_vec(), b"404".to_vec()]
        );

        ready(&mut state, WORKER, "nlu", now);
        state.process(routed(CLIENT, &[C_CLIENT, b"mmi.service", b"nlu"]), now).unwrap();
        assert_eq!(&state.take_outbox()[0].1.back().unwrap()[..], b"200");

        state.process(routed(CLIENT, &[C_CLIENT, b"mmi.echo", b"x"]), now).unwrap();
        assert_eq!(&state.take_outbox()[0].1.back().unwrap()[..], b"501");
    }

    #[test]
    fn test_second_ready_disconnects_worker() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, WORKER, "nlu", now);
        ready(&mut state, WORKER, "nlu", now);

        let outbox = state.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(&outbox[0].1.back().unwrap()[..], Command::Disconnect.as_frame());
        assert_eq!(state.worker_count(), 0);
        assert_eq!(state.waiting_count(), 0);
    }

    #[test]
    fn test_ready_for_internal_service_is_rejected() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, WORKER, "mmi.service", now);
        assert_eq!(state.worker_count(), 0);
        assert_eq!(state.take_outbox().len(), 1);
    }

    #[test]
    fn test_unknown_worker_reply_and_heartbeat_disconnect() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        let client = peer_address(CLIENT);

        state
            .process(routed(WORKER, &[S_WORKER, &[3], &client, b"", b"x"]), now)
            .unwrap();
        state.process(routed(WORKER, &[S_WORKER, &[4]]), now).unwrap();

        let outbox = state.take_outbox();
        assert_eq!(outbox.len(), 2);
        assert!(outbox.iter().all(|(peer, _)| *peer == WORKER));
    }

    #[test]
    fn test_malformed_reply_disconnects_busy_worker() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, WORKER, "nlu", now);
        state.process(routed(CLIENT, &[C_CLIENT, b"nlu", b"first"]), now).unwrap();
        state.process(routed(CLIENT, &[C_CLIENT, b"nlu", b"second"]), now).unwrap();
        state.take_outbox();
        assert_eq!(state.queued_requests("nlu"), 1);

        let err = state
            .process(routed(WORKER, &[S_WORKER, &[3], b"bad", b"", b"x"]), now)
            .unwrap_err();
        assert_eq!(err, ProtocolError::InvalidAddress { len: 3 });

        let outbox = state.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].0, WORKER);
        assert_eq!(&outbox[0].1.back().unwrap()[..], Command::Disconnect.as_frame());
        assert_eq!(state.worker_count(), 0);

        state.process(routed(CLIENT, &[C_CLIENT, b"mmi.service", b"nlu"]), now).unwrap();
        assert_eq!(&state.take_outbox()[0].1.back().unwrap()[..], b"404");

        // A fresh worker picks up the request that was still queued
        ready(&mut state, 3, "nlu", now);
        let outbox = state.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(&outbox[0].1.back().unwrap()[..], b"second");
    }

    #[test]
    fn test_reply_without_envelope_disconnects_worker() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, WORKER, "nlu", now);
        state.process(routed(CLIENT, &[C_CLIENT, b"nlu", b"hello"]), now).unwrap();
        state.take_outbox();

        assert!(state.process(routed(WORKER, &[S_WORKER, &[3]]), now).is_err());
        assert_eq!(state.worker_count(), 0);
        assert_eq!(state.take_outbox().len(), 1);
    }

    #[test]
    fn test_idle_services_are_forgotten() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);

        for (client, service) in [(10, "a"), (11, "b"), (12, "c")] {
            state
                .process(routed(client, &[C_CLIENT, service.as_bytes(), b"x"]), now)
                .unwrap();
        }
        assert_eq!(state.service_count(), 3);
        for client in [10, 11, 12] {
            state.peer_disconnected(client);
        }
        assert_eq!(state.service_count(), 0);

        // Dispatch empties the service once its only request is handed out
        state.process(routed(CLIENT, &[C_CLIENT, b"nlu", b"x"]), now).unwrap();
        ready(&mut state, WORKER, "nlu", now);
        assert_eq!(state.service_count(), 0);
        assert_eq!(state.worker_count(), 1);

        // Back to idle, then gone with the worker
        let client = peer_address(CLIENT);
        state
            .process(routed(WORKER, &[S_WORKER, &[3], &client, b"", b"done"]), now)
            .unwrap();
        assert_eq!(state.service_count(), 1);
        state.peer_disconnected(WORKER);
        assert_eq!(state.service_count(), 0);
    }

    #[test]
    fn test_disconnect_and_invalid_commands() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, WORKER, "nlu", now);

        state.process(routed(WORKER, &[S_WORKER, &[9]]), now).unwrap();
        assert_eq!(state.worker_count(), 1);

        state.process(routed(WORKER, &[S_WORKER, &[5]]), now).unwrap();
        assert_eq!(state.worker_count(), 0);
        assert!(state.take_outbox().is_empty());
    }

    #[test]
    fn test_malformed_messages_are_rejected() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);

        let err = state.process(routed(CLIENT, &[b"MDPX01", b"nlu", b"x"]), now).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownHeader { .. }));

        let err = state.process(routed(CLIENT, &[C_CLIENT, b"nlu"]), now).unwrap_err();
        assert_eq!(err, ProtocolError::missing_frames("client", 2, 1));

        let err = state
            .process(Message::from_frames([&b"short"[..], &b""[..], C_CLIENT]), now)
            .unwrap_err();
        assert_eq!(err, ProtocolError::InvalidAddress { len: 5 });
        assert!(state.take_outbox().is_empty());
    }

    #[test]
    fn test_heartbeats_go_to_waiting_workers_when_due() {
        let start = Instant::now();
        let mut state = BrokerState::new(heartbeat(), start);
        ready(&mut state, WORKER, "nlu", start);

        state.on_tick(start + Duration::from_millis(500));
        assert!(state.take_outbox().is_empty());

        let due = start + Duration::from_millis(1000);
        state.process(routed(WORKER, &[S_WORKER, &[4]]), due).unwrap();
        state.on_tick(due);
        let outbox = state.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(&outbox[0].1.back().unwrap()[..], Command::Heartbeat.as_frame());
        assert_eq!(state.next_heartbeat(), due + Duration::from_millis(1000));
    }

    #[test]
    fn test_silent_workers_expire() {
        let start = Instant::now();
        let mut state = BrokerState::new(heartbeat(), start);
        ready(&mut state, WORKER, "nlu", start);

        // Expiry is interval x liveness
        state.purge_workers(start + Duration::from_millis(3000));
        assert_eq!(state.worker_count(), 1);

        state.purge_workers(start + Duration::from_millis(3001));
        assert_eq!(state.worker_count(), 0);
        assert_eq!(state.waiting_count(), 0);
    }

    #[test]
    fn test_peer_disconnect_drops_worker_and_queued_requests() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, WORKER, "echo", now);
        state.process(routed(CLIENT, &[C_CLIENT, b"nlu", b"pending"]), now).unwrap();

        state.peer_disconnected(WORKER);
        state.peer_disconnected(CLIENT);
        assert_eq!(state.worker_count(), 0);
        assert_eq!(state.queued_requests("nlu"), 0);
    }

    #[test]
    fn test_shutdown_disconnects_every_worker() {
        let now = Instant::now();
        let mut state = BrokerState::new(heartbeat(), now);
        ready(&mut state, 10, "nlu", now);
        ready(&mut state, 11, "echo", now);
        state.take_outbox();

        state.shutdown();
        let mut peers: Vec<PeerId> = state.take_outbox().into_iter().map(|(p, _)| p).collect();
        peers.sort_unstable();
        assert_eq!(peers, vec![10, 11]);
        assert_eq!(state.worker_count(), 0);
    }
}
