//! # Broker Round-Trip Integration Test
//!
//! Runs a real broker on a loopback port with workers and clients connected
//! over TCP, verifying request routing, MMI lookups, handler failures and
//! shutdown.

use async_trait::async_trait;
use bytes::Bytes;
use dialogue_config::{ClientSettings, HeartbeatConfig, RuntimeConfig};
use majordomo::{shutdown, Broker, Client, MdpError, RequestHandler, Worker};
use std::time::Duration;
use tokio::time::timeout;

struct Echo;

#[async_trait]
impl RequestHandler for Echo {
    async fn handle(&self, request: Vec<Bytes>) -> majordomo::Result<Vec<Bytes>> {
        Ok(request)
    }
}

struct Failing;

#[async_trait]
impl RequestHandler for Failing {
    async fn handle(&self, _request: Vec<Bytes>) -> majordomo::Result<Vec<Bytes>> {
        Err(MdpError::handler("boom"))
    }
}

fn test_runtime() -> RuntimeConfig {
    RuntimeConfig {
        verbose: true,
        heartbeat: HeartbeatConfig {
            liveness: 3,
            interval_ms: 100,
            reconnect_ms: 100,
        },
        client: ClientSettings {
            timeout_ms: 2000,
            retries: 1,
        },
        ..RuntimeConfig::default()
    }
}

/// Initialize tracing for tests (call once per test)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

async fn start_broker(runtime: &RuntimeConfig) -> (String, Broker) {
    let listener = network::bind("127.0.0.1:0").await.unwrap();
    let broker = Broker::from_listener(runtime, listener);
    let endpoint = broker.local_addr().unwrap().to_string();
    (endpoint, broker)
}

async fn wait_for_service(client: &mut Client, service: &str) {
    for _ in 0..50 {
        if client.service_available(service).await.unwrap() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("service {} never became available", service);
}

#[tokio::test]
async fn test_request_reply_through_broker() {
    init_tracing();
    let runtime = test_runtime();
    let (endpoint, broker) = start_broker(&runtime).await;
    let (trigger, signal) = shutdown::channel();

    let broker_task = tokio::spawn(broker.run(signal.clone()));
    let echo_task = tokio::spawn(Worker::new(&endpoint, "echo", Echo, &runtime).run(signal.clone()));
    let fail_task = tokio::spawn(Worker::new(&endpoint, "fail", Failing, &runtime).run(signal.clone()));

    let mut client = Client::new(&endpoint, &runtime);
    wait_for_service(&mut client, "echo").await;
    wait_for_service(&mut client, "fail").await;

    let reply = client
        .send("echo", vec![Bytes::from_static(b"hello"), Bytes::from_static(b"world")])
        .await
        .unwrap();
    assert_eq!(reply, vec![Bytes::from_static(b"hello"), Bytes::from_static(b"world")]);

    // Handler failures still produce a reply
    let reply = client.send("fail", vec![Bytes::from_static(b"x")]).await.unwrap();
    assert_eq!(reply, vec![Bytes::from_static(b"error: boom")]);

    // Worker is back in rotation after the failure
    let reply = client.send("echo", vec![Bytes::from_static(b"again")]).await.unwrap();
    assert_eq!(reply, vec![Bytes::from_static(b"again")]);

    trigger.trigger();
    timeout(Duration::from_secs(3), broker_task).await.unwrap().unwrap().unwrap();
    timeout(Duration::from_secs(3), echo_task).await.unwrap().unwrap().unwrap();
    timeout(Duration::from_secs(3), fail_task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_mmi_answers_without_workers() {
    init_tracing();
    let runtime = test_runtime();
    let (endpoint, broker) = start_broker(&runtime).await;
    let (trigger, signal) = shutdown::channel();
    let broker_task = tokio::spawn(broker.run(signal));

    let mut client = Client::new(&endpoint, &runtime);
    assert!(!client.service_available("nlu").await.unwrap());

    let reply = client.send("mmi.version", vec![Bytes::from_static(b"?")]).await.unwrap();
    assert_eq!(reply, vec![Bytes::from_static(b"501")]);

    client.close().await;
    trigger.trigger();
    timeout(Duration::from_secs(3), broker_task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_request_is_queued_until_worker_arrives() {
    init_tracing();
    let runtime = test_runtime();
    let (endpoint, broker) = start_broker(&runtime).await;
    let (trigger, signal) = shutdown::channel();
    let broker_task = tokio::spawn(broker.run(signal.clone()));

    let mut client = Client::new(&endpoint, &runtime);
    let request = tokio::spawn(async move {
        client.send("late", vec![Bytes::from_static(b"queued")]).await
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    let worker_task = tokio::spawn(Worker::new(&endpoint, "late", Echo, &runtime).run(signal));

    let reply = timeout(Duration::from_secs(3), request).await.unwrap().unwrap().unwrap();
    assert_eq!(reply, vec![Bytes::from_static(b"queued")]);

    trigger.trigger();
    timeout(Duration::from_secs(3), broker_task).await.unwrap().unwrap().unwrap();
    timeout(Duration::from_secs(3), worker_task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_client_times_out_without_worker() {
    init_tracing();
    let runtime = RuntimeConfig {
        client: ClientSettings {
            timeout_ms: 50,
            retries: 2,
        },
        ..test_runtime()
    };
    let (endpoint, broker) = start_broker(&runtime).await;
    let (trigger, signal) = shutdown::channel();
    let broker_task = tokio::spawn(broker.run(signal));

    let mut client = Client::new(&endpoint, &runtime);
    let err = client.send("nobody", vec![Bytes::from_static(b"hi")]).await.unwrap_err();
    assert!(matches!(err, MdpError::Timeout { attempts: 3, .. }));

    trigger.trigger();
    timeout(Duration::from_secs(3), broker_task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_worker_keeps_retrying_until_broker_appears() {
    init_tracing();
    let runtime = test_runtime();

    // Reserve a port, then release it so the worker's first attempts fail
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (trigger, signal) = shutdown::channel();
    let worker_task = tokio::spawn(Worker::new(addr.to_string(), "echo", Echo, &runtime).run(signal.clone()));
    tokio::time::sleep(Duration::from_millis(150)).await;

    let listener = network::bind(addr).await.unwrap();
    let broker_task = tokio::spawn(Broker::from_listener(&runtime, listener).run(signal));

    let mut client = Client::new(addr.to_string(), &runtime);
    wait_for_service(&mut client, "echo").await;

    trigger.trigger();
    timeout(Duration::from_secs(3), worker_task).await.unwrap().unwrap().unwrap();
    timeout(Duration::from_secs(3), broker_task).await.unwrap().unwrap().unwrap();
}
