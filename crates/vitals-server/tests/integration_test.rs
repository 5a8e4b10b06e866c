//! Integration tests for the vitals WebSocket server.
//!
//! These tests start an actual server and connect with a WebSocket client
//! to verify end-to-end functionality.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;

use vitals_core::{AuthError, AuthGate, Credentials, Identity, Reading, SessionToken};
use vitals_server::{ServerConfig, ServerEvent, VitalsServer};

/// Token accepted by the test auth gate.
const VIEWER_TOKEN: &str = "viewer-token";

/// Gate that accepts exactly one fixed token.
struct FixedTokenGate;

impl AuthGate for FixedTokenGate {
    fn authenticate(&self, _credentials: &Credentials) -> Result<SessionToken, AuthError> {
        Ok(SessionToken {
            token: VIEWER_TOKEN.to_string(),
            name: "viewer".to_string(),
        })
    }

    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token == VIEWER_TOKEN {
            Ok(Identity {
                subject: "viewer".to_string(),
            })
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Find an available port for testing.
async fn find_available_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a test server and return the address and event sender.
async fn start_test_server() -> (
    SocketAddr,
    tokio::sync::mpsc::Sender<ServerEvent>,
    std::sync::Arc<vitals_server::Broadcaster>,
    tokio::task::JoinHandle<()>,
) {
    start_test_server_with_auth(None).await
}

/// Start a test server with an optional viewer auth gate.
async fn start_test_server_with_auth(
    auth: Option<std::sync::Arc<dyn AuthGate>>,
) -> (
    SocketAddr,
    tokio::sync::mpsc::Sender<ServerEvent>,
    std::sync::Arc<vitals_server::Broadcaster>,
    tokio::task::JoinHandle<()>,
) {
    let addr = find_available_port().await;

    let config = ServerConfig {
        name: "test-server".to_string(),
        version: "1.0.0".to_string(),
        bind_addr: addr,
        auth,
    };

    let server = VitalsServer::new(config);
    let event_tx = server.event_sender();
    let broadcaster = server.broadcaster();

    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, event_tx, broadcaster, handle)
}

/// Connect a WebSocket client to the given address.
async fn connect_client(addr: SocketAddr) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
    connect_client_with_params(addr, "").await
}

/// Connect a WebSocket client with query parameters.
async fn connect_client_with_params(
    addr: SocketAddr,
    params: &str,
) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
    let url = if params.is_empty() {
        format!("ws://{}/vitals/stream", addr)
    } else {
        format!("ws://{}/vitals/stream?{}", addr, params)
    };
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect");
    ws_stream
}

/// Wait for a text message with timeout.
async fn recv_text(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<String, &'static str> {
    match timeout(Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => Ok(text),
        Ok(Some(Ok(_))) => Err("Unexpected message type"),
        Ok(Some(Err(_))) => Err("WebSocket error"),
        Ok(None) => Err("Connection closed"),
        Err(_) => Err("Timeout"),
    }
}

/// Receive until a message of the given type arrives or the deadline hits.
async fn recv_until_type(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    msg_type: &str,
) -> Result<serde_json::Value, String> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if tokio::time::Instant::now() > deadline {
            return Err(format!("no {msg_type} message before deadline"));
        }
        let text = recv_text(ws).await.map_err(|e| e.to_string())?;
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;
        if value["type"] == msg_type {
            return Ok(value);
        }
    }
}

/// Drain any immediately pending messages (hello + snapshot).
async fn drain_pending(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) {
    while timeout(Duration::from_millis(200), ws.next()).await.is_ok_and(|m| {
        matches!(m, Some(Ok(Message::Text(_))))
    }) {}
}

fn reading(heart_rate: Option<i64>, spo2: Option<i64>) -> Reading {
    Reading {
        heart_rate,
        spo2,
        timestamp: vitals_core::now_millis(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_hello_message_on_connect() {
    let (addr, _event_tx, _broadcaster, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;

    // First message should be hello
    let msg = recv_text(&mut ws).await.expect("Should receive hello");
    let hello: serde_json::Value = serde_json::from_str(&msg).expect("Valid JSON");

    assert_eq!(hello["type"], "hello");
    assert_eq!(hello["data"]["name"], "test-server");
    assert_eq!(hello["data"]["version"], "1.0.0");
    assert!(hello["data"]["timestamp"].is_string());

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_vitals_update_broadcast() {
    let (addr, event_tx, _broadcaster, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    drain_pending(&mut ws).await;

    event_tx
        .send(ServerEvent::ReadingReceived(reading(Some(72), Some(98))))
        .await
        .expect("Should send reading");

    let update = recv_until_type(&mut ws, "vitalsUpdate")
        .await
        .expect("Should receive vitalsUpdate");
    assert_eq!(update["data"]["heartRate"], 72);
    assert_eq!(update["data"]["spo2"], 98);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_subscription_filtering() {
    let (addr, event_tx, _broadcaster, handle) = start_test_server().await;

    let mut ws = connect_client_with_params(addr, "subscribe=none").await;
    let _ = recv_text(&mut ws).await.expect("Should receive hello");

    // Subscribe to heartRate only; the snapshot for that channel comes back.
    ws.send(Message::Text(r#"{"subscribe":["heartRate"]}"#.to_string()))
        .await
        .unwrap();
    let snapshot = recv_until_type(&mut ws, "heartRate").await.unwrap();
    assert!(snapshot["data"].is_null());

    event_tx
        .send(ServerEvent::ReadingReceived(reading(Some(72), Some(98))))
        .await
        .unwrap();

    // The heartRate update arrives; no spo2 event may precede it.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        assert!(tokio::time::Instant::now() < deadline, "no heartRate update");
        let text = recv_text(&mut ws).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_ne!(value["type"], "spo2", "unsubscribed channel delivered");
        assert_ne!(value["type"], "vitalsUpdate");
        if value["type"] == "heartRate" {
            assert_eq!(value["data"], 72);
            break;
        }
    }

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_late_join_snapshot() {
    let (addr, event_tx, _broadcaster, handle) = start_test_server().await;

    // A reading arrives before any viewer connects.
    event_tx
        .send(ServerEvent::ReadingReceived(reading(Some(68), None)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The late joiner immediately sees current state, no new reading needed.
    let mut ws = connect_client(addr).await;
    let _ = recv_text(&mut ws).await.expect("Should receive hello");
    let snapshot = recv_until_type(&mut ws, "heartRate").await.unwrap();
    assert_eq!(snapshot["data"], 68);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_device_push_over_socket_is_normalized() {
    let (addr, _event_tx, broadcaster, handle) = start_test_server().await;

    let mut device = connect_client_with_params(addr, "subscribe=none").await;
    let _ = recv_text(&mut device).await.expect("Should receive hello");

    // Sentinel spo2 must become absent, not zero; heart rate applies.
    device
        .send(Message::Text(
            r#"{"sensorData":{"heartRate":72,"spo2":-10000}}"#.to_string(),
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = broadcaster.snapshot().await;
    assert_eq!(snapshot.heart_rate, Some(72));
    assert_eq!(snapshot.spo2, None);

    device.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_history_request() {
    let (addr, event_tx, _broadcaster, handle) = start_test_server().await;

    for bpm in [70, 71, 72] {
        event_tx
            .send(ServerEvent::ReadingReceived(reading(Some(bpm), None)))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut ws = connect_client_with_params(addr, "subscribe=none").await;
    let _ = recv_text(&mut ws).await.expect("Should receive hello");

    ws.send(Message::Text(r#"{"requestHistory":"heartRate"}"#.to_string()))
        .await
        .unwrap();

    let batch = recv_until_type(&mut ws, "historicalData").await.unwrap();
    assert_eq!(batch["data"]["channel"], "heartRate");
    let samples = batch["data"]["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0]["value"], 70);
    assert_eq!(samples[2]["value"], 72);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_finger_not_detected_event() {
    let (addr, event_tx, _broadcaster, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    drain_pending(&mut ws).await;

    event_tx
        .send(ServerEvent::ReadingReceived(Reading {
            finger_detected: Some(false),
            timestamp: vitals_core::now_millis(),
            ..Default::default()
        }))
        .await
        .unwrap();

    let event = recv_until_type(&mut ws, "fingerNotDetected").await.unwrap();
    assert_eq!(event["data"], true);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_disconnect_does_not_affect_other_sessions() {
    let (addr, event_tx, broadcaster, handle) = start_test_server().await;

    let mut ws1 = connect_client(addr).await;
    let mut ws2 = connect_client(addr).await;
    drain_pending(&mut ws1).await;
    drain_pending(&mut ws2).await;

    // Close the first session, then deliver an update.
    ws1.close(None).await.ok();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(broadcaster.registry().session_count().await, 1);

    event_tx
        .send(ServerEvent::ReadingReceived(reading(Some(75), None)))
        .await
        .unwrap();

    let update = recv_until_type(&mut ws2, "vitalsUpdate")
        .await
        .expect("remaining session still receives updates");
    assert_eq!(update["data"]["heartRate"], 75);

    ws2.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_unsubscribed_client_receives_nothing() {
    let (addr, event_tx, _broadcaster, handle) = start_test_server().await;

    let mut ws = connect_client_with_params(addr, "subscribe=none").await;
    let _ = recv_text(&mut ws).await.expect("Should receive hello");

    event_tx
        .send(ServerEvent::ReadingReceived(reading(Some(72), None)))
        .await
        .unwrap();

    // Nothing may arrive for an empty subscription set.
    let res = timeout(Duration::from_millis(300), ws.next()).await;
    assert!(res.is_err(), "unexpected message for empty subscription");

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_gated_connect_without_token_rejected() {
    let (addr, _event_tx, _broadcaster, handle) =
        start_test_server_with_auth(Some(std::sync::Arc::new(FixedTokenGate))).await;

    let url = format!("ws://{}/vitals/stream", addr);
    let err = tokio_tungstenite::connect_async(&url)
        .await
        .expect_err("handshake should be rejected");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP rejection, got: {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn test_gated_connect_with_bad_token_rejected() {
    let (addr, _event_tx, _broadcaster, handle) =
        start_test_server_with_auth(Some(std::sync::Arc::new(FixedTokenGate))).await;

    let url = format!("ws://{}/vitals/stream?token=wrong", addr);
    let err = tokio_tungstenite::connect_async(&url)
        .await
        .expect_err("handshake should be rejected");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP rejection, got: {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn test_gated_connect_with_valid_token() {
    let (addr, event_tx, _broadcaster, handle) =
        start_test_server_with_auth(Some(std::sync::Arc::new(FixedTokenGate))).await;

    let mut ws = connect_client_with_params(addr, &format!("token={VIEWER_TOKEN}")).await;
    let msg = recv_text(&mut ws).await.expect("Should receive hello");
    let hello: serde_json::Value = serde_json::from_str(&msg).unwrap();
    assert_eq!(hello["type"], "hello");

    // An authenticated session behaves like any other viewer.
    drain_pending(&mut ws).await;
    event_tx
        .send(ServerEvent::ReadingReceived(reading(Some(72), None)))
        .await
        .unwrap();
    let update = recv_until_type(&mut ws, "vitalsUpdate").await.unwrap();
    assert_eq!(update["data"]["heartRate"], 72);

    ws.close(None).await.ok();
    handle.abort();
}

#[tokio::test]
async fn test_session_unregistered_after_abrupt_drop() {
    let (addr, event_tx, broadcaster, handle) = start_test_server().await;

    let mut ws = connect_client(addr).await;
    drain_pending(&mut ws).await;
    assert_eq!(broadcaster.registry().session_count().await, 1);

    // Tear the connection down without a close handshake.
    drop(ws);

    // Keep readings flowing so the server exercises the session exit path,
    // and wait for the registry entry to disappear.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        event_tx
            .send(ServerEvent::ReadingReceived(reading(Some(72), None)))
            .await
            .unwrap();
        if broadcaster.registry().session_count().await == 0 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session leaked after abrupt disconnect"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    handle.abort();
}

#[tokio::test]
async fn test_binary_frames_ignored() {
    let (addr, _event_tx, broadcaster, handle) = start_test_server().await;

    let mut ws = connect_client_with_params(addr, "subscribe=none").await;
    let _ = recv_text(&mut ws).await.expect("Should receive hello");

    ws.send(Message::Binary(vec![0x01, 0x02, 0x03]))
        .await
        .unwrap();

    // The connection survives and still serves requests.
    ws.send(Message::Text(r#"{"requestHistory":"heartRate"}"#.to_string()))
        .await
        .unwrap();
    let batch = recv_until_type(&mut ws, "historicalData").await.unwrap();
    assert_eq!(batch["data"]["channel"], "heartRate");
    assert_eq!(broadcaster.registry().session_count().await, 1);

    ws.close(None).await.ok();
    handle.abort();
}
