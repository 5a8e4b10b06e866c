//! Vitals WebSocket server implementation.
//!
//! This module provides the WebSocket server that handles:
//! - Viewer connections (optionally token-gated)
//! - Hello message on connect
//! - Late-join snapshot sync
//! - Subscription management, history requests, and device push

use std::net::SocketAddr;
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vitals_core::{normalize, AuthGate, Metric, Reading};
use vitals_protocol::{
    decode_client_message, encode_server_message, ClientMessage, HelloMessage, HistoryBatch,
    ServerMessage,
};

use crate::broadcast::Broadcaster;
use crate::registry::SESSION_QUEUE_CAPACITY;
use crate::subscription::{snapshot_messages, ChannelSet};

/// Configuration for the vitals WebSocket server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Server name sent in the hello message.
    pub name: String,
    /// Protocol version.
    pub version: String,
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Optional admission control for viewer connections. Device-side
    /// ingestion transports are never gated by this.
    pub auth: Option<Arc<dyn AuthGate>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "vitals-server-rust".to_string(),
            version: "1.0.0".to_string(),
            bind_addr: "0.0.0.0:3900".parse().expect("static addr"),
            auth: None,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("bind_addr", &self.bind_addr)
            .field("auth", &self.auth.is_some())
            .finish()
    }
}

/// Events that can be sent to the server by ingestion providers.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A normalized reading arrived from a transport adapter.
    ReadingReceived(Reading),
}

/// The vitals WebSocket server.
pub struct VitalsServer {
    config: ServerConfig,
    broadcaster: Arc<Broadcaster>,
    /// Channel for receiving readings from providers.
    event_tx: mpsc::Sender<ServerEvent>,
    event_rx: mpsc::Receiver<ServerEvent>,
}

impl VitalsServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1024);
        Self {
            config,
            broadcaster: Arc::new(Broadcaster::new()),
            event_tx,
            event_rx,
        }
    }

    /// Get a sender for submitting readings to the server.
    pub fn event_sender(&self) -> mpsc::Sender<ServerEvent> {
        self.event_tx.clone()
    }

    /// Get a handle to the broadcaster (shared with the HTTP layer).
    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }

    /// Run the server, listening for WebSocket connections.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("vitals server listening on {}", self.config.bind_addr);

        // Spawn the event processor: the single writer every transport
        // serializes through.
        let broadcaster = self.broadcaster.clone();
        tokio::spawn(async move {
            while let Some(event) = self.event_rx.recv().await {
                match event {
                    ServerEvent::ReadingReceived(reading) => {
                        broadcaster.ingest(reading).await;
                    }
                }
            }
        });

        // Accept connections
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let config = self.config.clone();
                    let broadcaster = self.broadcaster.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, config, broadcaster).await
                        {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    config: ServerConfig,
    broadcaster: Arc<Broadcaster>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("New connection from {}", addr);

    let subscribe_mode = Arc::new(std::sync::Mutex::new(String::from("all")));
    let subscribe_mode_cb = subscribe_mode.clone();
    let auth = config.auth.clone();

    // Perform the handshake with a callback that extracts query params and
    // enforces the auth gate before the upgrade completes.
    let ws_stream =
        tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, resp: Response| {
            let mut token: Option<String> = None;
            if let Some(query) = req.uri().query() {
                for param in query.split('&') {
                    if let Some((key, value)) = param.split_once('=') {
                        match key {
                            "subscribe" => {
                                if let Ok(mut mode) = subscribe_mode_cb.lock() {
                                    *mode = value.to_string();
                                }
                            }
                            "token" => token = Some(value.to_string()),
                            _ => {}
                        }
                    }
                }
            }

            if let Some(gate) = auth {
                let verified = token.as_deref().map(|t| gate.verify(t).is_ok());
                if verified != Some(true) {
                    let mut reject = ErrorResponse::new(Some("unauthorized".to_string()));
                    *reject.status_mut() = StatusCode::UNAUTHORIZED;
                    return Err(reject);
                }
            }

            Ok(resp)
        })
        .await?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Send hello
    let hello = HelloMessage::new(&config.name, &config.version);
    let hello_msg = encode_server_message(&ServerMessage::Hello(hello))?;
    ws_tx.send(Message::Text(hello_msg)).await?;
    debug!("Sent hello to {}", addr);

    // Initial subscription based on query parameter.
    let mode = subscribe_mode
        .lock()
        .map(|m| m.clone())
        .unwrap_or_else(|_| "all".to_string());
    let mut channels = match mode.as_str() {
        "none" => ChannelSet::none(),
        _ => ChannelSet::all(),
    };

    // Register the session.
    let session_id = Uuid::new_v4();
    let (session_tx, mut session_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
    broadcaster
        .registry()
        .subscribe(session_id, channels.clone(), session_tx)
        .await;

    // From here on the session is registered: however the loop exits,
    // the registry entry must go with it.
    let result = run_session(
        addr,
        session_id,
        &mut channels,
        &broadcaster,
        &mut ws_tx,
        &mut ws_rx,
        &mut session_rx,
    )
    .await;

    // Immediate, idempotent cleanup.
    broadcaster.registry().unsubscribe(session_id).await;

    result
}

/// Session loop for one registered viewer: late-join snapshot push, then
/// interleaved fanout delivery and client message handling.
async fn run_session(
    addr: SocketAddr,
    session_id: Uuid,
    channels: &mut ChannelSet,
    broadcaster: &Arc<Broadcaster>,
    ws_tx: &mut SplitSink<WebSocketStream<TcpStream>, Message>,
    ws_rx: &mut SplitStream<WebSocketStream<TcpStream>>,
    session_rx: &mut mpsc::Receiver<ServerMessage>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Late-join sync for the initial subscription.
    let snapshot = broadcaster.snapshot().await;
    for msg in snapshot_messages(&snapshot, channels) {
        ws_tx.send(Message::Text(encode_server_message(&msg)?)).await?;
    }

    loop {
        tokio::select! {
            // Updates fanned out by the broadcaster for this session.
            update = session_rx.recv() => {
                match update {
                    Some(msg) => {
                        let text = encode_server_message(&msg)?;
                        if let Err(e) = ws_tx.send(Message::Text(text)).await {
                            error!("Failed to send update to {}: {}", addr, e);
                            break;
                        }
                    }
                    None => {
                        debug!("Session queue closed for {}", addr);
                        break;
                    }
                }
            }

            // Messages from the client.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_client_message(
                            &text,
                            session_id,
                            channels,
                            broadcaster,
                            ws_tx,
                        )
                        .await
                        {
                            warn!("Error handling message from {}: {}", addr, e);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} closed connection", addr);
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        // Protocol is JSON over text frames only.
                        warn!("Ignoring binary frame from {}", addr);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_tx.send(Message::Pong(data)).await?;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    _ => {} // Ignore other message types
                }
            }
        }
    }

    Ok(())
}

/// Handle a message received from a client.
async fn handle_client_message(
    text: &str,
    session_id: Uuid,
    channels: &mut ChannelSet,
    broadcaster: &Arc<Broadcaster>,
    ws_tx: &mut SplitSink<WebSocketStream<TcpStream>, Message>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let msg = decode_client_message(text)?;

    match msg {
        ClientMessage::Subscribe { subscribe } => {
            debug!("Client subscribed to {:?}", subscribe);
            channels.subscribe(&subscribe);
            broadcaster
                .registry()
                .set_channels(session_id, channels.clone())
                .await;

            // Late-join sync for the newly subscribed channels only.
            let added = ChannelSet::from_channels(&subscribe);
            let snapshot = broadcaster.snapshot().await;
            for msg in snapshot_messages(&snapshot, &added) {
                ws_tx.send(Message::Text(encode_server_message(&msg)?)).await?;
            }
        }
        ClientMessage::Unsubscribe { unsubscribe } => {
            debug!("Client unsubscribed from {:?}", unsubscribe);
            channels.unsubscribe(&unsubscribe);
            broadcaster
                .registry()
                .set_channels(session_id, channels.clone())
                .await;
        }
        ClientMessage::History { request_history } => {
            match Metric::from_channel(&request_history) {
                Some(metric) => {
                    let samples = broadcaster.history(metric).await;
                    let batch = ServerMessage::HistoricalData(HistoryBatch {
                        channel: request_history,
                        samples,
                    });
                    ws_tx
                        .send(Message::Text(encode_server_message(&batch)?))
                        .await?;
                }
                None => {
                    warn!("History requested for unknown channel {:?}", request_history);
                }
            }
        }
        ClientMessage::SensorData { sensor_data } | ClientMessage::HealthData { health_data: sensor_data } => {
            // Device push over the socket: same normalization contract as
            // every other transport.
            broadcaster.ingest(normalize(sensor_data)).await;
        }
    }

    Ok(())
}
