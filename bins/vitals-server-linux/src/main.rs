mod sink;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitals_core::{normalize, now_millis, NullSink, Reading, ReadingSink};
use vitals_ingest::{LineAdapter, PubSubAdapter};
use vitals_server::{ServerConfig, ServerEvent, VitalsServer};
use vitals_web::{create_router, AppState, JwtAuthGate};

use sink::JsonlSink;

/// Reconnect delay after a transport fault.
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,vitals_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Vitals server starting...");

    // Configuration
    let ws_addr: SocketAddr = env_or("VITALS_WS_ADDR", "0.0.0.0:3900").parse()?;
    let http_addr: SocketAddr = env_or("VITALS_HTTP_ADDR", "0.0.0.0:3901").parse()?;
    let serial_port = std::env::var("VITALS_SERIAL_PORT").ok();
    let serial_baud: u32 = env_or("VITALS_SERIAL_BAUD", "115200").parse()?;
    let mqtt_host = env_or("VITALS_MQTT_HOST", "test.mosquitto.org");
    let mqtt_port: u16 = env_or("VITALS_MQTT_PORT", "1883").parse()?;
    let mqtt_topic = env_or("VITALS_MQTT_TOPIC", "healthcare/sensors");

    let auth_gate = Arc::new(JwtAuthGate::new(env_or(
        "VITALS_JWT_SECRET",
        "vitals-dev-secret",
    )));
    let require_auth = matches!(
        std::env::var("VITALS_REQUIRE_AUTH").as_deref(),
        Ok("1") | Ok("true")
    );

    let sink: Arc<dyn ReadingSink> = match std::env::var("VITALS_LOG_FILE") {
        Ok(path) => {
            tracing::info!(path = %path, "Persisting readings to JSONL file");
            Arc::new(JsonlSink::open(&path)?)
        }
        Err(_) => Arc::new(NullSink),
    };

    let config = ServerConfig {
        name: "vitals-server-rust".to_string(),
        version: "1.0.0".to_string(),
        bind_addr: ws_addr,
        auth: require_auth.then(|| auth_gate.clone() as Arc<dyn vitals_core::AuthGate>),
    };

    // Start WebSocket server
    let server = VitalsServer::new(config);
    let event_tx = server.event_sender();
    let broadcaster = server.broadcaster();

    // Spawn WebSocket server
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("WebSocket server error: {}", e);
        }
    });

    // Start HTTP API server
    let http_state = AppState::new(broadcaster, auth_gate);
    let http_handle = tokio::spawn(async move {
        if let Err(e) = start_http_server(http_addr, http_state).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    // Device transports: serial if configured, simulated readings otherwise
    let device_handle = match serial_port {
        Some(port) => {
            let tx = event_tx.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                run_serial_provider(port, serial_baud, tx, sink).await;
            })
        }
        None => {
            tracing::info!("VITALS_SERIAL_PORT not set, generating simulated readings");
            let tx = event_tx.clone();
            tokio::spawn(async move {
                generate_demo_data(tx).await;
            })
        }
    };

    let mqtt_handle = {
        let tx = event_tx.clone();
        let sink = sink.clone();
        tokio::spawn(async move {
            run_mqtt_provider(mqtt_host, mqtt_port, mqtt_topic, tx, sink).await;
        })
    };

    tracing::info!("🚀 Vitals server ready!");
    tracing::info!("   WebSocket: ws://localhost:{}/vitals/stream", ws_addr.port());
    tracing::info!("   HTTP API:  http://localhost:{}/api/vitals", http_addr.port());

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = ws_handle => {
            tracing::warn!("WebSocket server stopped");
        }
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = device_handle => {
            tracing::warn!("Device provider stopped");
        }
        _ = mqtt_handle => {
            tracing::warn!("MQTT provider stopped");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Start the HTTP API server
async fn start_http_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Read framed lines from a serial device, reconnecting on failure.
async fn run_serial_provider(
    port: String,
    baud: u32,
    event_tx: mpsc::Sender<ServerEvent>,
    sink: Arc<dyn ReadingSink>,
) {
    loop {
        let mut stream = match tokio_serial::new(port.as_str(), baud).open_native_async() {
            Ok(stream) => {
                tracing::info!(port = %port, baud, "Serial port opened");
                stream
            }
            Err(e) => {
                tracing::warn!(port = %port, error = %e, "Failed to open serial port, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        let mut adapter = LineAdapter::new();
        let mut buf = [0u8; 256];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => {
                    tracing::warn!(port = %port, "Serial port closed, reconnecting");
                    break;
                }
                Ok(n) => {
                    for parsed in adapter.push_chunk(&buf[..n]) {
                        match parsed {
                            Ok(candidate) => {
                                let reading = normalize(candidate);
                                if reading.is_empty() {
                                    continue;
                                }
                                if let Err(e) = sink.append(&reading) {
                                    tracing::warn!(error = %e, "Persistence append failed");
                                }
                                if event_tx
                                    .send(ServerEvent::ReadingReceived(reading))
                                    .await
                                    .is_err()
                                {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Discarded malformed serial line");
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(port = %port, error = %e, "Serial read error, reconnecting");
                    break;
                }
            }
        }

        tokio::time::sleep(RETRY_DELAY).await;
    }
}

/// Subscribe to the broker topic and forward readings.
async fn run_mqtt_provider(
    host: String,
    port: u16,
    topic: String,
    event_tx: mpsc::Sender<ServerEvent>,
    sink: Arc<dyn ReadingSink>,
) {
    let mut options = MqttOptions::new("vitals-server", host.clone(), port);
    options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(options, 10);
    if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
        tracing::error!(topic = %topic, error = %e, "MQTT subscribe failed");
        return;
    }
    tracing::info!(host = %host, port, topic = %topic, "MQTT provider started");

    let adapter = PubSubAdapter::new(sink);
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match adapter.handle_message(&publish.payload) {
                    Ok(reading) => {
                        if reading.is_empty() {
                            continue;
                        }
                        if event_tx
                            .send(ServerEvent::ReadingReceived(reading))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarded malformed MQTT message");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "MQTT connection error, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Generate demo data - simulated pulse oximeter readings.
async fn generate_demo_data(event_tx: mpsc::Sender<ServerEvent>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut tick: u64 = 0;

    loop {
        interval.tick().await;
        tick += 1;

        let phase = tick as f64 / 10.0;
        let temperature_c = 36.5 + phase.cos() * 0.3;
        let reading = Reading {
            heart_rate: Some((72.0 + phase.sin() * 6.0).round() as i64),
            spo2: Some((97.0 + (phase * 0.7).cos() * 1.5).round() as i64),
            temperature_c: Some((temperature_c * 10.0).round() / 10.0),
            temperature_f: Some(((temperature_c * 9.0 / 5.0 + 32.0) * 10.0).round() / 10.0),
            finger_detected: Some(true),
            status: Some("ok".to_string()),
            timestamp: now_millis(),
        };

        if event_tx
            .send(ServerEvent::ReadingReceived(reading))
            .await
            .is_err()
        {
            tracing::error!("Failed to send demo reading - server may have stopped");
            break;
        }
    }
}
