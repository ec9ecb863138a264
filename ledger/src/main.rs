mod codec;
mod errors;
mod events;
mod ledger;
mod metrics;
mod model;
mod mqtt;
mod registry;
mod rest;
mod validate;
mod writer;

use axum::{routing::get, Router};
use std::env;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};

// Default operator: the first well-known local dev account, matching the
// identity the demo deployment authorizes from.
const DEFAULT_OPERATOR: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

#[tokio::main]
async fn main() {
    let mqtt_broker = env::var("MQTT_BROKER").unwrap_or_else(|_| "localhost".to_string());
    let mqtt_port: u16 = env::var("MQTT_PORT")
        .unwrap_or_else(|_| "1883".to_string())
        .parse()
        .unwrap_or(1883);
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let operator_addr = env::var("OPERATOR").unwrap_or_else(|_| DEFAULT_OPERATOR.to_string());
    let channel_capacity: usize = env::var("CHANNEL_CAPACITY")
        .unwrap_or_else(|_| "100000".to_string())
        .parse()
        .unwrap_or(100000);
    let event_capacity: usize = env::var("EVENT_CAPACITY")
        .unwrap_or_else(|_| "1024".to_string())
        .parse()
        .unwrap_or(1024);

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting shipment ledger");
    info!("MQTT broker: {}:{}", mqtt_broker, mqtt_port);
    info!("HTTP server: {}", http_addr);

    // Initialize metrics
    metrics::init_metrics();

    let operator: model::DeviceAddr = match operator_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid OPERATOR address: {}", e);
            std::process::exit(1);
        }
    };
    info!("Ledger operator: {}", operator);

    let shared = Arc::new(RwLock::new(ledger::ShipmentLedger::new(
        operator,
        event_capacity,
    )));
    let event_stream = shared.read().await.subscribe();

    // Create bounded channel for device submissions
    info!("Channel capacity: {}", channel_capacity);
    let (tx, rx) = mpsc::channel(channel_capacity);

    // Generate client ID
    let client_id = format!("ledger-{}", uuid::Uuid::new_v4());
    let (client, eventloop) = mqtt::connect(&mqtt_broker, mqtt_port, &client_id);

    let ingest_client = client.clone();
    let ingest_handle = tokio::spawn(async move {
        if let Err(e) = mqtt::run_ingest(ingest_client, eventloop, tx).await {
            error!("MQTT ingest task failed: {}", e);
        }
    });

    // Single writer task serializes every append
    let writer_ledger = shared.clone();
    let writer_handle = tokio::spawn(async move {
        writer::run_writer(rx, writer_ledger).await;
    });

    // Re-publish the notification stream for external subscribers
    let publisher_handle = tokio::spawn(async move {
        mqtt::run_event_publisher(client, event_stream).await;
    });

    // Build HTTP app with REST API and metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(shared.clone()));

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = ingest_handle => {
            error!("MQTT ingest task terminated");
        }
        _ = writer_handle => {
            error!("Writer task terminated");
        }
        _ = publisher_handle => {
            error!("Event publisher task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
