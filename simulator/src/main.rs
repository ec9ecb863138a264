mod device;

use clap::Parser;
use device::DeviceSim;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tracing::{error, info, warn};

/// Simulates shipment tracking devices publishing GPS and temperature
/// readings to the ledger's MQTT topics.
#[derive(Parser, Debug)]
#[command(name = "simulator")]
struct Args {
    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    port: u16,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 3)]
    devices: usize,

    /// Seconds between readings per device
    #[arg(long, env = "INTERVAL_SECS", default_value_t = 5)]
    interval_secs: u64,

    /// Starting latitude for the simulated route
    #[arg(long, env = "BASE_LAT", default_value_t = 40.7128)]
    base_lat: f64,

    /// Starting longitude for the simulated route
    #[arg(long, env = "BASE_LON", default_value_t = -74.0060)]
    base_lon: f64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting shipment device simulator");
    info!(
        "Broker: {}:{}, Devices: {}, Interval: {}s",
        args.broker, args.port, args.devices, args.interval_secs
    );

    let client_id = format!("sim-{}", uuid::Uuid::new_v4());

    // Connect to MQTT broker
    let mut mqtt_options = MqttOptions::new(&client_id, &args.broker, args.port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 1000);

    // Spawn eventloop handler
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT eventloop error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    let mut devices: Vec<DeviceSim> = (0..args.devices)
        .map(|i| DeviceSim::new(i, args.base_lat, args.base_lon))
        .collect();

    // The ledger drops readings from unknown devices, so surface the
    // addresses the operator needs to authorize.
    for device in &devices {
        info!("Simulating device {}", device.address);
    }

    tokio::time::sleep(Duration::from_secs(2)).await;

    info!("Connected to MQTT broker, publishing readings");

    let mut rng = rand::thread_rng();
    let mut counter = 0u64;
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));

    loop {
        ticker.tick().await;

        for device in &mut devices {
            let reading = device.next_reading(&mut rng);

            let payload = match serde_json::to_string(&reading) {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to serialize reading: {}", e);
                    continue;
                }
            };

            match client
                .publish(device.topic(), QoS::AtLeastOnce, false, payload)
                .await
            {
                Ok(_) => {
                    counter += 1;
                }
                Err(e) => {
                    warn!("Failed to publish: {}", e);
                }
            }
        }

        if counter % 100 == 0 && counter > 0 {
            info!("Published {} readings", counter);
        }
    }
}
