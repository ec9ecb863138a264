use crate::errors::{Error, Result};
use crate::events::LedgerEvent;
use crate::metrics::{
    CHANNEL_FULL_TOTAL, INVALID_READINGS_TOTAL, READINGS_TOTAL, VALID_READINGS_TOTAL,
};
use crate::model::{DeviceAddr, Reading, Submission};
use crate::validate::validate;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 2000;

/// Devices publish readings to `readings/{0x-address}`; the topic suffix is
/// the caller identity, never the payload.
const READINGS_TOPIC_PREFIX: &str = "readings/";

pub fn connect(broker: &str, port: u16, client_id: &str) -> (AsyncClient, EventLoop) {
    let mut mqtt_options = MqttOptions::new(client_id, broker, port);
    mqtt_options.set_keep_alive(std::time::Duration::from_secs(30));
    mqtt_options.set_clean_session(false);

    AsyncClient::new(mqtt_options, 10000)
}

/// Runs the inbound side: subscribes to the readings topic and feeds parsed,
/// validated submissions into the writer's channel.
pub async fn run_ingest(
    client: AsyncClient,
    mut eventloop: EventLoop,
    tx: mpsc::Sender<Submission>,
) -> Result<()> {
    let topic = format!("{READINGS_TOPIC_PREFIX}#");
    client
        .subscribe(topic.as_str(), QoS::AtLeastOnce)
        .await
        .map_err(Error::Mqtt)?;

    info!("Subscribed to {} with QoS 1", topic);

    loop {
        match eventloop.poll().await {
            Ok(notification) => {
                if let Event::Incoming(Packet::Publish(publish)) = notification {
                    READINGS_TOTAL.inc();

                    debug!(
                        "Received message on topic {}, size: {} bytes",
                        publish.topic,
                        publish.payload.len()
                    );

                    if let Err(e) =
                        process_message_with_retry(&publish.topic, &publish.payload, &tx).await
                    {
                        error!("Failed to process message after retries: {}", e);
                        INVALID_READINGS_TOTAL.inc();
                    }
                }
            }
            Err(e) => {
                error!("MQTT error: {}", e);
                // rumqttc automatically reconnects, so we just log and continue
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

/// Runs the outbound side: re-publishes the ledger's notification stream as
/// JSON onto the event topics for external subscribers.
pub async fn run_event_publisher(client: AsyncClient, mut events: broadcast::Receiver<LedgerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let payload = match serde_json::to_string(&event) {
                    Ok(p) => p,
                    Err(e) => {
                        error!("Failed to serialize event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = client
                    .publish(event.topic(), QoS::AtLeastOnce, false, payload)
                    .await
                {
                    warn!("Failed to publish event: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event publisher lagged, {} events dropped", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Event stream closed");
                break;
            }
        }
    }
}

/// Process a message with exponential backoff retry
async fn process_message_with_retry(
    topic: &str,
    payload: &[u8],
    tx: &mpsc::Sender<Submission>,
) -> Result<()> {
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match process_message(topic, payload, tx).await {
            Ok(()) => {
                if attempt > 1 {
                    info!("Message processed successfully on attempt {}", attempt);
                }
                return Ok(());
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    return Err(e);
                }

                if !is_retryable_error(&e) {
                    warn!("Non-retryable error: {}", e);
                    return Err(e);
                }

                warn!(
                    "Message processing failed (attempt {}/{}): {}. Retrying in {}ms...",
                    attempt, MAX_RETRIES, e, backoff_ms
                );

                tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;

                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

/// Process a single message
async fn process_message(topic: &str, payload: &[u8], tx: &mpsc::Sender<Submission>) -> Result<()> {
    let device = device_from_topic(topic)?;

    let reading = serde_json::from_slice::<Reading>(payload)
        .map_err(|e| Error::Validation(format!("JSON parse error: {}", e)))?;

    validate(&reading)?;

    let submission = Submission { device, reading };

    match tx.try_send(submission) {
        Ok(()) => {
            VALID_READINGS_TOTAL.inc();
            Ok(())
        }
        Err(tokio::sync::mpsc::error::TrySendError::Full(submission)) => {
            CHANNEL_FULL_TOTAL.inc();
            debug!("Channel full, using blocking send");
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            tx.send(submission).await.map_err(|_| Error::ChannelSend)?;
            VALID_READINGS_TOTAL.inc();
            Ok(())
        }
        Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
            error!("Channel closed, cannot send submission");
            Err(Error::ChannelSend)
        }
    }
}

fn device_from_topic(topic: &str) -> Result<DeviceAddr> {
    let suffix = topic
        .strip_prefix(READINGS_TOPIC_PREFIX)
        .ok_or_else(|| Error::Validation(format!("unexpected topic: {topic}")))?;
    suffix.parse()
}

/// Determine if an error is retryable
fn is_retryable_error(error: &Error) -> bool {
    // Only backpressure is transient; a bad topic or payload never becomes valid
    matches!(error, Error::ChannelSend)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE: &str = "0xaabbccddeeff00112233445566778899aabbccdd";

    #[test]
    fn test_device_from_topic() {
        let device = device_from_topic(&format!("readings/{DEVICE}")).unwrap();
        assert_eq!(device.to_string(), DEVICE);

        assert!(device_from_topic("telemetry/dev-1").is_err());
        assert!(device_from_topic("readings/not-an-address").is_err());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error(&Error::ChannelSend));
        assert!(!is_retryable_error(&Error::Validation("test".to_string())));
    }

    #[test]
    fn test_process_message_valid() {
        tokio_test::block_on(async {
            let (tx, mut rx) = mpsc::channel(10);

            let reading = Reading {
                lat: 40.7128,
                lon: -74.0060,
                temp: -18.0,
            };
            let payload = serde_json::to_vec(&reading).unwrap();

            assert!(
                process_message(&format!("readings/{DEVICE}"), &payload, &tx)
                    .await
                    .is_ok()
            );

            let received = rx.recv().await.unwrap();
            assert_eq!(received.device.to_string(), DEVICE);
            assert_eq!(received.reading.temp, -18.0);
        });
    }

    #[test]
    fn test_process_message_invalid_json() {
        tokio_test::block_on(async {
            let (tx, _rx) = mpsc::channel(10);
            let payload = b"invalid json";

            assert!(
                process_message(&format!("readings/{DEVICE}"), payload, &tx)
                    .await
                    .is_err()
            );
        });
    }

    #[test]
    fn test_process_message_implausible_latitude() {
        tokio_test::block_on(async {
            let (tx, _rx) = mpsc::channel(10);

            let reading = Reading {
                lat: 123.0, // Out of range
                lon: -74.0060,
                temp: -18.0,
            };
            let payload = serde_json::to_vec(&reading).unwrap();

            assert!(
                process_message(&format!("readings/{DEVICE}"), &payload, &tx)
                    .await
                    .is_err()
            );
        });
    }

    #[test]
    fn test_process_message_bad_topic() {
        tokio_test::block_on(async {
            let (tx, _rx) = mpsc::channel(10);

            let reading = Reading {
                lat: 40.7128,
                lon: -74.0060,
                temp: -18.0,
            };
            let payload = serde_json::to_vec(&reading).unwrap();

            assert!(process_message("readings/", &payload, &tx).await.is_err());
        });
    }
}
