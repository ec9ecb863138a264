use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, Serialize)]
struct Reading {
    lat: f64,
    lon: f64,
    temp: f64,
}

impl Reading {
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self {
            lat: 40.7128 + rng.gen_range(-0.01..0.01),
            lon: -74.0060 + rng.gen_range(-0.01..0.01),
            temp: rng.gen_range(-19.5..-16.5),
        }
    }
}

fn device_address(index: u64) -> String {
    format!("0x{:040x}", index + 1)
}

// Requires a live broker and a running ledger; authorize the ten
// load-test-dev addresses first or everything lands in the rejected counter.
#[tokio::test]
#[ignore]
async fn test_500_readings_per_second() {
    println!("\n🚀 Starting Load Test: 500 readings/s");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let test_duration_secs = 10;
    let target_rate = 500;
    let total_messages = test_duration_secs * target_rate;

    let mut mqtt_options = MqttOptions::new("load-test", "localhost", 1883);
    mqtt_options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 20000);

    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                eprintln!("MQTT error: {}", e);
                break;
            }
        }
    });

    println!("\n📊 Test Configuration:");
    println!("  Target Rate:    {} readings/s", target_rate);
    println!("  Duration:       {} seconds", test_duration_secs);
    println!("  Total Readings: {}", total_messages);
    println!("  Devices:        10");

    sleep(Duration::from_millis(500)).await;

    let start = Instant::now();
    let mut sent_count = 0;
    let mut error_count = 0;

    let burst_size = 100;
    let delay_per_burst = Duration::from_micros((burst_size * 1_000_000) / target_rate as u64);

    for batch_start in (0..total_messages).step_by(burst_size as usize) {
        for i in batch_start..std::cmp::min(batch_start + burst_size, total_messages) {
            let address = device_address(i % 10);
            let payload = serde_json::to_string(&Reading::random()).unwrap();

            match client
                .publish(
                    format!("readings/{}", address),
                    QoS::AtLeastOnce,
                    false,
                    payload,
                )
                .await
            {
                Ok(_) => sent_count += 1,
                Err(e) => {
                    error_count += 1;
                    if error_count < 10 {
                        eprintln!("Send error: {}", e);
                    }
                }
            }
        }

        sleep(delay_per_burst).await;
    }

    let duration = start.elapsed();

    println!("\n✅ Test Complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("\n📈 Results:");
    println!("  Total Sent:     {}", sent_count);
    println!("  Errors:         {}", error_count);
    println!("  Duration:       {:.2}s", duration.as_secs_f64());
    println!(
        "  Actual Rate:    {:.2} readings/s",
        sent_count as f64 / duration.as_secs_f64()
    );

    let actual_rate = sent_count as f64 / duration.as_secs_f64();
    assert!(
        actual_rate >= 450.0,
        "Throughput too low: {:.2} readings/s (expected >= 450)",
        actual_rate
    );
    assert!(
        error_count == 0,
        "Too many errors: {} (expected 0)",
        error_count
    );
}
