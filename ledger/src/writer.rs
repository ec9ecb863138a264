use crate::errors::Error;
use crate::ledger::SharedLedger;
use crate::metrics::{
    APPEND_LATENCY_SECONDS, DATA_POINTS, ENCODING_OVERFLOW_TOTAL, UNAUTHORIZED_TOTAL,
};
use crate::model::Submission;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Single consumer of the ingest channel. Every mutation flows through this
/// task (or the REST authorize handler) under the ledger's write lock, so
/// appends are serialized and sequence order equals arrival order.
pub async fn run_writer(mut rx: mpsc::Receiver<Submission>, ledger: SharedLedger) {
    info!("Starting ledger writer");

    while let Some(submission) = rx.recv().await {
        let start = Instant::now();
        let mut guard = ledger.write().await;

        match guard.submit(submission.device, &submission.reading) {
            Ok(point) => {
                drop(guard);
                APPEND_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
                DATA_POINTS.inc();
                debug!(
                    "Committed reading from {} at {}",
                    submission.device, point.timestamp
                );
            }
            Err(e @ Error::Unauthorized { .. }) => {
                drop(guard);
                UNAUTHORIZED_TOTAL.inc();
                warn!("Rejected submission: {}", e);
            }
            Err(e @ Error::EncodingOverflow { .. }) => {
                drop(guard);
                ENCODING_OVERFLOW_TOTAL.inc();
                warn!("Rejected submission: {}", e);
            }
            Err(e) => {
                drop(guard);
                error!("Submit failed: {}", e);
            }
        }
    }

    info!("Ledger writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ShipmentLedger;
    use crate::model::{DeviceAddr, Reading, ShipmentId};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn device(tag: u8) -> DeviceAddr {
        DeviceAddr::from_bytes([tag; 20])
    }

    #[test]
    fn test_writer_commits_authorized_submissions() {
        tokio_test::block_on(async {
            let operator = device(0xff);
            let shipment = ShipmentId::from_label("SHIP-001");
            let mut inner = ShipmentLedger::new(operator, 16);
            inner.authorize(operator, device(0xaa), shipment).unwrap();
            let ledger: SharedLedger = Arc::new(RwLock::new(inner));

            let (tx, rx) = mpsc::channel(8);
            let handle = tokio::spawn(run_writer(rx, ledger.clone()));

            tx.send(Submission {
                device: device(0xaa),
                reading: Reading {
                    lat: 40.7128,
                    lon: -74.0060,
                    temp: -18.0,
                },
            })
            .await
            .unwrap();
            // unauthorized device: dropped, not appended
            tx.send(Submission {
                device: device(0xbb),
                reading: Reading {
                    lat: 40.7128,
                    lon: -74.0060,
                    temp: -18.0,
                },
            })
            .await
            .unwrap();

            drop(tx);
            handle.await.unwrap();

            let guard = ledger.read().await;
            assert_eq!(guard.data_count(&shipment), 1);
            assert_eq!(
                guard.data_at(&shipment, 0).unwrap().device_id,
                device(0xaa).to_string()
            );
        });
    }
}
