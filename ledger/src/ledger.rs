use crate::codec;
use crate::errors::{Error, Result};
use crate::events::LedgerEvent;
use crate::model::{DataPoint, DeviceAddr, Reading, ShipmentId};
use crate::registry::DeviceRegistry;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// The single mutation lock around the ledger instance: writers serialize on
/// the write half, reads see the latest committed state through the read
/// half.
pub type SharedLedger = Arc<RwLock<ShipmentLedger>>;

/// Append-only shipment trail plus its authorization registry.
///
/// One instance owns all state; callers go through the operations below and
/// nothing else mutates it. Mutating operations either fully commit (append +
/// event) or fail with no effect. The instance itself is not synchronized;
/// the hosting service serializes writers with a single lock (see main.rs).
pub struct ShipmentLedger {
    operator: DeviceAddr,
    registry: DeviceRegistry,
    shipments: HashMap<ShipmentId, Vec<DataPoint>>,
    events: broadcast::Sender<LedgerEvent>,
}

impl ShipmentLedger {
    /// Creates an empty ledger. Only `operator` may authorize devices.
    pub fn new(operator: DeviceAddr, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        ShipmentLedger {
            operator,
            registry: DeviceRegistry::new(),
            shipments: HashMap::new(),
            events,
        }
    }

    /// Subscribes to the notification stream. Events emitted before the call
    /// are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Binds `device` to `shipment_id` and marks it authorized, overwriting
    /// any prior binding. Restricted to the operator configured at
    /// construction; emits `DeviceAuthorized` exactly once on success.
    pub fn authorize(
        &mut self,
        caller: DeviceAddr,
        device: DeviceAddr,
        shipment_id: ShipmentId,
    ) -> Result<()> {
        if caller != self.operator {
            return Err(Error::NotOperator { caller });
        }

        self.registry.grant(device, shipment_id);
        debug!("authorized device {} for shipment {}", device, shipment_id);

        self.emit(LedgerEvent::DeviceAuthorized {
            device,
            shipment_id,
        });
        Ok(())
    }

    pub fn is_authorized(&self, device: &DeviceAddr) -> bool {
        self.registry.is_authorized(device)
    }

    pub fn shipment_of(&self, device: &DeviceAddr) -> ShipmentId {
        self.registry.shipment_of(device)
    }

    /// Appends a reading to the shipment the caller is authorized for.
    ///
    /// The reading is encoded to fixed-point and stamped with the current
    /// wall-clock time; all fallible steps run before the append, so a
    /// failure leaves the sequence untouched and emits nothing.
    pub fn submit(&mut self, caller: DeviceAddr, reading: &Reading) -> Result<DataPoint> {
        let shipment_id = self.registry.shipment_of(&caller);
        if !self.registry.is_authorized(&caller) {
            return Err(Error::Unauthorized { device: caller });
        }

        let lat = codec::encode_degrees("lat", reading.lat)?;
        let lon = codec::encode_degrees("lon", reading.lon)?;
        let temp = codec::encode_celsius("temp", reading.temp)?;
        let timestamp = Utc::now().timestamp() as u64;

        let point = DataPoint {
            timestamp,
            lat,
            lon,
            temp,
            device_id: caller.to_string(),
        };
        self.shipments
            .entry(shipment_id)
            .or_default()
            .push(point.clone());

        debug!(
            "appended point #{} to shipment {}",
            self.data_count(&shipment_id) - 1,
            shipment_id
        );

        self.emit(LedgerEvent::DataSubmitted {
            shipment_id,
            device: caller,
            timestamp,
            lat,
            lon,
            temp,
        });
        Ok(point)
    }

    /// Number of points appended to the shipment so far; 0 for ids that have
    /// never received data.
    pub fn data_count(&self, shipment_id: &ShipmentId) -> usize {
        self.shipments.get(shipment_id).map_or(0, Vec::len)
    }

    /// Point at `index` in submission order. Indexing is 0-based and dense;
    /// entries are never renumbered.
    pub fn data_at(&self, shipment_id: &ShipmentId, index: usize) -> Result<&DataPoint> {
        let len = self.data_count(shipment_id);
        self.shipments
            .get(shipment_id)
            .and_then(|points| points.get(index))
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Page of points starting at `offset`, at most `limit` long. The log
    /// only grows, so a fixed offset always names the same entries.
    pub fn data_page(&self, shipment_id: &ShipmentId, offset: usize, limit: usize) -> &[DataPoint] {
        let Some(points) = self.shipments.get(shipment_id) else {
            return &[];
        };
        let start = offset.min(points.len());
        let end = start.saturating_add(limit).min(points.len());
        &points[start..end]
    }

    fn emit(&self, event: LedgerEvent) {
        // send errors only when nobody is subscribed
        let _ = self.events.send(event);
    }
}
