use crate::model::{DeviceAddr, ShipmentId};
use serde::Serialize;

/// Notification emitted alongside every committed state change.
///
/// `DataSubmitted` carries the raw fixed-point integers; subscribers divide
/// lat/lon by 1e6 and temp by 10.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    DeviceAuthorized {
        device: DeviceAddr,
        shipment_id: ShipmentId,
    },
    DataSubmitted {
        shipment_id: ShipmentId,
        device: DeviceAddr,
        timestamp: u64,
        lat: i32,
        lon: i32,
        temp: i16,
    },
}

impl LedgerEvent {
    /// MQTT topic the event is re-published on for external subscribers.
    pub fn topic(&self) -> &'static str {
        match self {
            LedgerEvent::DeviceAuthorized { .. } => "events/authorized",
            LedgerEvent::DataSubmitted { .. } => "events/data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_submitted_serializes_raw_integers() {
        let event = LedgerEvent::DataSubmitted {
            shipment_id: ShipmentId::from_label("SHIP-001"),
            device: DeviceAddr::from_bytes([0xaa; 20]),
            timestamp: 1_700_000_000,
            lat: 40_712_800,
            lon: -74_006_000,
            temp: -180,
        };

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "data_submitted");
        assert_eq!(json["lat"], 40_712_800);
        assert_eq!(json["lon"], -74_006_000);
        assert_eq!(json["temp"], -180);
        assert_eq!(event.topic(), "events/data");
    }

    #[test]
    fn test_authorized_topic() {
        let event = LedgerEvent::DeviceAuthorized {
            device: DeviceAddr::from_bytes([1; 20]),
            shipment_id: ShipmentId::from_label("SHIP-001"),
        };
        assert_eq!(event.topic(), "events/authorized");
    }
}
