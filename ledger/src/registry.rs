use crate::model::{DeviceAddr, ShipmentId};
use std::collections::HashMap;

/// Device-to-shipment authorization registry.
///
/// Maps each device to at most one shipment at a time. A grant is permanent:
/// there is no revocation operation, only re-granting to a different
/// shipment, which overwrites the binding (last write wins, no history kept
/// beyond the event stream). Lookups never fail; unknown devices read as
/// unauthorized with the zero shipment id.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    bindings: HashMap<DeviceAddr, ShipmentId>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry {
            bindings: HashMap::new(),
        }
    }

    /// Binds `device` to `shipment_id`, overwriting any prior binding.
    /// Multiple devices may be bound to the same shipment.
    pub fn grant(&mut self, device: DeviceAddr, shipment_id: ShipmentId) {
        self.bindings.insert(device, shipment_id);
    }

    pub fn is_authorized(&self, device: &DeviceAddr) -> bool {
        self.bindings.contains_key(device)
    }

    /// Shipment the device is bound to, or the zero id if never granted.
    pub fn shipment_of(&self, device: &DeviceAddr) -> ShipmentId {
        self.bindings
            .get(device)
            .copied()
            .unwrap_or(ShipmentId::ZERO)
    }
}
