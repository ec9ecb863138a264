use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 20-byte device identity, the caller on every write operation.
///
/// Rendered and parsed as `0x` followed by 40 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddr([u8; 20]);

impl DeviceAddr {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        DeviceAddr(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for DeviceAddr {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_fixed(s)
            .map(DeviceAddr)
            .ok_or_else(|| crate::errors::Error::Validation(format!("invalid device address: {s}")))
    }
}

impl TryFrom<String> for DeviceAddr {
    type Error = crate::errors::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DeviceAddr> for String {
    fn from(addr: DeviceAddr) -> String {
        addr.to_string()
    }
}

/// Opaque 32-byte shipment identifier.
///
/// Shipments have no explicit creation step; an id simply names the
/// append-only sequence it accumulates. The all-zero id is reserved as the
/// "no shipment" default for devices that were never authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShipmentId([u8; 32]);

impl ShipmentId {
    pub const ZERO: ShipmentId = ShipmentId([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        ShipmentId(bytes)
    }

    /// Derives an id from a human-readable label: UTF-8 bytes, truncated to
    /// 32 bytes and zero-padded. Collaborator-side helper; core operations
    /// only ever see the resulting opaque id.
    pub fn from_label(label: &str) -> Self {
        let mut bytes = [0u8; 32];
        let src = label.as_bytes();
        let n = src.len().min(32);
        bytes[..n].copy_from_slice(&src[..n]);
        ShipmentId(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for ShipmentId {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_fixed(s)
            .map(ShipmentId)
            .ok_or_else(|| crate::errors::Error::Validation(format!("invalid shipment id: {s}")))
    }
}

impl TryFrom<String> for ShipmentId {
    type Error = crate::errors::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ShipmentId> for String {
    fn from(id: ShipmentId) -> String {
        id.to_string()
    }
}

fn parse_hex_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let hex = s.strip_prefix("0x")?;
    if hex.len() != 2 * N {
        return None;
    }
    let mut out = [0u8; N];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out[i] = ((hi << 4) | lo) as u8;
    }
    Some(out)
}

/// Raw sensor reading as submitted by a device.
///
/// Carries no timestamp: time is stamped server-side at append, so a device
/// cannot forge the trail's ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Reading {
    pub lat: f64,
    pub lon: f64,
    pub temp: f64,
}

/// A reading together with the device identity it arrived under, as queued
/// between the MQTT edge and the ledger writer.
#[derive(Debug, Clone, Copy)]
pub struct Submission {
    pub device: DeviceAddr,
    pub reading: Reading,
}

/// One committed ledger entry. Immutable once appended.
///
/// `lat`/`lon` are fixed-point degrees at scale 1e6, `temp` is fixed-point
/// Celsius at scale 10. `device_id` is derived from the submitting caller's
/// address, never chosen by the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: u64,
    pub lat: i32,
    pub lon: i32,
    pub temp: i16,
    pub device_id: String,
}

/// REST response for a paginated shipment data read.
#[derive(Debug, Serialize)]
pub struct ShipmentDataResponse {
    pub shipment_id: ShipmentId,
    pub data: Vec<DataPoint>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// REST response for a device authorization lookup.
#[derive(Debug, Serialize)]
pub struct DeviceStatusResponse {
    pub device: DeviceAddr,
    pub authorized: bool,
    pub shipment_id: ShipmentId,
}
