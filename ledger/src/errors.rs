use crate::model::DeviceAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("device {device} is not authorized for any shipment")]
    Unauthorized { device: DeviceAddr },

    #[error("caller {caller} is not the ledger operator")]
    NotOperator { caller: DeviceAddr },

    #[error("index {index} out of range, shipment has {len} data points")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{field} value {value} does not fit its fixed-point width")]
    EncodingOverflow { field: &'static str, value: f64 },

    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel send error")]
    ChannelSend,
}

pub type Result<T> = std::result::Result<T, Error>;
