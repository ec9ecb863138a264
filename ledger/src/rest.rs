use crate::errors::Error;
use crate::ledger::SharedLedger;
use crate::metrics::AUTHORIZATIONS_TOTAL;
use crate::model::{DataPoint, DeviceAddr, DeviceStatusResponse, ShipmentDataResponse, ShipmentId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use tracing::error;

#[derive(Clone)]
struct AppState {
    ledger: SharedLedger,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    operator: DeviceAddr,
    shipment: String,
}

pub fn create_router(ledger: SharedLedger) -> Router {
    let state = AppState { ledger };

    Router::new()
        .route("/api/v1/shipments/:shipment/data", get(get_shipment_data))
        .route(
            "/api/v1/shipments/:shipment/data/:index",
            get(get_data_point),
        )
        .route("/api/v1/devices/:device", get(get_device_status))
        .route("/api/v1/devices/:device/authorize", post(authorize_device))
        .with_state(state)
}

/// Shipment path segments accept either a 0x-hex id or a human-readable
/// label, derived the same way the dashboard derives ids.
fn shipment_param(raw: &str) -> ShipmentId {
    ShipmentId::from_str(raw).unwrap_or_else(|_| ShipmentId::from_label(raw))
}

async fn get_shipment_data(
    State(state): State<AppState>,
    Path(shipment): Path<String>,
    Query(params): Query<PageQuery>,
) -> Json<ShipmentDataResponse> {
    let shipment_id = shipment_param(&shipment);
    let limit = params.limit.unwrap_or(100).min(1000);
    let offset = params.offset.unwrap_or(0);

    let guard = state.ledger.read().await;
    let data = guard.data_page(&shipment_id, offset, limit).to_vec();
    let total = guard.data_count(&shipment_id);

    Json(ShipmentDataResponse {
        shipment_id,
        data,
        total,
        limit,
        offset,
    })
}

async fn get_data_point(
    State(state): State<AppState>,
    Path((shipment, index)): Path<(String, usize)>,
) -> Result<Json<DataPoint>, ApiError> {
    let shipment_id = shipment_param(&shipment);

    let guard = state.ledger.read().await;
    let point = guard.data_at(&shipment_id, index)?.clone();

    Ok(Json(point))
}

async fn get_device_status(
    State(state): State<AppState>,
    Path(device): Path<String>,
) -> Result<Json<DeviceStatusResponse>, ApiError> {
    let device: DeviceAddr = device.parse()?;

    let guard = state.ledger.read().await;
    Ok(Json(DeviceStatusResponse {
        device,
        authorized: guard.is_authorized(&device),
        shipment_id: guard.shipment_of(&device),
    }))
}

async fn authorize_device(
    State(state): State<AppState>,
    Path(device): Path<String>,
    Json(req): Json<AuthorizeRequest>,
) -> Result<Json<DeviceStatusResponse>, ApiError> {
    let device: DeviceAddr = device.parse()?;
    let shipment_id = shipment_param(&req.shipment);

    let mut guard = state.ledger.write().await;
    guard.authorize(req.operator, device, shipment_id)?;
    AUTHORIZATIONS_TOTAL.inc();

    Ok(Json(DeviceStatusResponse {
        device,
        authorized: true,
        shipment_id,
    }))
}

struct ApiError(Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Unauthorized { .. } | Error::NotOperator { .. } => StatusCode::FORBIDDEN,
            Error::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
            Error::EncodingOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("API error: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_param_accepts_hex_or_label() {
        let from_label = shipment_param("SHIP-001");
        assert_eq!(from_label, ShipmentId::from_label("SHIP-001"));

        let hex = from_label.to_string();
        assert_eq!(shipment_param(&hex), from_label);
    }
}
