// JSON wire protocol between device, relay and dashboards
use crate::application::error::RelayError;
use crate::domain::history::HistorySnapshot;
use crate::domain::telemetry::Reading;
use serde::Serialize;
use serde_json::Value;

pub const SENSOR_DATA: &str = "sensor_data";

/// Server -> dashboard frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    HistoricalData { data: HistorySnapshot },
    Update { data: Reading, timestamp: String },
}

/// Decode a device frame into a reading.
///
/// The `type` field is checked before the shape, so a well-formed message of
/// another kind reports `UnsupportedKind` rather than a decode error.
pub fn decode_inbound(text: &str) -> Result<Reading, RelayError> {
    let value: Value = serde_json::from_str(text)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(RelayError::MissingKind)?;
    if kind != SENSOR_DATA {
        return Err(RelayError::UnsupportedKind(kind.to_string()));
    }

    Ok(serde_json::from_value(value)?)
}

pub fn encode(message: &OutboundMessage) -> Result<String, RelayError> {
    serde_json::to_string(message).map_err(RelayError::Encode)
}
