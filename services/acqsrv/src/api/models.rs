//! Request/response bodies for the control API.

use serde::{Deserialize, Serialize};

use gridlink_model::ScalarValue;

#[derive(Debug, Deserialize)]
pub struct WriteTagRequest {
    /// A JSON number, or a string that parses as decimal.
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct WriteTagResponse {
    pub success: bool,
    pub value: ScalarValue,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveIntervalBody {
    pub interval: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modbus_code: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub running: bool,
}
