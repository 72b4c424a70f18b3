//! Control API handlers.
//!
//! Errors map to JSON bodies carrying the operator message; a Modbus
//! exception additionally carries its code so clients can special-case
//! device-side rejections.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::AcqError;

use super::models::{
    ApiErrorBody, ArchiveIntervalBody, HealthResponse, StatusResponse, WriteTagRequest,
    WriteTagResponse,
};
use super::AppState;

pub struct ApiFailure(AcqError);

impl From<AcqError> for ApiFailure {
    fn from(err: AcqError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AcqError::NotFound { .. } => StatusCode::NOT_FOUND,
            AcqError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ApiErrorBody {
            error: self.0.operator_message(),
            modbus_code: self.0.exception_code(),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn engine_start(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    state.engine.start().await?;
    Ok(Json(StatusResponse { success: true }))
}

pub async fn engine_stop(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    state.engine.stop().await?;
    Ok(Json(StatusResponse { success: true }))
}

pub async fn reload_node(
    State(state): State<AppState>,
    Path(node_id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    state.engine.reload_node(node_id).await?;
    Ok(Json(StatusResponse { success: true }))
}

pub async fn reconnect_device(
    State(state): State<AppState>,
    Path(device_id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    state.engine.reconnect_device(device_id).await?;
    Ok(Json(StatusResponse { success: true }))
}

pub async fn write_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i64>,
    Json(request): Json<WriteTagRequest>,
) -> Result<Json<WriteTagResponse>, ApiFailure> {
    let confirmed = state.engine.write_tag(tag_id, &request.value).await?;
    Ok(Json(WriteTagResponse {
        success: true,
        value: confirmed,
    }))
}

pub async fn get_archive_interval(
    State(state): State<AppState>,
) -> Json<ArchiveIntervalBody> {
    Json(ArchiveIntervalBody {
        interval: state.engine.archive_interval().await,
    })
}

pub async fn put_archive_interval(
    State(state): State<AppState>,
    Json(body): Json<ArchiveIntervalBody>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    state.engine.set_archive_interval(body.interval).await?;
    Ok(Json(StatusResponse { success: true }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "acqsrv",
        version: env!("CARGO_PKG_VERSION"),
        running: state.engine.is_running(),
    })
}
