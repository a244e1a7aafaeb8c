//! HTTP surface of the ingestion service.
//!
//! `POST /data` takes a form-encoded sensor report with the optional fields
//! `estado_puerta` (door state as a stringified integer) and `movimiento`
//! (free-text motion label), as sent by the embedded sensors.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::store::Store;
use crate::services::ingest::{self, IngestError};
use crate::services::provision::Installation;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub installation: Installation,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
    #[serde(rename = "estado_puerta", alias = "door_state")]
    pub door_state: Option<String>,
    #[serde(rename = "movimiento", alias = "motion")]
    pub motion: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportAck {
    pub message: String,
    pub event_id: i64,
    pub motion_code: i32,
    pub door_code: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageBody { message: self.message })).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Rejected(e) => ApiError::bad_request(e.to_string()),
            IngestError::Storage(e) => {
                error!("Storing report failed: {}", e);
                ApiError::internal("Failed to store report")
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/data", post(submit_report))
        .route("/health", get(health))
        .with_state(state)
}

async fn submit_report(State(state): State<AppState>, Form(form): Form<ReportForm>) -> Result<Json<ReportAck>, ApiError> {
    debug!(
        "Report received (door_state={:?}, motion={:?})",
        form.door_state, form.motion
    );

    let store = Arc::clone(&state.store);
    let room_id = state.installation.room_id;
    let event = tokio::task::spawn_blocking(move || {
        ingest::submit_report(
            store.as_ref(),
            room_id,
            form.door_state.as_deref(),
            form.motion.as_deref(),
            Utc::now(),
        )
    })
    .await
    .map_err(|e| {
        error!("Ingestion task failed: {}", e);
        ApiError::internal("Failed to store report")
    })??;

    Ok(Json(ReportAck {
        message: "Report recorded".to_string(),
        event_id: event.id,
        motion_code: event.motion_code,
        door_code: event.door_code,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
