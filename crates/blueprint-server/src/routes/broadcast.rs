use axum::extract::State;
use axum::Json;
use blueprint_hub::FanoutReport;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BroadcastBody {
    pub method: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// POST /api/broadcast: push an event to every live connection.
pub async fn broadcast(
    State(app): State<AppState>,
    Json(body): Json<BroadcastBody>,
) -> Result<Json<FanoutReport>, AppError> {
    if body.method.trim().is_empty() {
        return Err(AppError::bad_request("method must not be empty"));
    }
    let report = app.fanout.send_to_all(&body.method, body.payload).await;
    Ok(Json(report))
}
