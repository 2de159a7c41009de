use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscriptionBody {
    pub group: String,
}

fn checked(app: &AppState, connection: &str, body: &SubscriptionBody) -> Result<(), AppError> {
    if body.group.trim().is_empty() {
        return Err(AppError::bad_request("group must not be empty"));
    }
    if !app.transport.is_open(connection) {
        return Err(AppError::not_found(format!(
            "connection '{connection}' is not open"
        )));
    }
    Ok(())
}

/// POST /api/subscriptions/{connection}: join an additional group.
///
/// Any open connection may join any group; authorizing a connection for a
/// wallet group belongs to the identity layer in front of the hub.
pub async fn subscribe(
    State(app): State<AppState>,
    Path(connection): Path<String>,
    Json(body): Json<SubscriptionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    checked(&app, &connection, &body)?;
    app.lifecycle.subscribe(&connection, &body.group);
    Ok(Json(serde_json::json!({
        "connection": connection,
        "group": body.group,
        "subscribed": true,
    })))
}

/// DELETE /api/subscriptions/{connection}: leave a group.
pub async fn unsubscribe(
    State(app): State<AppState>,
    Path(connection): Path<String>,
    Json(body): Json<SubscriptionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    checked(&app, &connection, &body)?;
    app.lifecycle.unsubscribe(&connection, &body.group);
    Ok(Json(serde_json::json!({
        "connection": connection,
        "group": body.group,
        "subscribed": false,
    })))
}
