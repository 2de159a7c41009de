use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use blueprint_hub::NotificationEvent;
use serde::Deserialize;
use tokio_stream::StreamExt as _;

use crate::sse::ConnectionGuard;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub wallet_address: Option<String>,
}

fn to_sse(event: &NotificationEvent) -> Result<Event, axum::Error> {
    Event::default().event(&event.method).json_data(&event.payload)
}

/// GET /api/events: open a live connection.
///
/// The first event, `connected`, carries the connection id and the group
/// joined; afterwards every notification for the connection's groups is
/// streamed with the hub method as the event name.
pub async fn sse_events(
    State(app): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let connection = uuid::Uuid::new_v4().to_string();
    let rx = app.transport.open(&connection, app.config.connection_buffer);
    let group = app
        .lifecycle
        .on_connected(&connection, query.wallet_address.as_deref());

    let hello = Event::default()
        .event("connected")
        .json_data(serde_json::json!({ "connection": connection, "group": group }));

    let guard = ConnectionGuard::new(
        connection,
        query.wallet_address,
        app.lifecycle.clone(),
        app.transport.clone(),
    );
    let events = futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await;
        event.map(|event| (to_sse(&event), (rx, guard)))
    });

    Sse::new(tokio_stream::once(hello).chain(events)).keep_alive(KeepAlive::default())
}
