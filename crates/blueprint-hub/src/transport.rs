use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// NotificationEvent
// ---------------------------------------------------------------------------

/// A fire-and-forget value pushed to live connections. The payload is
/// already disclosure-filtered; nothing below this point inspects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub method: String,
    pub payload: serde_json::Value,
    /// Target group, or `None` for a platform-wide broadcast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl NotificationEvent {
    pub fn to_group(
        group: impl Into<String>,
        method: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            method: method.into(),
            payload,
            group: Some(group.into()),
        }
    }

    pub fn broadcast(method: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            payload,
            group: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeliveryError {
    #[error("connection {0} is closed")]
    Closed(String),

    #[error("delivery timed out after {0}ms")]
    TimedOut(u64),

    #[error("transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Per-connection send capability provided by the real-time transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, connection: &str, event: &NotificationEvent) -> Result<(), DeliveryError>;
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
