use crate::sse::SseTransport;
use blueprint_core::config::HubConfig;
use blueprint_core::ledger::MemoryLedger;
use blueprint_core::ActionResolver;
use blueprint_hub::{CommitHook, ConnectionGroupRegistry, ConnectionLifecycle, NotificationFanout};
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HubConfig>,
    pub ledger: Arc<MemoryLedger>,
    pub registry: Arc<ConnectionGroupRegistry>,
    pub transport: Arc<SseTransport>,
    pub lifecycle: Arc<ConnectionLifecycle>,
    pub fanout: Arc<NotificationFanout>,
    pub hook: Arc<CommitHook>,
}

impl AppState {
    /// Wire the hub together around `ledger`.
    pub fn new(config: HubConfig, ledger: Arc<MemoryLedger>) -> Self {
        let registry = Arc::new(ConnectionGroupRegistry::new());
        let transport = Arc::new(SseTransport::new());
        let lifecycle = Arc::new(
            ConnectionLifecycle::new(registry.clone()).with_default_group(&config.default_group),
        );
        let fanout = Arc::new(
            NotificationFanout::new(registry.clone(), transport.clone())
                .with_delivery_timeout(config.delivery_timeout()),
        );
        let hook = Arc::new(
            CommitHook::new(
                ledger.clone(),
                ActionResolver::new(ledger.clone()),
                fanout.clone(),
            )
            .with_method(&config.receive_action_method),
        );

        Self {
            config: Arc::new(config),
            ledger,
            registry,
            transport,
            lifecycle,
            fanout,
            hook,
        }
    }
}
