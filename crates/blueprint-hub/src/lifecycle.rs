use crate::registry::GroupRegistry;
use std::sync::Arc;

pub const DEFAULT_GROUP: &str = "actionClients";

/// Maps transport connect/disconnect events onto group membership.
///
/// A connection presenting an identity (a wallet address) joins the group
/// keyed by it; anonymous connections join the default group.
pub struct ConnectionLifecycle {
    registry: Arc<dyn GroupRegistry>,
    default_group: String,
}

impl ConnectionLifecycle {
    pub fn new(registry: Arc<dyn GroupRegistry>) -> Self {
        Self {
            registry,
            default_group: DEFAULT_GROUP.to_string(),
        }
    }

    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = group.into();
        self
    }

    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    /// Group a connection with this identity belongs to.
    pub fn group_for(&self, identity: Option<&str>) -> String {
        identity
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(self.default_group.as_str())
            .to_string()
    }

    /// Returns the group joined.
    pub fn on_connected(&self, connection: &str, identity: Option<&str>) -> String {
        let group = self.group_for(identity);
        self.registry.connect(connection);
        self.registry.join(&group, connection);
        tracing::info!(connection, group = %group, "connection joined");
        group
    }

    /// Ends the connection's liveness and drops it from its identity group
    /// and any explicit subscriptions. Returns every group left.
    pub fn on_disconnected(&self, connection: &str, identity: Option<&str>) -> Vec<String> {
        let left = self.registry.disconnect(connection);
        tracing::info!(
            connection,
            identity_group = %self.group_for(identity),
            groups = ?left,
            "connection left"
        );
        left
    }

    pub fn subscribe(&self, connection: &str, group: &str) {
        self.registry.join(group, connection);
        tracing::debug!(connection, group, "subscribed");
    }

    pub fn unsubscribe(&self, connection: &str, group: &str) {
        self.registry.leave(group, connection);
        tracing::debug!(connection, group, "unsubscribed");
    }
}
