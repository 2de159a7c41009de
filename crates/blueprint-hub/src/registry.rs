use dashmap::{DashMap, DashSet};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// GroupRegistry
// ---------------------------------------------------------------------------

/// Membership of live connections in named groups.
///
/// A group exists exactly while it has at least one member. Liveness is
/// tracked apart from membership: a connection stays live after leaving
/// every group, until it disconnects. Every operation is safe to call
/// concurrently; none of them fails.
pub trait GroupRegistry: Send + Sync {
    /// Mark `connection` live.
    fn connect(&self, connection: &str);

    /// Drop `connection` from the live set and from every group it belongs
    /// to. Returns the groups it left.
    fn disconnect(&self, connection: &str) -> Vec<String>;

    /// Add `connection` to `group`, creating the group if needed.
    fn join(&self, group: &str, connection: &str);

    /// Remove `connection` from `group`. Unknown groups and non-members
    /// are a no-op; a group left empty is removed.
    fn leave(&self, group: &str, connection: &str);

    /// Remove `connection` from every group it belongs to and return the
    /// groups it left.
    fn leave_all(&self, connection: &str) -> Vec<String>;

    /// Snapshot of the current members of `group`. Unknown groups are empty.
    fn members_of(&self, group: &str) -> BTreeSet<String>;

    /// Every live connection, whether or not it belongs to any group.
    fn connections(&self) -> BTreeSet<String>;
}

// ---------------------------------------------------------------------------
// ConnectionGroupRegistry
// ---------------------------------------------------------------------------

/// In-process registry. Membership lives in a sharded map so mutations on
/// different groups do not contend; each group's set is mutated under its
/// shard lock, which makes join/leave on the same group linearizable.
#[derive(Debug, Default)]
pub struct ConnectionGroupRegistry {
    groups: DashMap<String, BTreeSet<String>>,
    live: DashSet<String>,
}

impl ConnectionGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_member(&self, group: &str, connection: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|members| members.contains(connection))
    }

    pub fn is_live(&self, connection: &str) -> bool {
        self.live.contains(connection)
    }
}

impl GroupRegistry for ConnectionGroupRegistry {
    fn connect(&self, connection: &str) {
        self.live.insert(connection.to_string());
    }

    fn disconnect(&self, connection: &str) -> Vec<String> {
        self.live.remove(connection);
        self.leave_all(connection)
    }

    fn join(&self, group: &str, connection: &str) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(connection.to_string());
    }

    fn leave(&self, group: &str, connection: &str) {
        self.groups.remove_if_mut(group, |_, members| {
            members.remove(connection);
            members.is_empty()
        });
    }

    fn leave_all(&self, connection: &str) -> Vec<String> {
        let mut left = Vec::new();
        self.groups.retain(|group, members| {
            if members.remove(connection) {
                left.push(group.clone());
            }
            !members.is_empty()
        });
        left.sort();
        left
    }

    fn members_of(&self, group: &str) -> BTreeSet<String> {
        self.groups
            .get(group)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    fn connections(&self) -> BTreeSet<String> {
        self.live.iter().map(|c| c.key().clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
