//! Group-scoped real-time notification layer.
//!
//! Connections join groups through [`ConnectionLifecycle`]; business logic
//! pushes events through the [`HubContext`] capability, implemented by
//! [`NotificationFanout`]; [`CommitHook`] turns a committed transaction into
//! one resolved action per participant.

pub mod commit;
pub mod fanout;
pub mod lifecycle;
pub mod registry;
pub mod transport;

pub use commit::{CommitHook, CommitReport, CommittedTransaction};
pub use fanout::{FanoutReport, HubContext, NotificationFanout};
pub use lifecycle::ConnectionLifecycle;
pub use registry::{ConnectionGroupRegistry, GroupRegistry};
pub use transport::{DeliveryError, NotificationEvent, Transport};
