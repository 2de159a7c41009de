pub mod blueprint;
pub mod condition;
pub mod config;
pub mod disclosure;
pub mod error;
pub mod ledger;
pub mod resolver;
pub mod types;

pub use blueprint::{Action, ActionTemplate, Blueprint, DataSchema, DisclosureScope, Participant};
pub use condition::Condition;
pub use disclosure::DisclosurePolicy;
pub use error::{BlueprintError, ErrorKind, Result};
pub use resolver::ActionResolver;
pub use types::{TrackingData, TrackingValue, Viewer, Visibility};
