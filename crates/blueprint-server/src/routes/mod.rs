pub mod broadcast;
pub mod events;
pub mod notify;
pub mod subscriptions;
