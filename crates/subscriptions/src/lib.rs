//! Survey subscriptions and proactive fan-out.
//!
//! [`SubscriptionStore`] maps surveys to the conversations that asked for
//! updates. [`Broadcaster`] resolves a survey's subscribers and pushes a
//! message into each of them through a [`quotabot_channels::ConversationChannel`].
//!
//! State is in-memory only and is lost on restart.

pub mod broadcast;
pub mod key;
pub mod store;

pub use {
    broadcast::{BroadcastReport, Broadcaster},
    key::ConversationKey,
    store::SubscriptionStore,
};
