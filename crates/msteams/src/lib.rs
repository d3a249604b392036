//! Microsoft Teams channel.
//!
//! Parses Bot Framework activities, verifies outgoing-webhook signatures, and
//! talks to the Bot Connector API to post messages into conversations,
//! including proactive ones.

pub mod activity;
pub mod connector;
pub mod webhook;

pub use {
    activity::{Activity, TeamsChannelData, strip_mentions},
    connector::TeamsConnector,
    webhook::{constant_time_eq, verify_webhook_signature},
};

/// Channel id Teams stamps on its activities.
pub const CHANNEL_ID: &str = "msteams";
