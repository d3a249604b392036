//! Channel contract.
//!
//! A channel (Teams today) hands the core an opaque [`ConversationReference`]
//! for every inbound message and offers a way to re-enter that conversation
//! later, after the triggering request has completed. The subscription core
//! only depends on this crate, never on a concrete channel.

pub mod plugin;
pub mod reference;

pub use {
    plugin::{ContinueCallback, ConversationChannel, TurnContext},
    reference::{ChannelAccount, ConversationAccount, ConversationReference},
};
