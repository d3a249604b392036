//! Gateway: HTTP server, chat command handling, and survey polling.
//!
//! Lifecycle:
//! 1. Load config and build the PureSpectrum client and Teams connector
//! 2. Check PureSpectrum credentials
//! 3. Start the survey poller (if an interval is configured)
//! 4. Serve the Bot Framework, outgoing-webhook, and survey-event endpoints
//!
//! Subscription bookkeeping and fan-out live in `quotabot-subscriptions`;
//! this crate only wires them to the outside world.

pub mod bot;
pub mod format;
pub mod poller;
pub mod server;
pub mod state;

#[cfg(test)]
mod testing;

pub use {
    bot::{Command, SurveyBot},
    server::{build_gateway_app, start_gateway},
    state::GatewayState,
};
