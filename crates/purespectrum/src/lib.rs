//! PureSpectrum buyer API: survey and quota data for the bot.
//!
//! The API has no usable login flow for bots, so the client authenticates
//! with an access token lifted from a browser session (see
//! [`storage::TokenStore`]) or supplied through configuration.

pub mod changes;
pub mod client;
pub mod error;
pub mod storage;
pub mod types;

pub use {
    changes::ChangeDetector,
    client::{PureSpectrumClient, SurveyProvider},
    error::{ProviderError, Result},
    storage::{StoredAuth, TokenStore},
    types::{Criterion, Quota, Survey, SurveyEvent, status_label},
};
