use std::{sync::Arc, time::Duration};

use {
    quotabot_channels::ConversationChannel,
    quotabot_config::QuotabotConfig,
    quotabot_msteams::TeamsConnector,
    quotabot_purespectrum::{PureSpectrumClient, SurveyProvider, TokenStore},
    quotabot_subscriptions::{Broadcaster, SubscriptionStore},
    secrecy::Secret,
    tracing::{info, warn},
};

use crate::bot::SurveyBot;

// ── Gateway state ────────────────────────────────────────────────────────────

/// Everything the HTTP handlers and background tasks share.
pub struct GatewayState {
    pub store: Arc<SubscriptionStore>,
    pub broadcaster: Broadcaster,
    pub bot: SurveyBot,
    pub provider: Arc<dyn SurveyProvider>,
    pub channel: Arc<dyn ConversationChannel>,
    /// Teams outgoing-webhook security token.
    pub webhook_token: Option<Secret<String>>,
    /// Shared token expected in `x-webhook-token` on PureSpectrum events.
    pub events_token: Option<Secret<String>>,
    pub version: String,
}

impl GatewayState {
    pub fn new(
        provider: Arc<dyn SurveyProvider>,
        channel: Arc<dyn ConversationChannel>,
        webhook_token: Option<Secret<String>>,
        events_token: Option<Secret<String>>,
    ) -> Arc<Self> {
        let store = Arc::new(SubscriptionStore::new());
        let broadcaster = Broadcaster::new(Arc::clone(&store), Arc::clone(&channel));
        let bot = SurveyBot::new(broadcaster.clone(), Arc::clone(&provider));
        Arc::new(Self {
            store,
            broadcaster,
            bot,
            provider,
            channel,
            webhook_token,
            events_token,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Wire the PureSpectrum client and the Teams connector from config.
    ///
    /// A token in config or the environment wins over the auth file.
    pub fn from_config(config: &QuotabotConfig) -> anyhow::Result<Arc<Self>> {
        let ps = &config.purespectrum;
        let token = ps
            .token
            .clone()
            .or_else(|| TokenStore::with_path(ps.auth_file.clone()).token());
        if token.is_none() {
            warn!(
                auth_file = %ps.auth_file.display(),
                "no PureSpectrum token configured, survey commands will fail"
            );
        }
        let provider = PureSpectrumClient::new(
            &ps.api_base,
            token,
            Duration::from_secs(ps.request_timeout_secs),
        )?;

        let teams = &config.teams;
        let connector = TeamsConnector::new(
            teams.app_id.clone(),
            teams.app_password.clone(),
            teams.oauth_endpoint.clone(),
            teams.oauth_scope.clone(),
        );
        if !connector.is_configured() {
            warn!("Teams app credentials not set, replies to Teams conversations will fail");
        }

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(connector),
            teams.webhook_security_token.clone(),
            config.events.token.clone(),
        ))
    }
}
