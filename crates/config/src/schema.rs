//! Config schema types (server, teams, purespectrum, events).

use std::path::PathBuf;

use {
    secrecy::Secret,
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuotabotConfig {
    pub server: ServerConfig,
    pub teams: TeamsConfig,
    pub purespectrum: PureSpectrumConfig,
    pub events: EventsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

/// Microsoft Teams bot registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeamsConfig {
    /// Bot Framework application id.
    pub app_id: Option<String>,

    /// Bot Framework application password (client secret).
    pub app_password: Option<Secret<String>>,

    /// Base64 security token of a Teams outgoing webhook. When unset,
    /// webhook signatures are not checked.
    pub webhook_security_token: Option<Secret<String>>,

    /// OAuth token endpoint for bot-to-connector calls.
    pub oauth_endpoint: String,

    pub oauth_scope: String,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_password: None,
            webhook_security_token: None,
            oauth_endpoint: "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token"
                .into(),
            oauth_scope: "https://api.botframework.com/.default".into(),
        }
    }
}

/// PureSpectrum buyer API access.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PureSpectrumConfig {
    pub api_base: String,

    /// Access token. Takes precedence over `auth_file`.
    pub token: Option<Secret<String>>,

    /// JSON file holding a token extracted from a browser session.
    pub auth_file: PathBuf,

    /// Seconds between change-detection polls. `0` disables polling.
    pub poll_interval_secs: u64,

    pub request_timeout_secs: u64,
}

impl Default for PureSpectrumConfig {
    fn default() -> Self {
        Self {
            api_base: "https://spectrumsurveys.com/buyers/v2".into(),
            token: None,
            auth_file: PathBuf::from("purespectrum_auth.json"),
            poll_interval_secs: 0,
            request_timeout_secs: 30,
        }
    }
}

/// Inbound PureSpectrum event webhook.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Shared secret expected in the `x-webhook-token` header.
    pub token: Option<Secret<String>>,
}

impl QuotabotConfig {
    /// Apply well-known environment variables on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a custom lookup. Empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("MICROSOFT_APP_ID") {
            self.teams.app_id = Some(v);
        }
        if let Some(v) = get("MICROSOFT_APP_PASSWORD") {
            self.teams.app_password = Some(Secret::new(v));
        }
        if let Some(v) = get("TEAMS_SECURITY_TOKEN") {
            self.teams.webhook_security_token = Some(Secret::new(v));
        }
        if let Some(v) = get("PURESPECTRUM_TOKEN") {
            self.purespectrum.token = Some(Secret::new(v));
        }
        if let Some(v) = get("PURESPECTRUM_API_BASE") {
            self.purespectrum.api_base = v;
        }
        if let Some(v) = get("QUOTABOT_EVENTS_TOKEN") {
            self.events.token = Some(Secret::new(v));
        }
        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Whether proactive messaging credentials are present.
    pub fn teams_configured(&self) -> bool {
        self.teams.app_id.is_some() && self.teams.app_password.is_some()
    }
}
