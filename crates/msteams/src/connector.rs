use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    anyhow::{Context, Result, anyhow, bail},
    async_trait::async_trait,
    quotabot_channels::{ContinueCallback, ConversationChannel, ConversationReference, TurnContext},
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::json,
    tokio::sync::RwLock,
    tracing::{debug, info},
    url::Url,
};

use crate::CHANNEL_ID;

/// Refresh the connector token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: Secret<String>,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Bot Connector client. Cheap to clone; clones share the token cache.
#[derive(Clone)]
pub struct TeamsConnector {
    client: Client,
    app_id: Option<String>,
    app_password: Option<Secret<String>>,
    oauth_endpoint: String,
    oauth_scope: String,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl std::fmt::Debug for TeamsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamsConnector")
            .field("app_id", &self.app_id)
            .field("app_password", &"[REDACTED]")
            .field("oauth_endpoint", &self.oauth_endpoint)
            .finish()
    }
}

impl TeamsConnector {
    pub fn new(
        app_id: Option<String>,
        app_password: Option<Secret<String>>,
        oauth_endpoint: impl Into<String>,
        oauth_scope: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            app_id,
            app_password,
            oauth_endpoint: oauth_endpoint.into(),
            oauth_scope: oauth_scope.into(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.app_id.is_some() && self.app_password.is_some()
    }

    fn credentials(&self) -> Result<(&str, &Secret<String>)> {
        match (self.app_id.as_deref(), self.app_password.as_ref()) {
            (Some(id), Some(password)) => Ok((id, password)),
            _ => Err(anyhow!("Teams app credentials not configured")),
        }
    }

    /// Bearer token for connector calls, fetched with client credentials and
    /// cached until shortly before expiry.
    async fn access_token(&self) -> Result<Secret<String>> {
        if let Some(cached) = self.token.read().await.as_ref()
            && cached.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN
        {
            return Ok(cached.value.clone());
        }

        let (app_id, app_password) = self.credentials()?;
        let response = self
            .client
            .post(&self.oauth_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", app_id),
                ("client_secret", app_password.expose_secret().as_str()),
                ("scope", self.oauth_scope.as_str()),
            ])
            .send()
            .await
            .context("failed to request connector token")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("connector token request failed: {status} - {body}");
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("failed to parse connector token response")?;
        let value = Secret::new(token.access_token);
        *self.token.write().await = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        debug!(expires_in = token.expires_in, "refreshed connector token");
        Ok(value)
    }

    /// `{serviceUrl}/v3/conversations/{id}/activities` for a reference.
    fn activities_url(reference: &ConversationReference) -> Result<Url> {
        let conversation_id = reference.conversation_id();
        if conversation_id.is_empty() {
            bail!("conversation reference has no conversation id");
        }
        let mut url = Url::parse(&reference.service_url)
            .with_context(|| format!("invalid service url {:?}", reference.service_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("unsupported service url scheme {}", url.scheme());
        }
        url.path_segments_mut()
            .map_err(|()| anyhow!("service url cannot be a base"))?
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        Ok(url)
    }

    /// Post a text message into the referenced conversation.
    pub async fn send_text(&self, reference: &ConversationReference, text: &str) -> Result<()> {
        let url = Self::activities_url(reference)?;
        let token = self.access_token().await?;

        let mut activity = json!({
            "type": "message",
            "text": text,
            "textFormat": "markdown",
        });
        if let Some(bot) = reference.bot.as_ref() {
            activity["from"] = json!(bot);
        }
        if let Some(conversation) = reference.conversation.as_ref() {
            activity["conversation"] = json!(conversation);
        }

        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&activity)
            .send()
            .await
            .context("failed to send Teams activity")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Teams activity request failed: {status} - {body}");
        }
        debug!(conversation = reference.conversation_id(), "sent Teams activity");
        Ok(())
    }
}

/// A resumed Teams conversation.
struct ConnectorTurn {
    connector: TeamsConnector,
    reference: ConversationReference,
}

#[async_trait]
impl TurnContext for ConnectorTurn {
    fn reference(&self) -> &ConversationReference {
        &self.reference
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.connector.send_text(&self.reference, text).await
    }
}

#[async_trait]
impl ConversationChannel for TeamsConnector {
    fn id(&self) -> &str {
        CHANNEL_ID
    }

    async fn continue_conversation(
        &self,
        reference: &ConversationReference,
        callback: ContinueCallback,
    ) -> Result<()> {
        self.credentials()?;
        Self::activities_url(reference)?;
        info!(conversation = reference.conversation_id(), "continuing conversation");
        let turn: Arc<dyn TurnContext> = Arc::new(ConnectorTurn {
            connector: self.clone(),
            reference: reference.clone(),
        });
        callback(turn).await
    }
}
