use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::{Client, StatusCode, Url, header},
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    error::{ProviderError, Result},
    types::{Quota, Survey},
};

/// Buyer API base URL.
pub const DEFAULT_API_BASE: &str = "https://spectrumsurveys.com/buyers/v2";

const ORIGIN: &str = "https://platform.purespectrum.com";

/// Source of survey and quota data.
#[async_trait]
pub trait SurveyProvider: Send + Sync {
    /// Verify the credentials are accepted.
    async fn check_auth(&self) -> Result<()>;

    /// A single survey, `None` if the API does not know it.
    async fn fetch_survey(&self, survey_id: &str) -> Result<Option<Survey>>;

    async fn fetch_quotas(&self, survey_id: &str) -> Result<Vec<Quota>>;

    /// First page (up to 100) of the account's surveys.
    async fn list_surveys(&self) -> Result<Vec<Survey>>;
}

/// reqwest-backed PureSpectrum client authenticated by access token.
#[derive(Clone)]
pub struct PureSpectrumClient {
    client: Client,
    base_url: Url,
    token: Option<Secret<String>>,
}

impl std::fmt::Debug for PureSpectrumClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PureSpectrumClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PureSpectrumClient {
    pub fn new(base_url: &str, token: Option<Secret<String>>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            token,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// `base_url` with `segments` appended as escaped path segments.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::Decode("API base url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        let token = self.token.as_ref().ok_or(ProviderError::NotConfigured)?;
        debug!(url = %url, "PureSpectrum request");
        let response = self
            .client
            .get(url)
            .header("access-token", token.expose_secret())
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .header(header::ORIGIN, ORIGIN)
            .header(header::REFERER, format!("{ORIGIN}/"))
            .send()
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = %response.status(), "PureSpectrum rejected the access token");
                Err(ProviderError::Unauthorized)
            },
            _ => Ok(response),
        }
    }

    async fn error_for(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ProviderError::Status {
            status,
            body: body.chars().take(500).collect(),
        }
    }

    fn is_json(response: &reqwest::Response) -> bool {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"))
    }
}

#[async_trait]
impl SurveyProvider for PureSpectrumClient {
    async fn check_auth(&self) -> Result<()> {
        let url = self.endpoint(&["surveys"], &[("limit", "1")])?;
        let response = self.get(url).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        // An expired session answers 200 with the HTML login page.
        if !Self::is_json(&response) {
            warn!("PureSpectrum answered with HTML instead of JSON");
            return Err(ProviderError::Unauthorized);
        }
        info!("PureSpectrum access token valid");
        Ok(())
    }

    async fn fetch_survey(&self, survey_id: &str) -> Result<Option<Survey>> {
        let url = self.endpoint(&["surveys", survey_id], &[])?;
        let response = self.get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let value = match response.json::<Value>().await? {
            Value::Array(items) => match items.into_iter().next() {
                Some(item) => item,
                None => return Ok(None),
            },
            Value::Null => return Ok(None),
            other => other,
        };
        Ok(Some(Survey::from_value(value)?))
    }

    async fn fetch_quotas(&self, survey_id: &str) -> Result<Vec<Quota>> {
        let url = self.endpoint(&["surveys", survey_id, "quotas"], &[
            ("UI", "1"),
            ("QBS", "1"),
            ("page", "1"),
            ("limit", "100"),
        ])?;
        let response = self.get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(survey_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let quotas: Vec<Quota> = match response.json::<Value>().await? {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .filter_map(|(index, item)| match serde_json::from_value(item) {
                    Ok(quota) => Some(quota),
                    Err(e) => {
                        warn!(survey_id, index, error = %e, "skipping unreadable quota");
                        None
                    },
                })
                .collect(),
            _ => Vec::new(),
        };
        debug!(survey_id, count = quotas.len(), "fetched quotas");
        Ok(quotas)
    }

    async fn list_surveys(&self) -> Result<Vec<Survey>> {
        let url = self.endpoint(&["surveys"], &[("UI", "1"), ("page", "1"), ("limit", "100")])?;
        let response = self.get(url).await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let surveys: Vec<Survey> = match response.json::<Value>().await? {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .filter_map(|(index, item)| match Survey::from_value(item) {
                    Ok(survey) => Some(survey),
                    Err(e) => {
                        warn!(index, error = %e, "skipping unreadable survey");
                        None
                    },
                })
                .collect(),
            _ => Vec::new(),
        };
        debug!(count = surveys.len(), "listed surveys");
        Ok(surveys)
    }
}
