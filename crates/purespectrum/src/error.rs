/// Failures talking to the PureSpectrum API.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("PureSpectrum access token not configured")]
    NotConfigured,

    #[error("authentication failed, the access token is expired or invalid")]
    Unauthorized,

    #[error("survey {0} not found")]
    NotFound(String),

    #[error("PureSpectrum request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to PureSpectrum failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected PureSpectrum response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<url::ParseError> for ProviderError {
    fn from(e: url::ParseError) -> Self {
        Self::Decode(format!("invalid API base url: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
