use crate::config::Config;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),
    #[error("PROXY_API_KEY is not configured")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Upstream body is not JSON: {0}")]
    InvalidUpstreamBody(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

impl PromptRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, ProxyError> {
        serde_json::from_slice(body).map_err(ProxyError::InvalidBody)
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    contents: [EnvelopeContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EnvelopeContent<'a> {
    parts: [EnvelopePart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EnvelopePart<'a> {
    text: &'a str,
}

/// Stateless forwarder to the configured generation endpoint.
pub struct ProxyClient {
    client: Client,
    upstream_url: String,
    api_key: Option<String>,
}

impl ProxyClient {
    pub fn new(config: &Config) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .user_agent("BirthMonthMovie-Proxy/1.0")
            .build()?;

        Ok(Self {
            client,
            upstream_url: config.proxy_upstream_url.clone(),
            api_key: config.proxy_api_key.clone(),
        })
    }

    /// Sends the prompt unchanged and returns the upstream body untouched.
    /// The body is checked to be JSON but never re-encoded.
    pub async fn forward(&self, prompt: &str) -> Result<String, ProxyError> {
        let api_key = self.api_key.as_deref().ok_or(ProxyError::MissingApiKey)?;

        let envelope = Envelope {
            contents: [EnvelopeContent {
                parts: [EnvelopePart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.upstream_url)
            .header("x-goog-api-key", api_key)
            .json(&envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProxyError::Upstream { status, body });
        }

        serde_json::from_str::<&RawValue>(&body).map_err(ProxyError::InvalidUpstreamBody)?;
        Ok(body)
    }
}
