use crate::config::Config;
use crate::query_key::QueryKey;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Alternatives beyond this count are dropped when a result is parsed.
pub const MAX_ALTERNATIVES: usize = 2;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Response contained no text")]
    EmptyResponse,
    #[error("Malformed movie result: {0}")]
    MalformedResult(String),
}

impl AiError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AiError::MissingApiKey => "missing_api_key",
            AiError::RequestFailed(_) => "network",
            AiError::ApiError(_) => "upstream",
            AiError::RateLimited => "rate_limited",
            AiError::EmptyResponse => "empty_response",
            AiError::MalformedResult(_) => "parse",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieResult {
    #[serde(rename = "movieTitle")]
    pub title: String,
    pub description: String,
    #[serde(rename = "alternativeMovies")]
    pub alternatives: Vec<String>,
}

impl MovieResult {
    pub fn parse(text: &str) -> Result<Self, AiError> {
        let mut movie: MovieResult = serde_json::from_str(text.trim())
            .map_err(|e| AiError::MalformedResult(e.to_string()))?;

        if movie.title.trim().is_empty() {
            return Err(AiError::MalformedResult("movieTitle is blank".to_string()));
        }
        if movie.alternatives.len() > MAX_ALTERNATIVES {
            tracing::debug!(
                count = movie.alternatives.len(),
                "Truncating alternative movies"
            );
            movie.alternatives.truncate(MAX_ALTERNATIVES);
        }

        Ok(movie)
    }
}

/// Source of movie answers for a birth month.
#[async_trait]
pub trait MovieOracle: Send + Sync {
    async fn find_movie(&self, key: &QueryKey) -> Result<MovieResult, AiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn movie_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "movieTitle": { "type": "STRING" },
            "description": { "type": "STRING" },
            "alternativeMovies": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "minItems": 1,
                "maxItems": MAX_ALTERNATIVES
            }
        },
        "required": ["movieTitle", "description", "alternativeMovies"]
    })
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, AiError> {
        let client = Client::builder()
            .user_agent("BirthMonthMovie/1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
        })
    }

    fn build_movie_prompt(&self, key: &QueryKey) -> String {
        format!(
            "¿Cuál es la película más culturalmente significativa estrenada en {} de {}? \
             Responde con su título, una breve descripción de por qué es relevante \
             y una o dos películas alternativas estrenadas ese mismo mes.",
            key.month_name(),
            key.year()
        )
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingApiKey)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: movie_schema(),
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Sending request to Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let body: GenerateContentResponse = response.json().await?;
                body.candidates
                    .into_iter()
                    .filter_map(|candidate| candidate.content)
                    .flat_map(|content| content.parts)
                    .find_map(|part| part.text)
                    .filter(|text| !text.trim().is_empty())
                    .ok_or(AiError::EmptyResponse)
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(AiError::RateLimited),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(AiError::ApiError(format!("HTTP {}: {}", status, error_text)))
            }
        }
    }
}

#[async_trait]
impl MovieOracle for GeminiClient {
    async fn find_movie(&self, key: &QueryKey) -> Result<MovieResult, AiError> {
        let prompt = self.build_movie_prompt(key);
        let text = self.generate_content(&prompt).await?;
        MovieResult::parse(&text)
    }
}
