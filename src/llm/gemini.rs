//! Google Gemini classifier client.

use super::{Classifier, UNCLASSIFIED, parse_classification};
use crate::http::{HttpConfig, build_http_client};
use crate::models::{ClassificationRequest, ClassificationResult};
use crate::retry::RetryPolicy;
use crate::{Error, Result};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Gemini generative-language API client.
pub struct GeminiClient {
    /// API key.
    api_key: SecretString,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
    /// Retry budget for transient failures.
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash-lite";

    /// Creates a new Gemini client.
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(HttpConfig::from_env()),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: HttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Sets the retry budget for transient failures.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Makes a JSON-mode generation request and returns the response text.
    fn generate(&self, prompt: &str) -> Result<String> {
        let operation = "gemini_generate";
        tracing::info!(provider = "gemini", model = %self.model, "making classification request");

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint, self.model
        );

        self.retry.run(operation, || {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", self.api_key.expose_secret())
                .json(&request)
                .send()
                .map_err(|e| Error::RemoteUnavailable {
                    operation: operation.to_string(),
                    cause: e.to_string(),
                })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok());
                return Err(Error::RateLimited {
                    operation: operation.to_string(),
                    retry_after_secs: retry_after,
                });
            }
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                tracing::error!(provider = "gemini", %status, body = %body, "LLM API returned error status");
                return Err(Error::RemoteUnavailable {
                    operation: operation.to_string(),
                    cause: format!("status {status}: {body}"),
                });
            }

            let response: GenerateResponse =
                response.json().map_err(|e| Error::RemoteUnavailable {
                    operation: operation.to_string(),
                    cause: format!("response decode: {e}"),
                })?;
            response
                .candidates
                .into_iter()
                .next()
                .map(|c| {
                    c.content
                        .parts
                        .into_iter()
                        .map(|p| p.text)
                        .collect::<String>()
                })
                .ok_or_else(|| Error::RemoteUnavailable {
                    operation: operation.to_string(),
                    cause: "no candidates in response".to_string(),
                })
        })
    }
}

/// Builds the per-item classification prompt.
///
/// The prompt carries a condensed item digest (title and note keywords),
/// the taxonomy, and any profile context, never the full note.
fn build_prompt(request: &ClassificationRequest<'_>) -> String {
    let mut prompt = String::from(
        "ROLE: You are an expert research assistant organizing a reference library.\n\n",
    );

    if let Some(context) = request.profile.and_then(crate::models::UserProfile::prompt_context) {
        prompt.push_str("USER PROFILE:\n");
        prompt.push_str(&context);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "TASK: Classify the paper below into TWO distinct tracks:\n\
         1. archive_path (Track A): the standard disciplinary folder.\n\
         2. idea_path (Track B): the scientific-question or mechanism folder.\n\n",
    );
    prompt.push_str(
        "AVAILABLE TAXONOMY (adhere to these paths, or propose a logical new leaf under an existing category):\n",
    );
    prompt.push_str(&request.taxonomy.prompt_json());
    prompt.push_str("\n\nPAPER:\n");
    prompt.push_str(&format!(
        "Title: {}\nKeywords: {}\n\n",
        truncate(request.title, 120),
        truncate(request.keywords, 300),
    ));
    prompt.push_str(&format!(
        "OUTPUT (strictly JSON): {{\"archive_path\": \"...\", \"idea_path\": \"...\"}}\n\
         Use \"{UNCLASSIFIED}\" for any track you cannot place.\n",
    ));
    prompt
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

impl Classifier for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn classify(&self, request: &ClassificationRequest<'_>) -> Result<ClassificationResult> {
        let prompt = build_prompt(request);
        let response = self.generate(&prompt)?;
        parse_classification(&response, request.taxonomy)
    }
}

/// Request to the generateContent API.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Response from the generateContent API.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
