//! Idea generation: the language-model call behind each plan.
//!
//! Provides an `IdeaGenerator` trait and a Gemini implementation that calls
//! the `generateContent` REST endpoint. There is no retry: a failed call
//! fails the whole request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationSettings;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The key travels as a header so it never appears in a request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

// ============================================================================
// IdeaGenerator trait
// ============================================================================

/// Abstraction over text-generation providers.
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    /// Send `prompt` and return the generated text as one block.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,
}

/// reqwest errors print the request URL; drop it before the error reaches users.
fn transport_error(e: reqwest::Error) -> GenerationError {
    GenerationError::Http(e.without_url())
}

// ============================================================================
// Config
// ============================================================================

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Resolve from settings; the key falls back to `GEMINI_API_KEY`, then
    /// `GOOGLE_API_KEY`.
    pub fn from_settings(settings: &GenerationSettings) -> Self {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("api_key", &"[redacted]")
            .finish()
    }
}

/// Build the generator configured in `settings`.
pub fn create_generator(
    settings: &GenerationSettings,
) -> Result<Arc<dyn IdeaGenerator>, GenerationError> {
    let client = GeminiGenerationClient::new(GeminiConfig::from_settings(settings))?;
    Ok(Arc::new(client))
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiGenerationClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeminiGenerationClient {
    client: Client,
    config: GeminiConfig,
    base_url: String,
}

impl GeminiGenerationClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        Self::with_base_url(config, GEMINI_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / proxies)
    pub fn with_base_url(config: GeminiConfig, base_url: String) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl IdeaGenerator for GeminiGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.config.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::error!(code = code, message = %message, "Gemini API error");

            return Err(GenerationError::Api { code, message });
        }

        let body: GenerateResponse = response.json().await.map_err(transport_error)?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.to_string(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.9,
            timeout: Duration::from_secs(5),
        }
    }

    fn mock_reply(parts: &[&str]) -> serde_json::Value {
        let parts: Vec<serde_json::Value> = parts
            .iter()
            .map(|t| serde_json::json!({ "text": t }))
            .collect();
        serde_json::json!({
            "candidates": [
                { "content": { "role": "model", "parts": parts }, "finishReason": "STOP" }
            ]
        })
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_and_returns_text() {
        let mock_server = MockServer::start().await;
        let client = GeminiGenerationClient::with_base_url(test_config("test-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "generationConfig": { "temperature": 0.9 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_reply(&["1. Idea: x"])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let text = client.generate("hello").await.unwrap();
        assert_eq!(text, "1. Idea: x");
    }

    #[tokio::test]
    async fn test_generate_concatenates_parts() {
        let mock_server = MockServer::start().await;
        let client = GeminiGenerationClient::with_base_url(test_config("k"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_reply(&["Idea: a\n", "Caption: b"])),
            )
            .mount(&mock_server)
            .await;

        assert_eq!(client.generate("p").await.unwrap(), "Idea: a\nCaption: b");
    }

    #[tokio::test]
    async fn test_generate_maps_api_error_body() {
        let mock_server = MockServer::start().await;
        let client = GeminiGenerationClient::with_base_url(test_config("bad"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "API key not valid" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.generate("p").await {
            Err(GenerationError::Api { code, message }) => {
                assert_eq!(code, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_does_not_retry_on_500() {
        let mock_server = MockServer::start().await;
        let client = GeminiGenerationClient::with_base_url(test_config("k"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.generate("p").await {
            Err(GenerationError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_empty_candidates_is_error() {
        let mock_server = MockServer::start().await;
        let client = GeminiGenerationClient::with_base_url(test_config("k"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [],
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&mock_server)
            .await;

        assert!(matches!(
            client.generate("p").await,
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_http_error() {
        // Nothing listens on port 9 on a test host.
        let client =
            GeminiGenerationClient::with_base_url(test_config("k"), "http://127.0.0.1:9".to_string())
                .unwrap();
        assert!(matches!(
            client.generate("p").await,
            Err(GenerationError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_api_key() {
        let client = GeminiGenerationClient::with_base_url(
            test_config("SUPERSECRETKEY"),
            "http://127.0.0.1:9".to_string(),
        )
        .unwrap();
        let err = client.generate("p").await.unwrap_err();

        let shown = format!("Could not generate ideas: {}", err);
        assert!(!shown.contains("SUPERSECRETKEY"), "key leaked: {}", shown);
        assert!(!format!("{:?}", err).contains("SUPERSECRETKEY"));
    }

    #[tokio::test]
    async fn test_request_url_carries_no_key() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiGenerationClient::with_base_url(test_config("hidden-key"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_reply(&["Idea: a"])))
            .mount(&mock_server)
            .await;

        client.generate("p").await.unwrap();
        let received = mock_server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(received[0].url.query().is_none());
        assert!(!received[0].url.as_str().contains("hidden-key"));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        match GeminiGenerationClient::new(test_config("  ")) {
            Err(GenerationError::MissingApiKey) => {}
            other => panic!("Expected MissingApiKey, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let debug = format!("{:?}", test_config("very-secret"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_from_settings_prefers_explicit_key() {
        let settings = GenerationSettings {
            api_key: Some("from-file".to_string()),
            ..GenerationSettings::default()
        };
        let config = GeminiConfig::from_settings(&settings);
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }
}
