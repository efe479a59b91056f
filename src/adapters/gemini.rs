use crate::domain::ports::LlmClient;
use crate::utils::error::DiscoveryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct GeminiOptions {
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for GeminiOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            temperature: None,
            max_output_tokens: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
    options: GeminiOptions,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, options: GeminiOptions) -> Result<Self, DiscoveryError> {
        let http = reqwest::Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            http,
            options,
        })
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.options.base_url.trim_end_matches('/'),
            self.options.model
        )
    }

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.options.temperature,
            max_output_tokens: self.options.max_output_tokens,
            ..GenerationConfig::default()
        }
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, DiscoveryError> {
        let start = Instant::now();

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DiscoveryError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(DiscoveryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| DiscoveryError::malformed("GenerateContentResponse", e.to_string()))?;
        let text = parsed.into_text()?;

        tracing::debug!(
            model = %self.options.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            output_len = text.len(),
            "Gemini response"
        );
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate_text(&self, prompt: &str, grounding: bool) -> Result<String, DiscoveryError> {
        tracing::debug!(grounding, prompt_len = prompt.len(), "Gemini text request");

        let mut tools = Vec::new();
        if grounding {
            tools.push(Tool {
                google_search: GoogleSearch {},
            });
        }

        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            tools,
            generation_config: self.generation_config(),
        };
        self.generate(&request).await
    }

    async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<String, DiscoveryError> {
        tracing::debug!(prompt_len = prompt.len(), "Gemini schema request");

        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            tools: Vec::new(),
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_json_schema: Some(schema),
                ..self.generation_config()
            },
        };
        self.generate(&request).await
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, DiscoveryError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(DiscoveryError::EmptyResponse {
                reason: format!("prompt blocked ({})", reason),
            });
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| DiscoveryError::EmptyResponse {
                reason: "no candidates".to_string(),
            })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(DiscoveryError::EmptyResponse {
                reason: format!(
                    "empty text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(
            "test-key",
            GeminiOptions {
                model: "gemini-test".to_string(),
                base_url: server.base_url(),
                temperature: Some(0.2),
                ..GeminiOptions::default()
            },
        )
        .unwrap()
    }

    fn text_response(parts: &[&str]) -> serde_json::Value {
        let parts: Vec<_> = parts.iter().map(|t| serde_json::json!({ "text": t })).collect();
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": parts },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_grounded_text_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .header("x-goog-api-key", "test-key")
                .body_contains("\"googleSearch\":{}")
                .body_contains("\"temperature\":0.2");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(text_response(&["Web Summit ", "is in Lisbon."]));
        });

        let text = client(&server)
            .generate_text("Find summits", true)
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(text, "Web Summit is in Lisbon.");
    }

    #[tokio::test]
    async fn test_schema_request_sets_mime_type() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .body_contains("\"responseMimeType\":\"application/json\"")
                .body_contains("\"responseJsonSchema\"");
            then.status(200)
                .json_body(text_response(&["{\"summits\":[]}"]));
        });

        let schema = serde_json::json!({ "type": "object" });
        let text = client(&server)
            .generate_json("Structure this", schema)
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(text, "{\"summits\":[]}");
    }

    #[tokio::test]
    async fn test_unauthorized_is_transport_level() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(401).body("API key not valid");
        });

        let err = client(&server).generate_text("x", false).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Unauthorized { status: 401 }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_server_error_keeps_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(500).body("internal");
        });

        let err = client(&server).generate_text("x", false).await.unwrap_err();
        match err {
            DiscoveryError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(serde_json::json!({ "candidates": [] }));
        });

        let err = client(&server).generate_text("x", false).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptyResponse { .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            }));
        });

        let err = client(&server).generate_text("x", false).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).body("<html>gateway</html>");
        });

        let err = client(&server).generate_text("x", false).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Malformed { .. }));
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let request = GenerateContentRequest {
            contents: vec![Content::user("hi")],
            tools: Vec::new(),
            generation_config: GenerationConfig::default(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
                "generationConfig": {}
            })
        );
    }
}
