use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::errors::{GeminiError, GeminiResult};
use crate::types::*;

/// Anything that can turn a prompt into raw model text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text from a single-turn prompt
    async fn generate(&self, prompt: &str, config: GenerationConfig) -> GeminiResult<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: &GeminiConfig, client: Client) -> GeminiResult<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            GeminiError::ConfigError(
                "API key is required to initialize the Gemini client".to_string(),
            )
        })?;

        Ok(Self {
            client,
            api_key,
            model_name: config.model_name().to_string(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
        })
    }

    /// Get the generateContent URL for the configured model
    fn get_generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model_name
        )
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> GeminiResult<GenerateContentResponse> {
        let response = self
            .client
            .post(self.get_generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GeminiError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Gemini API responded");

        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                GeminiError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(GeminiError::HttpError {
                status_code: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::ParsingError(format!("Failed to parse response: {}", e)))
    }

    /// Helper method to extract text from a response
    pub fn extract_text_from_response(response: &GenerateContentResponse) -> GeminiResult<String> {
        let candidate = response.candidates.first();

        let text = candidate
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.as_deref())
            .filter(|text| !text.trim().is_empty());

        if let Some(text) = text {
            if let Some(reason) = candidate.and_then(|c| c.finish_reason.as_deref()) {
                if reason != "STOP" {
                    warn!(finish_reason = reason, "Gemini generation finished early");
                }
            }
            return Ok(text.to_string());
        }

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(GeminiError::ResponseError(format!(
                "Prompt blocked by provider: {}",
                reason
            )));
        }

        if let Some(reason) = candidate.and_then(|c| c.finish_reason.as_deref()) {
            if reason == "SAFETY" {
                return Err(GeminiError::ResponseError(
                    "Response blocked by provider: SAFETY".to_string(),
                ));
            }
        }

        Err(GeminiError::ResponseError(
            "No response text received from Gemini API".to_string(),
        ))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, config: GenerationConfig) -> GeminiResult<String> {
        debug!(
            model = %self.model_name,
            prompt_len = prompt.len(),
            "Generating text with Gemini"
        );
        let request = GenerateContentRequest::single_turn(prompt, config);
        let response = self.generate_content(&request).await?;
        Self::extract_text_from_response(&response)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::time::Duration;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr) -> GeminiClient {
        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some(format!("http://{addr}/v1beta")),
            ..Default::default()
        };
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        GeminiClient::new(&config, http).unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = GeminiClient::new(&GeminiConfig::default(), Client::new());
        assert!(matches!(result, Err(GeminiError::ConfigError(_))));
    }

    #[test]
    fn test_request_uses_camel_case_generation_config() {
        let request = GenerateContentRequest::single_turn("hi", GenerationConfig::answer());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(value["generationConfig"]["topK"], 40);
        assert!(value["generationConfig"].get("max_output_tokens").is_none());
    }

    #[test]
    fn test_extract_text_reports_safety_block() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();

        let err = GeminiClient::extract_text_from_response(&response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_extract_text_reports_blocked_prompt() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        let err = GeminiClient::extract_text_from_response(&response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_extract_text_rejects_blank_output() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "  \n " }], "role": "model" },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let err = GeminiClient::extract_text_from_response(&response).unwrap_err();
        assert!(err.to_string().contains("No response text"));
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response = GenerateContentResponse::default();
        let err = GeminiClient::extract_text_from_response(&response).unwrap_err();
        assert!(err.to_string().contains("No response text"));
    }

    #[tokio::test]
    async fn test_generate_returns_first_candidate_text() {
        let app = Router::new().route(
            "/v1beta/models/:model",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["x-goog-api-key"], "test-key");
                assert_eq!(body["generationConfig"]["temperature"], 0.3);
                Json(json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "apple watch series 10 battery life" }], "role": "model" },
                        "finishReason": "STOP"
                    }]
                }))
            }),
        );
        let addr = serve(app).await;

        let text = client_for(addr)
            .generate("rewrite this", GenerationConfig::query_rewrite())
            .await
            .unwrap();
        assert_eq!(text, "apple watch series 10 battery life");
    }

    #[tokio::test]
    async fn test_generate_surfaces_http_status() {
        let app = Router::new().route(
            "/v1beta/models/:model",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#,
                )
            }),
        );
        let addr = serve(app).await;

        let err = client_for(addr)
            .generate("hello", GenerationConfig::answer())
            .await
            .unwrap_err();
        assert_eq!(err.upstream_status(), Some(429));
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));
    }
}
