use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GenerationSettings;

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_THRESHOLD: &str = "BLOCK_NONE";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected http status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("failed to parse response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// A text-generation backend. One prompt in, one completion out.
///
/// Implementations must return [`GenerationError::EmptyResponse`] instead of
/// an empty or whitespace-only string.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(settings: &GenerationSettings) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()?;

        Ok(GeminiClient {
            client,
            url: format!(
                "{}/models/{}:generateContent",
                settings.api_url.trim_end_matches('/'),
                settings.model
            ),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k,
            max_output_tokens: settings.max_output_tokens,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GeminiRequest<'a> {
        GeminiRequest {
            contents: vec![GeminiRequestContent {
                role: "user",
                parts: vec![GeminiRequestPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                max_output_tokens: self.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| GeminiSafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::debug!(url = %self.url, prompt_chars = prompt.chars().count(), "calling model");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::HttpStatus {
                status,
                body: response_text,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)?;
        extract_text(parsed)
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiRequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Serialize)]
struct GeminiRequestContent<'a> {
    role: &'static str,
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// Non-text parts (inline data, function calls) deserialize with no text.
#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

fn extract_text(response: GeminiResponse) -> Result<String, GenerationError> {
    for candidate in response.candidates {
        match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => tracing::warn!("model response truncated at max output tokens"),
            Some("SAFETY") => tracing::warn!("model response blocked by safety filters"),
            Some("RECITATION") => tracing::warn!("model response blocked for recitation"),
            _ => {}
        }

        if let Some(content) = candidate.content {
            let text: String = content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect();
            if !text.trim().is_empty() {
                return Ok(text);
            }
        }
    }

    Err(GenerationError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::http::{HeaderMap, Uri};
    use tokio::net::TcpListener;

    use super::*;

    fn settings() -> GenerationSettings {
        GenerationSettings {
            api_key: "secret".to_string(),
            api_url: "http://localhost:1234/v1beta/".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn request_body_carries_sampling_and_safety_settings() {
        let client = GeminiClient::new(&settings()).unwrap();
        assert_eq!(
            client.url,
            "http://localhost:1234/v1beta/models/gemini-1.5-flash:generateContent"
        );

        let body = serde_json::to_value(client.request_body("Era uma vez")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Era uma vez");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);

        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
    }

    #[test]
    fn text_parts_are_joined() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Olá, "},{"text":"mundo"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Olá, mundo");
    }

    #[test]
    fn blank_or_missing_content_is_empty_response() {
        let blank: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  \n"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert!(matches!(extract_text(blank), Err(GenerationError::EmptyResponse)));

        let blocked: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(matches!(extract_text(blocked), Err(GenerationError::EmptyResponse)));

        let none: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(extract_text(none), Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn non_text_parts_are_skipped() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"AA=="}},{"text":"Fim."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Fim.");
    }

    #[derive(Debug)]
    struct SeenRequest {
        path: String,
        api_key: Option<String>,
        body: serde_json::Value,
    }

    /// Serves one canned reply for every request on a loopback port and
    /// returns settings pointing the client at it.
    async fn stub_server(
        status: u16,
        reply: &'static str,
    ) -> (GenerationSettings, Arc<Mutex<Vec<SeenRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: String| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(SeenRequest {
                    path: uri.path().to_string(),
                    api_key: headers
                        .get("x-goog-api-key")
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string),
                    body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
                });
                (axum::http::StatusCode::from_u16(status).unwrap(), reply)
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut settings = settings();
        settings.api_url = format!("http://{}/v1beta", addr);
        (settings, seen)
    }

    #[tokio::test]
    async fn generate_posts_prompt_with_api_key_header() {
        let (settings, seen) = stub_server(
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"Marina acordou."}]},"finishReason":"STOP"}]}"#,
        )
        .await;
        let client = GeminiClient::new(&settings).unwrap();

        assert_eq!(client.generate("Era uma vez").await.unwrap(), "Marina acordou.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "/v1beta/models/gemini-1.5-flash:generateContent");
        assert_eq!(seen[0].api_key.as_deref(), Some("secret"));
        assert_eq!(seen[0].body["contents"][0]["parts"][0]["text"], "Era uma vez");
        assert_eq!(seen[0].body["generationConfig"]["topK"], 40);
        assert_eq!(seen[0].body["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn non_success_status_keeps_status_and_body() {
        let (settings, _) = stub_server(503, "model overloaded").await;
        let client = GeminiClient::new(&settings).unwrap();

        match client.generate("Era uma vez").await {
            Err(GenerationError::HttpStatus { status, body }) => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "model overloaded");
            }
            other => panic!("expected http status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_error() {
        let (settings, _) = stub_server(200, "<html>not json</html>").await;
        let client = GeminiClient::new(&settings).unwrap();

        assert!(matches!(
            client.generate("Era uma vez").await,
            Err(GenerationError::Json(_))
        ));
    }

    #[tokio::test]
    async fn blank_candidate_over_http_is_empty_response() {
        let (settings, _) = stub_server(
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"   "}]},"finishReason":"STOP"}]}"#,
        )
        .await;
        let client = GeminiClient::new(&settings).unwrap();

        assert!(matches!(
            client.generate("Era uma vez").await,
            Err(GenerationError::EmptyResponse)
        ));
    }
}
