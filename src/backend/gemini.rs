use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{require_key, send};
use crate::error::{AnalysisError, Result};
use crate::models::AnalysisRequest;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiAdapter {
    pub fn new(client: Client, api_key: Option<String>, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_body(request: &AnalysisRequest) -> GeminiRequest {
        let mut parts = vec![Part::Text {
            text: request.instruction.clone(),
        }];

        parts.extend(request.images.iter().map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: image.media_type.clone(),
                data: image.data.clone(),
            },
        }));

        GeminiRequest {
            contents: vec![Content { parts }],
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        let api_key = require_key(&self.api_key)?;
        if !is_model_name(&request.model) {
            return Err(AnalysisError::Validation(format!(
                "Invalid model name: {:?}",
                request.model
            )));
        }
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );

        info!(
            "Sending {} image(s) to Gemini ({})...",
            request.images.len(),
            request.model
        );

        let body = send(
            "Gemini",
            self.client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&Self::build_body(request)),
        )
        .await?;

        let resp: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::Backend(format!("Failed to parse Gemini response: {}", e))
        })?;

        resp.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| AnalysisError::Backend("Gemini returned no candidates".to_string()))
    }
}

/// The model is spliced into the URL path, so only plain identifier characters pass.
fn is_model_name(model: &str) -> bool {
    !model.is_empty()
        && model
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support;
    use crate::models::EncodedImage;
    use axum::{extract::Path, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    const UNREACHABLE: &str = "http://127.0.0.1:1";

    fn request_for(model: &str) -> AnalysisRequest {
        AnalysisRequest::build(
            vec![EncodedImage {
                data: "AAAA".into(),
                media_type: "image/jpeg".into(),
            }],
            "describe",
            model,
        )
        .unwrap()
    }

    fn request() -> AnalysisRequest {
        request_for(DEFAULT_MODEL)
    }

    #[test]
    fn body_puts_instruction_first() {
        let value = serde_json::to_value(GeminiAdapter::build_body(&request())).unwrap();
        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "AAAA");
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        // Unroutable base URL: any attempted request would surface as a backend error.
        let adapter = GeminiAdapter::new(Client::new(), None, UNREACHABLE.into());
        let err = adapter.analyze(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }

    #[test]
    fn model_names() {
        assert!(is_model_name("gemini-2.5-flash"));
        assert!(is_model_name("gemini-1.5-pro_latest"));
        assert!(!is_model_name(""));
        assert!(!is_model_name("../x"));
        assert!(!is_model_name("m:generateContent?key=y"));
        assert!(!is_model_name("a b"));
    }

    #[tokio::test]
    async fn path_like_model_is_rejected_before_network() {
        let adapter = GeminiAdapter::new(Client::new(), Some("secret".into()), UNREACHABLE.into());
        let err = adapter.analyze(&request_for("../x?key=y")).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(ref m) if m.contains("Invalid model")));
    }

    #[tokio::test]
    async fn returns_candidate_text() {
        async fn generate(
            Path(model): Path<String>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            assert_eq!(model, "gemini-2.5-flash:generateContent");
            assert_eq!(headers["x-goog-api-key"], "secret");
            assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 2);
            Json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "```json\n{}\n```" }] } }]
            }))
        }

        let router = Router::new().route("/v1beta/models/{model}", post(generate));
        let base = test_support::spawn(router).await;

        let adapter = GeminiAdapter::new(Client::new(), Some("secret".into()), base);
        assert_eq!(adapter.analyze(&request()).await.unwrap(), "```json\n{}\n```");
    }

    #[tokio::test]
    async fn provider_error_message_is_surfaced() {
        let router = Router::new().route(
            "/v1beta/models/{model}",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": { "code": 429, "message": "Quota exceeded" } })),
                )
            }),
        );
        let base = test_support::spawn(router).await;

        let adapter = GeminiAdapter::new(Client::new(), Some("secret".into()), base);
        let err = adapter.analyze(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Backend(ref m) if m.contains("Quota exceeded")));
    }

    #[tokio::test]
    async fn empty_candidates_is_backend_error() {
        let router = Router::new().route(
            "/v1beta/models/{model}",
            post(|| async { Json(json!({ "candidates": [] })) }),
        );
        let base = test_support::spawn(router).await;

        let adapter = GeminiAdapter::new(Client::new(), Some("secret".into()), base);
        let err = adapter.analyze(&request()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Backend(_)));
    }
}
