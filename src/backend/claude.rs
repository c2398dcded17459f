use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{require_key, send};
use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisRequest, ImagePayload};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct ClaudeAdapter {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

// --- Messages API types ---

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentBlock {
    Image(ImagePayload),
    Text {
        #[serde(rename = "type")]
        kind: &'static str,
        text: String,
    },
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeAdapter {
    pub fn new(client: Client, api_key: Option<String>, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_body(request: &AnalysisRequest) -> MessagesRequest {
        let mut content: Vec<ContentBlock> = request
            .images
            .iter()
            .map(|image| ContentBlock::Image(ImagePayload::from(image)))
            .collect();

        content.push(ContentBlock::Text {
            kind: "text",
            text: request.instruction.clone(),
        });

        MessagesRequest {
            model: request.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        let api_key = require_key(&self.api_key)?;

        info!(
            "Sending {} image(s) to Claude ({})...",
            request.images.len(),
            request.model
        );

        let body = send(
            "Claude",
            self.client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&Self::build_body(request)),
        )
        .await?;

        let resp: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::Backend(format!("Failed to parse Claude response: {}", e))
        })?;

        resp.content
            .into_iter()
            .filter(|block| block.kind == "text")
            .find_map(|block| block.text)
            .ok_or_else(|| AnalysisError::Backend("Claude returned no text content".to_string()))
    }
}
