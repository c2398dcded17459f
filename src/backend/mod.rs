//! Vision model adapters. Gemini and Claude share one contract: take an
//! [`AnalysisRequest`], return the model's raw text.

mod claude;
mod gemini;

pub use claude::ClaudeAdapter;
pub use gemini::GeminiAdapter;

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::error;

use crate::config::{BackendKind, Config};
use crate::error::{AnalysisError, Result};
use crate::models::AnalysisRequest;

#[derive(Debug, Clone)]
pub enum Backend {
    Gemini(GeminiAdapter),
    Claude(ClaudeAdapter),
}

impl Backend {
    pub fn from_config(config: &Config, client: Client) -> Self {
        match config.backend {
            BackendKind::Gemini => Backend::Gemini(GeminiAdapter::new(
                client,
                config.gemini_api_key.clone(),
                config.gemini_base_url.clone(),
            )),
            BackendKind::Claude => Backend::Claude(ClaudeAdapter::new(
                client,
                config.claude_api_key.clone(),
                config.claude_base_url.clone(),
            )),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Gemini(_) => BackendKind::Gemini,
            Backend::Claude(_) => BackendKind::Claude,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::Gemini(_) => gemini::DEFAULT_MODEL,
            Backend::Claude(_) => claude::DEFAULT_MODEL,
        }
    }

    pub fn instruction(&self) -> String {
        match self {
            Backend::Gemini(_) => crate::prompt::gemini_instruction(),
            Backend::Claude(_) => crate::prompt::claude_instruction(),
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        match self {
            Backend::Gemini(adapter) => adapter.analyze(request).await,
            Backend::Claude(adapter) => adapter.analyze(request).await,
        }
    }
}

/// Returns the configured key or fails before any request is built.
fn require_key(api_key: &Option<String>) -> Result<&str> {
    api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(AnalysisError::missing_api_key)
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Sends the request and returns the body of a 2xx response.
async fn send(provider: &str, request: RequestBuilder) -> Result<String> {
    let resp = request.send().await.map_err(|e| {
        let message = if e.is_timeout() {
            format!("{} request timed out", provider)
        } else {
            format!("{} request failed: {}", provider, e)
        };
        error!("{}", message);
        AnalysisError::Backend(message)
    })?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| {
        AnalysisError::Backend(format!("Failed to read {} response: {}", provider, e))
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<ProviderErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        error!("{} API error ({}): {}", provider, status, message);
        return Err(AnalysisError::Backend(format!(
            "{} API error ({}): {}",
            provider, status, message
        )));
    }

    Ok(body)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn blank_key_is_missing() {
        assert!(matches!(
            require_key(&Some("  ".into())),
            Err(AnalysisError::Configuration(_))
        ));
        assert!(matches!(require_key(&None), Err(AnalysisError::Configuration(_))));
        assert_eq!(require_key(&Some("k".into())).unwrap(), "k");
    }

    #[test]
    fn selected_by_config() {
        let mut config = Config::default();
        let backend = Backend::from_config(&config, Client::new());
        assert_eq!(backend.kind(), BackendKind::Gemini);
        assert_eq!(backend.default_model(), "gemini-2.5-flash");

        config.backend = BackendKind::Claude;
        let backend = Backend::from_config(&config, Client::new());
        assert_eq!(backend.kind(), BackendKind::Claude);
        assert!(backend.instruction().contains("productName"));
    }

    #[tokio::test]
    async fn timeout_is_backend_error() {
        let base = test_support::spawn_silent().await;
        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        let err = send("Test", client.get(format!("{}/slow", base)))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Backend(ref m) if m.contains("timed out")));
    }
}
