//! The `decode` command: prepare local label photos, send them to a running
//! server and parse its answer, driving a [`Session`] along the way.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use reqwest::Client;
use tracing::{info, warn};

use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisResult, ErrorBody};
use crate::parser;
use crate::preprocess::{self, PrepareOptions, SourceImage};
use crate::session::Session;

pub struct DecodeClient {
    client: Client,
    server: String,
    options: PrepareOptions,
}

impl DecodeClient {
    pub fn new(client: Client, server: impl Into<String>, options: PrepareOptions) -> Self {
        Self {
            client,
            server: server.into().trim_end_matches('/').to_string(),
            options,
        }
    }

    /// Runs one analysis. On any failure the session is sent back home with a message,
    /// unless it is already showing a result.
    pub async fn decode(
        &self,
        session: &mut Session,
        paths: &[PathBuf],
        model: Option<String>,
    ) -> Result<AnalysisResult> {
        match self.try_decode(session, paths, model).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if let Err(rejected) = session.fail(&e) {
                    warn!("Keeping session state: {}", rejected);
                }
                Err(e)
            }
        }
    }

    async fn try_decode(
        &self,
        session: &mut Session,
        paths: &[PathBuf],
        model: Option<String>,
    ) -> Result<AnalysisResult> {
        let sources = paths
            .iter()
            .map(|path| read_source(path))
            .collect::<Result<Vec<_>>>()?;

        let images = preprocess::prepare_batch(sources, self.options).await?;
        session.add_images(images)?;

        let body = session.begin_analysis(model)?;
        let url = format!("{}/api/analyzeImage", self.server);
        info!("Posting {} image(s) to {}", body.images.len(), url);

        let resp = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisError::Backend("analysis request timed out".to_string())
            } else {
                AnalysisError::Backend(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AnalysisError::Backend(format!("Failed to read server response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("Server error ({})", status));
            return Err(AnalysisError::Backend(message));
        }

        let result = parser::parse(&text)?;
        session.complete(result.clone())?;
        Ok(result)
    }
}

fn read_source(path: &Path) -> Result<SourceImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| AnalysisError::Decode(format!("{}: {}", path.display(), e)))?;

    let media_type = ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");

    Ok(SourceImage {
        bytes,
        media_type: media_type.to_string(),
    })
}
