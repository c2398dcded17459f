use std::time::Duration;

use tracing::{error, info};

use crate::backend::Backend;
use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisRequest, AnalysisResult, EncodedImage};
use crate::parser;

/// Runs one analysis: build the request, call the backend once, parse the reply.
#[derive(Debug, Clone)]
pub struct Analyzer {
    backend: Backend,
    default_model: Option<String>,
    timeout: Duration,
}

impl Analyzer {
    pub fn new(backend: Backend, default_model: Option<String>, timeout: Duration) -> Self {
        Self {
            backend,
            default_model,
            timeout,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub async fn analyze(
        &self,
        images: Vec<EncodedImage>,
        model: Option<String>,
    ) -> Result<AnalysisResult> {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.default_model.clone())
            .unwrap_or_else(|| self.backend.default_model().to_string());

        let request = AnalysisRequest::build(images, self.backend.instruction(), model)?;

        let start = std::time::Instant::now();
        let raw = tokio::time::timeout(self.timeout, self.backend.analyze(&request))
            .await
            .map_err(|_| {
                error!("Backend call exceeded {:?}", self.timeout);
                AnalysisError::Backend(format!(
                    "{} request timed out after {:?}",
                    self.backend.kind().as_str(),
                    self.timeout
                ))
            })??;

        info!(
            "{} answered in {:.1}s ({} chars)",
            self.backend.kind().as_str(),
            start.elapsed().as_secs_f64(),
            raw.len()
        );

        parser::parse(&raw).map_err(|e| {
            error!("Analysis parse failed: {}", e);
            e
        })
    }
}
