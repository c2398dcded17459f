use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

// --- Domain types ---

/// An image ready for transport: base64 payload plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub images: Vec<EncodedImage>,
    pub instruction: String,
    pub model: String,
}

impl AnalysisRequest {
    pub fn build(
        images: Vec<EncodedImage>,
        instruction: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        if images.is_empty() {
            return Err(AnalysisError::no_images());
        }

        Ok(Self {
            images,
            instruction: instruction.into(),
            model: model.into(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisResult {
    pub product_name: String,
    pub verdict: Verdict,
    pub highlights: Vec<Highlight>,
    pub translations: Vec<Translation>,
    pub advice: Advice,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Verdict {
    pub title: String,
    pub color: VerdictColor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictColor {
    Red,
    Green,
    #[default]
    Yellow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Highlight {
    #[serde(rename = "type")]
    pub kind: HighlightKind,
    pub label: String,
    pub value: String,
    pub desc: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Good,
    #[default]
    Bad,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Translation {
    pub origin: String,
    pub simplified: String,
    pub explain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advice {
    pub target: String,
    pub warning: String,
    pub action: String,
}

// --- HTTP contract types ---

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalyzeImageBody {
    #[serde(default)]
    pub images: Vec<ImagePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(rename = "type", default = "image_block_type")]
    pub kind: String,
    #[serde(default)]
    pub source: Option<ImageSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type", default = "base64_source_type")]
    pub kind: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

fn image_block_type() -> String {
    "image".to_string()
}

fn base64_source_type() -> String {
    "base64".to_string()
}

impl From<&EncodedImage> for ImagePayload {
    fn from(image: &EncodedImage) -> Self {
        Self {
            kind: image_block_type(),
            source: Some(ImageSource {
                kind: base64_source_type(),
                media_type: Some(image.media_type.clone()),
                data: Some(image.data.clone()),
            }),
        }
    }
}

impl AnalyzeImageBody {
    pub fn new(images: &[EncodedImage], model: Option<String>) -> Self {
        Self {
            images: images.iter().map(ImagePayload::from).collect(),
            model,
        }
    }

    /// Payloads without data are skipped; a missing MIME type falls back to JPEG.
    pub fn encoded_images(&self) -> Vec<EncodedImage> {
        self.images
            .iter()
            .filter_map(|payload| payload.source.as_ref())
            .filter_map(|source| {
                let data = source.data.as_deref().filter(|d| !d.is_empty())?;
                Some(EncodedImage {
                    data: data.to_string(),
                    media_type: source
                        .media_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string()),
                })
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
