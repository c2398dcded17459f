use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AnalysisError, Result};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CLAUDE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gemini,
    Claude,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Gemini => "gemini",
            BackendKind::Claude => "claude",
        }
    }
}

impl FromStr for BackendKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(BackendKind::Gemini),
            "claude" => Ok(BackendKind::Claude),
            other => Err(AnalysisError::Configuration(format!(
                "VISION_BACKEND must be gemini or claude, got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub gemini_base_url: String,
    pub claude_base_url: String,
    pub model: Option<String>,
    pub port: u16,
    pub request_timeout: Duration,
    pub max_image_edge: u32,
    pub jpeg_quality: u8,
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            gemini_api_key: None,
            claude_api_key: None,
            gemini_base_url: DEFAULT_GEMINI_URL.to_string(),
            claude_base_url: DEFAULT_CLAUDE_URL.to_string(),
            model: None,
            port: 3000,
            request_timeout: Duration::from_secs(60),
            max_image_edge: 1024,
            jpeg_quality: 80,
            static_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            backend: match get("VISION_BACKEND") {
                Some(v) => v.parse()?,
                None => defaults.backend,
            },
            gemini_api_key: get("GEMINI_API_KEY"),
            claude_api_key: get("CLAUDE_API_KEY"),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            claude_base_url: get("CLAUDE_BASE_URL").unwrap_or(defaults.claude_base_url),
            model: get("VISION_MODEL"),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                get("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )?),
            max_image_edge: parse_or(
                "MAX_IMAGE_EDGE",
                get("MAX_IMAGE_EDGE"),
                defaults.max_image_edge,
            )?,
            jpeg_quality: parse_or("JPEG_QUALITY", get("JPEG_QUALITY"), defaults.jpeg_quality)?,
            static_dir: get("STATIC_DIR").map(PathBuf::from),
        };

        if config.max_image_edge == 0 {
            return Err(AnalysisError::Configuration(
                "MAX_IMAGE_EDGE must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&config.jpeg_quality) {
            return Err(AnalysisError::Configuration(format!(
                "JPEG_QUALITY must be between 1 and 100, got {}",
                config.jpeg_quality
            )));
        }

        Ok(config)
    }

    /// The credential for the selected backend, if any.
    pub fn api_key(&self) -> Option<&str> {
        match self.backend {
            BackendKind::Gemini => self.gemini_api_key.as_deref(),
            BackendKind::Claude => self.claude_api_key.as_deref(),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| {
            AnalysisError::Configuration(format!("{} has an invalid value: {:?}", key, v))
        }),
        None => Ok(default),
    }
}
