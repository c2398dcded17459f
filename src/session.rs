//! Capture → analyzing → result flow for one user.
//!
//! The only way into `Result` is through `Analyzing`, and any failure drops
//! back to `Home` with the selections discarded and a one-line message set.
//! A shown result is only left through `reset`.

use thiserror::Error;
use tracing::warn;

use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisResult, AnalyzeImageBody, EncodedImage};

type Transition<T = ()> = std::result::Result<T, TransitionError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Home,
    Analyzing,
    Result,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} while on {from:?}")]
    NotAllowed { action: &'static str, from: Screen },
}

#[derive(Debug, Default)]
pub struct Session {
    screen: Screen,
    selections: Vec<EncodedImage>,
    result: Option<AnalysisResult>,
    message: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    #[allow(dead_code)]
    pub fn selections(&self) -> &[EncodedImage] {
        &self.selections
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn expect_screen(&self, allowed: &[Screen], action: &'static str) -> Transition {
        if allowed.contains(&self.screen) {
            Ok(())
        } else {
            Err(TransitionError::NotAllowed {
                action,
                from: self.screen,
            })
        }
    }

    pub fn add_images(
        &mut self,
        images: impl IntoIterator<Item = EncodedImage>,
    ) -> Transition {
        self.expect_screen(&[Screen::Home], "add images")?;
        self.selections.extend(images);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn remove_image(&mut self, index: usize) -> Transition<Option<EncodedImage>> {
        self.expect_screen(&[Screen::Home], "remove an image")?;
        Ok((index < self.selections.len()).then(|| self.selections.remove(index)))
    }

    /// Home → Analyzing. Needs at least one selected image; returns the upload body.
    /// The instruction text is attached by the server, so only the model travels.
    pub fn begin_analysis(&mut self, model: Option<String>) -> Result<AnalyzeImageBody> {
        self.expect_screen(&[Screen::Home], "start an analysis")?;
        if self.selections.is_empty() {
            return Err(AnalysisError::no_images());
        }

        self.message = None;
        self.screen = Screen::Analyzing;
        Ok(AnalyzeImageBody::new(&self.selections, model))
    }

    /// Analyzing → Result.
    pub fn complete(&mut self, result: AnalysisResult) -> Transition {
        self.expect_screen(&[Screen::Analyzing], "show a result")?;
        self.result = Some(result);
        self.screen = Screen::Result;
        Ok(())
    }

    /// Analyzing → Home, keeping only the error message. Also accepted on Home
    /// for errors raised before the analysis started. A shown result is kept.
    pub fn fail(&mut self, error: &AnalysisError) -> Transition {
        self.expect_screen(&[Screen::Home, Screen::Analyzing], "report a failure")?;
        warn!("Analysis failed, returning home: {}", error);
        self.selections.clear();
        self.result = None;
        self.message = Some(error.to_string().lines().next().unwrap_or_default().to_string());
        self.screen = Screen::Home;
        Ok(())
    }

    /// Result|Analyzing → Home, discarding everything.
    pub fn reset(&mut self) -> Transition {
        self.expect_screen(&[Screen::Result, Screen::Analyzing], "reset")?;
        *self = Self::default();
        Ok(())
    }
}
