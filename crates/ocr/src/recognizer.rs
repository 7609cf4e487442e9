use serde::Deserialize;
use std::sync::Mutex;
use thiserror::Error;

use crate::types::{RecognitionMode, RecognitionParams, TextFragment};

#[derive(Debug, Clone, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("No OCR backend available")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
///
/// Implementations accept raw image bytes and return positioned text fragments in
/// arrival order. An empty result is not an error; `Err` means the engine itself
/// failed. Calls may block, so the orchestrator runs them off the async executor.
///
/// Engines configure themselves from [`RecognitionMode::params`]: language correction
/// and the minimum text height differ between the accurate and the fast pass.
pub trait OcrBackend: Send + Sync {
    fn recognize(
        &self,
        image_bytes: &[u8],
        mode: RecognitionMode,
    ) -> Result<Vec<TextFragment>, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns pre-set fragments per mode and records which modes were requested.
pub struct MockRecognizer {
    accurate: Result<Vec<TextFragment>, OcrError>,
    fast: Result<Vec<TextFragment>, OcrError>,
    calls: Mutex<Vec<RecognitionMode>>,
}

impl MockRecognizer {
    /// Same fragments for both modes.
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self::per_mode(Ok(fragments.clone()), Ok(fragments))
    }

    pub fn per_mode(
        accurate: Result<Vec<TextFragment>, OcrError>,
        fast: Result<Vec<TextFragment>, OcrError>,
    ) -> Self {
        Self { accurate, fast, calls: Mutex::new(Vec::new()) }
    }

    /// Modes requested so far, in call order.
    pub fn calls(&self) -> Vec<RecognitionMode> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Engine parameters implied by each requested mode, in call order.
    pub fn requested_params(&self) -> Vec<RecognitionParams> {
        self.calls().into_iter().map(RecognitionMode::params).collect()
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(
        &self,
        _image_bytes: &[u8],
        mode: RecognitionMode,
    ) -> Result<Vec<TextFragment>, OcrError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(mode);
        }
        match mode {
            RecognitionMode::Accurate => self.accurate.clone(),
            RecognitionMode::Fast => self.fast.clone(),
        }
    }
}

// ── Fixture backend ───────────────────────────────────────────────────────────

/// Treats the "image" as a JSON capture of a previous OCR run:
///
/// ```json
/// { "accurate": [{"text": "Burger", "x_center": 0.2, "y_center": 0.8}], "fast": [] }
/// ```
///
/// A bare array is used for both modes. Missing modes yield no fragments.
#[derive(Debug, Default)]
pub struct FixtureRecognizer;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Fixture {
    PerMode {
        #[serde(default)]
        accurate: Vec<TextFragment>,
        #[serde(default)]
        fast: Vec<TextFragment>,
    },
    Shared(Vec<TextFragment>),
}

impl OcrBackend for FixtureRecognizer {
    fn recognize(
        &self,
        image_bytes: &[u8],
        mode: RecognitionMode,
    ) -> Result<Vec<TextFragment>, OcrError> {
        let fixture: Fixture = serde_json::from_slice(image_bytes)
            .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
        Ok(match (fixture, mode) {
            (Fixture::Shared(all), _) => all,
            (Fixture::PerMode { accurate, .. }, RecognitionMode::Accurate) => accurate,
            (Fixture::PerMode { fast, .. }, RecognitionMode::Fast) => fast,
        })
    }
}
