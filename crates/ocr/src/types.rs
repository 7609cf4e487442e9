use divvy_core::Money;
use serde::{Deserialize, Serialize};

/// A single OCR-recognized text span with its normalized center point.
///
/// Coordinates are in `[0, 1]` relative to the image. Which end of the y-axis is the
/// top of the page is fixed by [`YAxis`] in the parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub x_center: f64,
    pub y_center: f64,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x_center: f64, y_center: f64) -> Self {
        Self { text: text.into(), x_center, y_center }
    }
}

/// Orientation of fragment y-coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum YAxis {
    /// `y = 1` is the top of the page (Vision-style normalized coordinates).
    #[default]
    BottomUp,
    /// `y = 0` is the top of the page (raster coordinates).
    TopDown,
}

/// Recognition preset requested from the OCR backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    Accurate,
    Fast,
}

/// Backend parameters implied by a [`RecognitionMode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionParams {
    pub uses_language_correction: bool,
    /// Minimum text height as a fraction of image height; smaller text is ignored.
    pub minimum_text_height: f32,
}

impl RecognitionMode {
    pub fn params(self) -> RecognitionParams {
        match self {
            RecognitionMode::Accurate => RecognitionParams {
                uses_language_correction: true,
                minimum_text_height: 0.015,
            },
            RecognitionMode::Fast => RecognitionParams {
                uses_language_correction: false,
                minimum_text_height: 0.0,
            },
        }
    }
}

impl std::fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionMode::Accurate => write!(f, "accurate"),
            RecognitionMode::Fast => write!(f, "fast"),
        }
    }
}

impl std::str::FromStr for RecognitionMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accurate" => Ok(RecognitionMode::Accurate),
            "fast" => Ok(RecognitionMode::Fast),
            other => Err(format!("Unknown recognition mode: '{other}'")),
        }
    }
}

/// What one accepted receipt line contributes before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub name: String,
    pub unit_price: Option<Money>,
    /// Always at least 1.
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn accurate_is_stricter_than_fast() {
        let accurate = RecognitionMode::Accurate.params();
        let fast = RecognitionMode::Fast.params();
        assert!(accurate.uses_language_correction);
        assert!(!fast.uses_language_correction);
        assert!(accurate.minimum_text_height > fast.minimum_text_height);
    }

    #[test]
    fn recognition_mode_roundtrip() {
        for mode in [RecognitionMode::Accurate, RecognitionMode::Fast] {
            assert_eq!(RecognitionMode::from_str(&mode.to_string()).unwrap(), mode);
        }
        assert!(RecognitionMode::from_str("balanced").is_err());
    }

    #[test]
    fn fragment_deserializes_from_json() {
        let f: TextFragment =
            serde_json::from_str(r#"{"text":"Burger","x_center":0.2,"y_center":0.8}"#).unwrap();
        assert_eq!(f, TextFragment::new("Burger", 0.2, 0.8));
    }

    #[test]
    fn y_axis_defaults_to_bottom_up() {
        assert_eq!(YAxis::default(), YAxis::BottomUp);
    }
}
