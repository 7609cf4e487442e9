use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::locale::{Locale, LocaleProfile};
use crate::types::YAxis;

pub const DEFAULT_LINE_TOLERANCE: f64 = 0.02;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unknown locale: '{0}'")]
    UnknownLocale(String),
}

/// Everything the receipt parser needs besides the fragments themselves.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub profile: LocaleProfile,
    /// Drop lines without a recognizable price instead of emitting unpriced items.
    pub require_price: bool,
    /// Maximum y-distance for a fragment to join an existing line bucket.
    pub line_tolerance: f64,
    pub y_axis: YAxis,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}

/// On-disk shape. A file either names a preset with `locale` or embeds a full
/// `[profile]` table; the embedded table wins when both are present.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    locale: Option<Locale>,
    profile: Option<LocaleProfile>,
    require_price: Option<bool>,
    line_tolerance: Option<f64>,
    y_axis: Option<YAxis>,
}

impl ParserConfig {
    pub fn for_locale(locale: Locale) -> Self {
        Self {
            profile: locale.profile(),
            require_price: true,
            line_tolerance: DEFAULT_LINE_TOLERANCE,
            y_axis: YAxis::default(),
        }
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(toml_content)?;
        let defaults = Self::for_locale(file.locale.unwrap_or_default());
        Ok(Self {
            profile: file.profile.unwrap_or(defaults.profile),
            require_price: file.require_price.unwrap_or(defaults.require_price),
            line_tolerance: file.line_tolerance.unwrap_or(defaults.line_tolerance),
            y_axis: file.y_axis.unwrap_or(defaults.y_axis),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}
