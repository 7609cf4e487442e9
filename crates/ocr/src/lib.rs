macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod lines;
pub mod locale;
pub mod name;
pub mod parser;
pub mod pipeline;
pub mod price;
pub mod quantity;
pub mod recognizer;
pub mod tokens;
pub mod types;

pub use aggregate::Aggregator;
pub use classify::{LineClass, LineClassifier};
pub use config::{ConfigError, ParserConfig, DEFAULT_LINE_TOLERANCE};
pub use lines::reconstruct_lines;
pub use locale::{ClassificationRule, KeywordMatch, Locale, LocaleProfile, RuleTag};
pub use parser::ReceiptParser;
pub use pipeline::{
    AnalysisError, AnalysisState, EmptyReason, RecognitionOrchestrator, EMPTY_RESULT_MESSAGE,
};
pub use price::normalize_amount;
pub use recognizer::{FixtureRecognizer, MockRecognizer, OcrBackend, OcrError};
pub use types::{ParsedLine, RecognitionMode, RecognitionParams, TextFragment, YAxis};
