use divvy_core::BillItem;
use tracing::trace;

use crate::aggregate::Aggregator;
use crate::classify::LineClassifier;
use crate::config::ParserConfig;
use crate::lines::reconstruct_lines;
use crate::name::{join_remaining, normalize};
use crate::price::PriceExtractor;
use crate::quantity::QuantityExtractor;
use crate::tokens::tokenize;
use crate::types::{ParsedLine, TextFragment};

/// Synchronous fragments-to-items pipeline: reconstruct lines, classify, extract
/// price, quantity and name, then aggregate.
pub struct ReceiptParser {
    config: ParserConfig,
    classifier: LineClassifier,
}

impl Default for ReceiptParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl ReceiptParser {
    pub fn new(config: ParserConfig) -> Self {
        let classifier = LineClassifier::new(&config.profile);
        Self { config, classifier }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn classifier(&self) -> &LineClassifier {
        &self.classifier
    }

    pub fn lines(&self, fragments: &[TextFragment]) -> Vec<String> {
        reconstruct_lines(fragments, self.config.line_tolerance, self.config.y_axis)
    }

    pub fn parse_fragments(&self, fragments: &[TextFragment]) -> Vec<BillItem> {
        self.parse_lines(&self.lines(fragments))
    }

    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> Vec<BillItem> {
        let mut aggregator = Aggregator::new();
        aggregator.extend(lines.iter().filter_map(|l| self.parse_line(l.as_ref())));
        aggregator.finish()
    }

    /// Parse one reconstructed line. `None` for noise lines, lines without a name,
    /// and (when prices are required) lines without a price.
    pub fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        if !self.classifier.is_item(line) {
            return None;
        }
        let profile = &self.config.profile;
        let prices = PriceExtractor::new(profile);
        let quantities = QuantityExtractor::new(profile);

        let tokens = tokenize(line);
        let mut excluded = vec![false; tokens.len()];

        let explicit = quantities.explicit(&tokens);
        for &i in explicit.iter().flat_map(|q| &q.consumed) {
            excluded[i] = true;
        }

        let price = prices.extract(&tokens, &excluded);
        if price.is_none() && self.config.require_price {
            trace!(line, "no price found, dropping line");
            return None;
        }

        let quantity = explicit.or_else(|| quantities.leading_count(&tokens, price.as_ref()));
        let consumed = price
            .iter()
            .flat_map(|p| &p.consumed)
            .chain(quantity.iter().flat_map(|q| &q.consumed));
        for &i in consumed {
            excluded[i] = true;
        }
        for (i, token) in tokens.iter().enumerate() {
            if prices.is_marker(token) {
                excluded[i] = true;
            }
        }

        let name = join_remaining(&tokens, &excluded);
        if normalize(&name).is_empty() {
            trace!(line, "no name left, dropping line");
            return None;
        }

        Some(ParsedLine {
            name,
            unit_price: price.map(|p| p.value),
            quantity: quantity.map_or(1, |q| q.quantity),
        })
    }
}
