use regex::Regex;
use tracing::{debug, warn};

use crate::locale::{ClassificationRule, KeywordMatch, LocaleProfile, RuleTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Item,
    Noise(RuleTag),
}

/// Internal pairing of a rule tag with its precompiled keyword pattern.
struct CompiledRule {
    tag: RuleTag,
    pattern: Regex,
}

/// Keeps candidate item lines and drops headers, totals, tax and payment noise.
pub struct LineClassifier {
    rules: Vec<CompiledRule>,
}

impl LineClassifier {
    pub fn new(profile: &LocaleProfile) -> Self {
        let rules = profile
            .rules
            .iter()
            .filter_map(|rule| {
                let pattern = compile_rule(rule)?;
                Some(CompiledRule { tag: rule.tag, pattern })
            })
            .collect();
        Self { rules }
    }

    pub fn classify(&self, line: &str) -> LineClass {
        let trimmed = line.trim();
        if trimmed.chars().count() < 2 {
            return LineClass::Noise(RuleTag::TooShort);
        }
        let lower = trimmed.to_lowercase();
        match self.rules.iter().find(|r| r.pattern.is_match(&lower)) {
            Some(rule) => {
                debug!(tag = %rule.tag, line = trimmed, "dropping noise line");
                LineClass::Noise(rule.tag)
            }
            None => LineClass::Item,
        }
    }

    pub fn is_item(&self, line: &str) -> bool {
        self.classify(line) == LineClass::Item
    }
}

/// Build one alternation for all keywords of a rule. Keyword edges that are
/// alphanumeric must sit next to a non-alphanumeric character or a line edge, so
/// `total` matches `Total:` but not `Totale`.
fn compile_rule(rule: &ClassificationRule) -> Option<Regex> {
    let alternatives: Vec<String> = rule
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .map(|k| {
            let starts_alnum = k.chars().next().is_some_and(char::is_alphanumeric);
            let ends_alnum = k.chars().last().is_some_and(char::is_alphanumeric);
            let lead = match rule.match_type {
                KeywordMatch::Leading => "^",
                KeywordMatch::Contains if starts_alnum => r"(?:^|[^\p{L}\p{N}])",
                KeywordMatch::Contains => "",
            };
            let tail = if ends_alnum { r"(?:$|[^\p{L}\p{N}])" } else { "" };
            format!("{lead}{}{tail}", regex::escape(&k))
        })
        .collect();

    if alternatives.is_empty() {
        return None;
    }
    match Regex::new(&format!("(?:{})", alternatives.join("|"))) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(tag = %rule.tag, error = %e, "skipping classification rule");
            None
        }
    }
}
