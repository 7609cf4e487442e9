use divvy_core::Money;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::locale::LocaleProfile;
use crate::tokens::bare_word;

pub(crate) const CURRENCY_GLYPHS: &[char] = &['€', '$', '£', '¥'];

re!(re_percentage, r"^\d{1,2}%$");
re!(re_numeric, r"^-?\d[\d.,]*$");
re!(re_decimal_tail, r"\d[.,]\d{1,2}$");

/// The selected unit price and the token positions it used up (the amount and, for
/// marker-adjacent prices, the marker itself).
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatch {
    pub value: Money,
    pub consumed: Vec<usize>,
}

/// Normalize one token to an exact decimal.
///
/// Everything but digits, `,`, `.` and `-` is stripped. A lone comma is the decimal
/// separator; with a dot present, commas are thousands separators. More than one dot,
/// no digits, or an unparsable remainder all mean "no amount".
pub fn normalize_amount(token: &str) -> Option<Decimal> {
    let kept: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let clean = if kept.contains(',') && !kept.contains('.') {
        kept.replace(',', ".")
    } else {
        kept.replace(',', "")
    };
    if clean.matches('.').count() > 1 {
        return None;
    }
    Decimal::from_str(&clean).ok()
}

/// Value of a token that is a number and nothing else, apart from currency glyphs
/// and trailing `:`/`;`.
pub(crate) fn numeric_value(token: &str) -> Option<Decimal> {
    let core = token
        .trim_matches(CURRENCY_GLYPHS)
        .trim_end_matches(|c: char| c == ':' || c == ';');
    if !re_numeric().is_match(core) {
        return None;
    }
    normalize_amount(core)
}

fn has_glued_glyph(token: &str) -> bool {
    token.contains(CURRENCY_GLYPHS) && token.chars().any(|c| c.is_ascii_digit())
}

/// Whether a token reads as a money amount rather than a count: it carries a currency
/// glyph or ends in a one- or two-digit decimal part.
pub(crate) fn looks_like_price(token: &str) -> bool {
    has_glued_glyph(token) || re_decimal_tail().is_match(token.trim_end_matches(CURRENCY_GLYPHS))
}

pub(crate) fn is_bare_count(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| c.is_ascii_digit())
        && token.parse::<u64>().is_ok_and(|n| n > 0)
}

pub struct PriceExtractor<'a> {
    profile: &'a LocaleProfile,
}

impl<'a> PriceExtractor<'a> {
    pub fn new(profile: &'a LocaleProfile) -> Self {
        Self { profile }
    }

    /// Standalone currency code, currency name, glyph or price word.
    pub fn is_marker(&self, token: &str) -> bool {
        let word = bare_word(token);
        !word.is_empty() && self.profile.is_price_marker(word)
    }

    /// Pick the unit price among `tokens`. Positions flagged in `claimed` belong to
    /// the quantity extractor and are never considered.
    pub fn extract(&self, tokens: &[String], claimed: &[bool]) -> Option<PriceMatch> {
        self.glued_currency(tokens, claimed)
            .or_else(|| self.marker_adjacent(tokens, claimed))
            .or_else(|| self.rightmost_number(tokens, claimed))
    }

    fn glued_currency(&self, tokens: &[String], claimed: &[bool]) -> Option<PriceMatch> {
        (0..tokens.len()).rev().find_map(|i| {
            if is_claimed(claimed, i) || !has_glued_glyph(&tokens[i]) {
                return None;
            }
            let value = numeric_value(&tokens[i])?;
            if self.is_disqualified(tokens, i) || !self.alpha_remains(tokens, claimed, i) {
                return None;
            }
            Some(PriceMatch { value: Money::new(value), consumed: vec![i] })
        })
    }

    fn marker_adjacent(&self, tokens: &[String], claimed: &[bool]) -> Option<PriceMatch> {
        (0..tokens.len()).rev().find_map(|m| {
            if is_claimed(claimed, m) || !self.is_marker(&tokens[m]) {
                return None;
            }
            let neighbours = [m.checked_sub(1), Some(m + 1)];
            neighbours.into_iter().flatten().find_map(|i| {
                let token = tokens.get(i)?;
                if is_claimed(claimed, i)
                    || self.is_marker(token)
                    || self.is_disqualified(tokens, i)
                {
                    return None;
                }
                let value = numeric_value(token)?;
                let mut consumed = vec![i, m];
                consumed.sort_unstable();
                Some(PriceMatch { value: Money::new(value), consumed })
            })
        })
    }

    fn rightmost_number(&self, tokens: &[String], claimed: &[bool]) -> Option<PriceMatch> {
        (0..tokens.len()).rev().find_map(|i| {
            let token = &tokens[i];
            if is_claimed(claimed, i) || self.is_marker(token) {
                return None;
            }
            // A bare leading integer is left for the quantity extractor.
            if i == 0 && tokens.len() > 1 && is_bare_count(token) {
                return None;
            }
            let value = numeric_value(token)?;
            if self.is_disqualified(tokens, i) || !self.alpha_remains(tokens, claimed, i) {
                return None;
            }
            Some(PriceMatch { value: Money::new(value), consumed: vec![i] })
        })
    }

    /// Percentages and numbers next to a tax keyword are never prices.
    fn is_disqualified(&self, tokens: &[String], i: usize) -> bool {
        if re_percentage().is_match(&tokens[i]) {
            return true;
        }
        let is_tax = |j: usize| {
            tokens
                .get(j)
                .is_some_and(|t| self.profile.is_tax_keyword(bare_word(t)))
        };
        i.checked_sub(1).is_some_and(is_tax) || is_tax(i + 1)
    }

    /// Whether any alphabetic character is left once the candidate, markers and
    /// claimed tokens are removed.
    fn alpha_remains(&self, tokens: &[String], claimed: &[bool], candidate: usize) -> bool {
        tokens.iter().enumerate().any(|(j, t)| {
            j != candidate
                && !is_claimed(claimed, j)
                && !self.is_marker(t)
                && t.chars().any(char::is_alphabetic)
        })
    }
}

fn is_claimed(claimed: &[bool], i: usize) -> bool {
    claimed.get(i).copied().unwrap_or(false)
}
