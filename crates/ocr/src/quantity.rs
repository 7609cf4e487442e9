use regex::Regex;
use std::sync::OnceLock;

use crate::locale::LocaleProfile;
use crate::price::{is_bare_count, looks_like_price, PriceMatch};
use crate::tokens::bare_word;

re!(re_glued_multiplier, r"^(?:[x×](\d+)|(\d+)[x×])$");

/// A detected quantity and the token positions that expressed it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityMatch {
    pub quantity: u32,
    pub consumed: Vec<usize>,
}

impl QuantityMatch {
    fn new(quantity: u32, consumed: Vec<usize>) -> Self {
        Self { quantity, consumed }
    }
}

pub struct QuantityExtractor<'a> {
    profile: &'a LocaleProfile,
}

impl<'a> QuantityExtractor<'a> {
    pub fn new(profile: &'a LocaleProfile) -> Self {
        Self { profile }
    }

    /// Explicit quantity forms, in priority order: glued multiplier (`x2`, `2x`),
    /// quantity marker (`qty 2`, `qty:2`), count-unit pair (`2 pcs`).
    pub fn explicit(&self, tokens: &[String]) -> Option<QuantityMatch> {
        let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        glued_multiplier(&lower)
            .or_else(|| self.marker(&lower))
            .or_else(|| self.count_unit(&lower))
    }

    /// Fallback: a bare positive integer in first position of a line with at least
    /// two tokens, unless that token was taken as the price. Product codes printed in
    /// front of the name trip this rule as well.
    pub fn leading_count(
        &self,
        tokens: &[String],
        price: Option<&PriceMatch>,
    ) -> Option<QuantityMatch> {
        let first = tokens.first()?;
        if tokens.len() < 2 || looks_like_price(first) || !is_bare_count(first) {
            return None;
        }
        if price.is_some_and(|p| p.consumed.contains(&0)) {
            return None;
        }
        Some(QuantityMatch::new(parse_count(first)?, vec![0]))
    }

    fn marker(&self, lower: &[String]) -> Option<QuantityMatch> {
        lower.iter().enumerate().find_map(|(i, token)| {
            self.profile.quantity_markers.iter().find_map(|marker| {
                let marker = marker.to_lowercase();
                if *token == marker {
                    let next = lower.get(i + 1)?;
                    return Some(QuantityMatch::new(parse_count(next)?, vec![i, i + 1]));
                }
                let rest = token.strip_prefix(marker.as_str())?;
                let digits = rest.strip_prefix(':').unwrap_or(rest);
                Some(QuantityMatch::new(parse_count(digits)?, vec![i]))
            })
        })
    }

    fn count_unit(&self, lower: &[String]) -> Option<QuantityMatch> {
        lower.windows(2).enumerate().find_map(|(i, pair)| {
            let count = parse_count(&pair[0])?;
            self.profile
                .is_count_unit(bare_word(&pair[1]))
                .then(|| QuantityMatch::new(count, vec![i, i + 1]))
        })
    }
}

fn glued_multiplier(lower: &[String]) -> Option<QuantityMatch> {
    lower.iter().enumerate().find_map(|(i, token)| {
        let caps = re_glued_multiplier().captures(token)?;
        let digits = caps.get(1).or_else(|| caps.get(2))?.as_str();
        Some(QuantityMatch::new(parse_count(digits)?, vec![i]))
    })
}

/// Pure-digit token greater than zero, saturating at `u32::MAX`.
fn parse_count(token: &str) -> Option<u32> {
    if !is_bare_count(token) {
        return None;
    }
    let n: u64 = token.parse().ok()?;
    Some(u32::try_from(n).unwrap_or(u32::MAX))
}
