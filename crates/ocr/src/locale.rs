//! Locale-specific keyword data: block-list rules, price markers, tax keywords and
//! quantity vocabulary. Everything here is plain data that can be swapped through
//! TOML; the pipeline stages never hard-code words.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

/// Why a line was classified as noise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleTag {
    TooShort,
    Total,
    Tax,
    Payment,
    Tip,
    Tendered,
    Header,
    TaxId,
}

impl fmt::Display for RuleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTag::TooShort => write!(f, "too_short"),
            RuleTag::Total => write!(f, "total"),
            RuleTag::Tax => write!(f, "tax"),
            RuleTag::Payment => write!(f, "payment"),
            RuleTag::Tip => write!(f, "tip"),
            RuleTag::Tendered => write!(f, "tendered"),
            RuleTag::Header => write!(f, "header"),
            RuleTag::TaxId => write!(f, "tax_id"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMatch {
    /// Keyword anywhere in the line, delimited by non-alphanumerics or line edges.
    #[default]
    Contains,
    /// Line starts with the keyword.
    Leading,
}

/// One block-list rule. Rules are evaluated in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationRule {
    pub tag: RuleTag,
    #[serde(default, rename = "match")]
    pub match_type: KeywordMatch,
    pub keywords: Vec<String>,
}

impl ClassificationRule {
    fn new(tag: RuleTag, match_type: KeywordMatch, keywords: &[&str]) -> Self {
        Self {
            tag,
            match_type,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocaleProfile {
    pub name: String,
    pub rules: Vec<ClassificationRule>,
    /// Standalone tokens marking a price: currency codes, names, glyphs, price words.
    pub price_markers: Vec<String>,
    /// Words that disqualify an adjacent number from being a price.
    pub tax_keywords: Vec<String>,
    pub quantity_markers: Vec<String>,
    pub count_units: Vec<String>,
}

impl LocaleProfile {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn is_price_marker(&self, word: &str) -> bool {
        contains_word(&self.price_markers, word)
    }

    pub fn is_tax_keyword(&self, word: &str) -> bool {
        contains_word(&self.tax_keywords, word)
    }

    pub fn is_count_unit(&self, word: &str) -> bool {
        contains_word(&self.count_units, word)
    }

    fn english() -> Self {
        use KeywordMatch::{Contains, Leading};
        use RuleTag::*;
        LocaleProfile {
            name: "en".to_string(),
            rules: vec![
                ClassificationRule::new(
                    Total,
                    Contains,
                    &[
                        "subtotal", "sub-total", "sub total", "total", "grand total", "amount due",
                        "balance due", "totale", "subtotale",
                    ],
                ),
                ClassificationRule::new(
                    Tax,
                    Contains,
                    &["sales tax", "tax total", "total tax", "vat total", "vat amount"],
                ),
                ClassificationRule::new(Tax, Leading, &["tax", "vat", "gst", "hst", "pst"]),
                ClassificationRule::new(
                    Payment,
                    Contains,
                    &[
                        "visa", "mastercard", "master card", "amex", "american express", "maestro",
                        "discover", "debit", "credit card", "apple pay", "google pay", "cash",
                        "change due",
                    ],
                ),
                ClassificationRule::new(
                    Tip,
                    Contains,
                    &["tip", "tips", "gratuity", "service charge"],
                ),
                ClassificationRule::new(
                    Tendered,
                    Contains,
                    &["tendered", "paid", "payment", "amount paid"],
                ),
                ClassificationRule::new(
                    Header,
                    Contains,
                    &[
                        "receipt", "invoice", "date", "time", "cashier", "server", "table",
                        "order #", "thank you",
                    ],
                ),
                ClassificationRule::new(
                    TaxId,
                    Contains,
                    &["vat no", "vat number", "vat reg", "tax id", "ein"],
                ),
            ],
            price_markers: words(&[
                "$", "€", "£", "usd", "eur", "gbp", "dollar", "dollars", "euro", "euros", "price",
                "amount",
            ]),
            tax_keywords: words(&["tax", "vat"]),
            quantity_markers: words(&["qty", "qty:", "q", "q:"]),
            count_units: words(&["pc", "pcs", "piece", "pieces", "pk", "pack", "packs", "ea"]),
        }
    }

    fn italian_english() -> Self {
        use KeywordMatch::{Contains, Leading};
        use RuleTag::*;
        let mut profile = Self::english();
        profile.name = "it-en".to_string();
        // Italian rules sit in front of their English counterparts.
        let italian = vec![
            ClassificationRule::new(
                Total,
                Contains,
                &[
                    "totale", "subtotale", "totale complessivo", "importo", "da pagare",
                    "totale euro",
                ],
            ),
            ClassificationRule::new(
                Tax,
                Contains,
                &[
                    "iva inclusa", "iva compresa", "di cui iva", "imponibile", "imposta", "imposte",
                ],
            ),
            ClassificationRule::new(Tax, Leading, &["iva", "aliquota"]),
            ClassificationRule::new(
                Payment,
                Contains,
                &[
                    "contanti", "carta di credito", "bancomat", "pagamento elettronico",
                    "pagamento contante", "resto",
                ],
            ),
            ClassificationRule::new(Tip, Contains, &["mancia"]),
            ClassificationRule::new(Tendered, Contains, &["pagato", "contante", "ricevuto"]),
            ClassificationRule::new(
                Header,
                Contains,
                &[
                    "scontrino", "fattura", "documento commerciale", "data", "ora", "cassa",
                    "cassiere", "tavolo", "coperti", "grazie",
                ],
            ),
            ClassificationRule::new(
                TaxId,
                Contains,
                &["p.iva", "p. iva", "p.i.", "partita iva", "c.f.", "codice fiscale"],
            ),
        ];
        profile.rules = italian.into_iter().chain(profile.rules).collect();
        profile.price_markers.extend(words(&["prezzo", "euro", "eur"]));
        profile.tax_keywords.push("iva".to_string());
        profile
            .quantity_markers
            .extend(words(&["qta", "qta:", "qtà", "qtà:", "n.", "nr", "nr."]));
        profile
            .count_units
            .extend(words(&["pz", "pz.", "pezzi", "pezzo", "conf", "conf."]));
        profile
    }
}

/// Built-in profiles, selectable by name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Locale {
    #[serde(rename = "en")]
    #[default]
    English,
    #[serde(rename = "it-en")]
    ItalianEnglish,
}

impl Locale {
    pub fn profile(self) -> LocaleProfile {
        match self {
            Locale::English => LocaleProfile::english(),
            Locale::ItalianEnglish => LocaleProfile::italian_english(),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::English => write!(f, "en"),
            Locale::ItalianEnglish => write!(f, "it-en"),
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "it-en" | "it" | "italian" => Ok(Locale::ItalianEnglish),
            other => Err(ConfigError::UnknownLocale(other.to_string())),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn contains_word(list: &[String], word: &str) -> bool {
    list.iter().any(|w| w.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn locale_from_str() {
        assert_eq!(Locale::from_str("en").unwrap(), Locale::English);
        assert_eq!(Locale::from_str("IT-EN").unwrap(), Locale::ItalianEnglish);
        assert!(matches!(Locale::from_str("fr"), Err(ConfigError::UnknownLocale(_))));
    }

    #[test]
    fn italian_profile_extends_english() {
        let en = Locale::English.profile();
        let it = Locale::ItalianEnglish.profile();
        assert!(it.rules.len() > en.rules.len());
        assert!(it.is_tax_keyword("IVA"));
        assert!(!en.is_tax_keyword("iva"));
        assert!(it.is_tax_keyword("vat"));
        assert!(it.is_count_unit("pz"));
        assert!(it.is_price_marker("€"));
    }

    #[test]
    fn profile_from_toml() {
        let toml = r#"
            name = "custom"
            price_markers = ["chf"]
            tax_keywords = ["mwst"]
            quantity_markers = ["qty"]
            count_units = ["stk"]

            [[rules]]
            tag = "total"
            keywords = ["summe"]

            [[rules]]
            tag = "tax"
            match = "leading"
            keywords = ["mwst"]
        "#;
        let profile = LocaleProfile::from_toml(toml).unwrap();
        assert_eq!(profile.name, "custom");
        assert_eq!(profile.rules.len(), 2);
        assert_eq!(profile.rules[0].match_type, KeywordMatch::Contains);
        assert_eq!(profile.rules[1].match_type, KeywordMatch::Leading);
        assert!(profile.is_price_marker("CHF"));
    }

    #[test]
    fn profile_from_bad_toml() {
        assert!(matches!(
            LocaleProfile::from_toml("name = 3"),
            Err(ConfigError::Toml(_))
        ));
    }
}
