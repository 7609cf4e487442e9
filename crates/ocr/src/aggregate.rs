use divvy_core::{BillItem, Money};
use std::collections::HashMap;

use crate::name::{normalize, prettify};
use crate::types::ParsedLine;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregationKey {
    pub normalized_name: String,
    pub unit_price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationEntry {
    pub display_name: String,
    pub unit_price: Option<Money>,
    pub quantity: u32,
}

/// Merges parsed lines that share a normalized name and unit price.
///
/// The first line seen for a key fixes its display name and price; later lines only
/// add to the quantity. Output order is first-seen order of keys.
#[derive(Debug, Default)]
pub struct Aggregator {
    order: Vec<AggregationKey>,
    entries: HashMap<AggregationKey, AggregationEntry>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: ParsedLine) {
        let normalized_name = normalize(&line.name);
        if normalized_name.is_empty() {
            return;
        }
        let key = AggregationKey { normalized_name, unit_price: line.unit_price };
        match self.entries.get_mut(&key) {
            Some(entry) => entry.quantity = entry.quantity.saturating_add(line.quantity),
            None => {
                self.order.push(key.clone());
                self.entries.insert(
                    key,
                    AggregationEntry {
                        display_name: line.name,
                        unit_price: line.unit_price,
                        quantity: line.quantity,
                    },
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Emit one fresh [`BillItem`] per distinct key, in first-seen order.
    pub fn finish(mut self) -> Vec<BillItem> {
        self.order
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .map(|entry| {
                BillItem::new(
                    prettify(&entry.display_name),
                    entry.unit_price,
                    entry.quantity.max(1),
                )
            })
            .collect()
    }
}

impl Extend<ParsedLine> for Aggregator {
    fn extend<I: IntoIterator<Item = ParsedLine>>(&mut self, iter: I) {
        for line in iter {
            self.push(line);
        }
    }
}
