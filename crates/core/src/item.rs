use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn generate() -> Self {
        ItemId(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a person taking part in the split. Managed by the UI, opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonId(pub Uuid);

impl PersonId {
    pub fn generate() -> Self {
        PersonId(Uuid::new_v4())
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recognized line of a bill, after deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: ItemId,
    pub name: String,
    /// Unit price; `None` when the line carried no recognizable amount.
    pub price: Option<Money>,
    /// Always at least 1.
    pub quantity: u32,
    pub is_selected: bool,
    pub assigned_people: BTreeSet<PersonId>,
}

impl BillItem {
    /// Fresh item with a new id, selected and unassigned.
    pub fn new(name: impl Into<String>, price: Option<Money>, quantity: u32) -> Self {
        BillItem {
            id: ItemId::generate(),
            name: name.into(),
            price,
            quantity: quantity.max(1),
            is_selected: true,
            assigned_people: BTreeSet::new(),
        }
    }

    /// `price * quantity`, when priced and representable.
    pub fn line_total(&self) -> Option<Money> {
        self.price?.checked_mul(self.quantity)
    }
}
