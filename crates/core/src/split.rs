//! Per-person totals over a committed bill.
//!
//! Each priced item contributes `price / |assigned_people|` to every person assigned
//! to it. Unpriced or unassigned items contribute nothing.

use std::collections::BTreeMap;

use super::item::{BillItem, PersonId};
use super::money::Money;

pub fn person_total(items: &[BillItem], person: PersonId) -> Money {
    items
        .iter()
        .filter(|item| item.assigned_people.contains(&person))
        .filter_map(share_of)
        .sum()
}

pub fn totals_by_person(items: &[BillItem]) -> BTreeMap<PersonId, Money> {
    let mut totals = BTreeMap::new();
    for item in items {
        let Some(share) = share_of(item) else {
            continue;
        };
        for person in &item.assigned_people {
            let entry = totals.entry(*person).or_insert_with(Money::zero);
            *entry = entry.saturating_add(share);
        }
    }
    totals
}

fn share_of(item: &BillItem) -> Option<Money> {
    item.price?.share(item.assigned_people.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(cents: Option<i64>, people: &[PersonId]) -> BillItem {
        let mut it = BillItem::new("x", cents.map(Money::from_cents), 1);
        it.assigned_people = people.iter().copied().collect();
        it
    }

    #[test]
    fn shared_item_is_divided() {
        let (a, b) = (PersonId::generate(), PersonId::generate());
        let items = vec![item(Some(1000), &[a, b]), item(Some(300), &[a])];
        assert_eq!(person_total(&items, a), Money::from_cents(800));
        assert_eq!(person_total(&items, b), Money::from_cents(500));
    }

    #[test]
    fn skips_unpriced_and_unassigned() {
        let a = PersonId::generate();
        let items = vec![item(None, &[a]), item(Some(700), &[])];
        assert!(person_total(&items, a).is_zero());
        assert!(totals_by_person(&items).is_empty());
    }

    #[test]
    fn totals_cover_every_assigned_person() {
        let (a, b, c) = (PersonId::generate(), PersonId::generate(), PersonId::generate());
        let items = vec![item(Some(900), &[a, b, c]), item(Some(200), &[c])];
        let totals = totals_by_person(&items);
        assert_eq!(totals.len(), 3);
        assert_eq!(totals[&a], Money::from_cents(300));
        assert_eq!(totals[&c], Money::from_cents(500));
    }

    #[test]
    fn huge_amounts_clamp_instead_of_panicking() {
        let a = PersonId::generate();
        let mut big = item(None, &[a]);
        big.price = Some(Money::new(rust_decimal::Decimal::MAX));
        let items = vec![big.clone(), big];
        assert_eq!(person_total(&items, a), Money::new(rust_decimal::Decimal::MAX));
        assert_eq!(totals_by_person(&items)[&a], Money::new(rust_decimal::Decimal::MAX));
    }
}
