//! Turning priced lines into per-store orders.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bookstore_catalog::validate_quantity;
use bookstore_core::{DomainError, DomainResult, Isbn, ParticipantId, Price, money};

use crate::order::OrderStatus;

/// A line whose price has been read from the catalog inside the current unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub isbn: Isbn,
    pub quantity: u32,
    pub unit_price: Price,
    pub store_id: ParticipantId,
}

/// Lines belonging to one store, destined to become one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreGroup {
    pub store_id: ParticipantId,
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

/// Partition lines by store, keeping the order in which stores first appear.
///
/// Fails when a group's total does not fit an order.
pub fn group_by_store(lines: Vec<PricedLine>) -> DomainResult<Vec<StoreGroup>> {
    let mut groups: Vec<StoreGroup> = Vec::new();
    for line in lines {
        match groups.iter_mut().find(|g| g.store_id == line.store_id) {
            Some(group) => group.lines.push(line),
            None => groups.push(StoreGroup {
                store_id: line.store_id,
                lines: vec![line],
                total: Decimal::ZERO,
            }),
        }
    }
    for group in &mut groups {
        group.total = money::total(group.lines.iter().map(|l| (l.unit_price, l.quantity)))?;
    }
    Ok(groups)
}

/// Per-book stock decrements for `lines`, sorted by ISBN with repeated books
/// merged. Row locks are taken in this order.
pub fn stock_moves<'a, I>(lines: I) -> DomainResult<Vec<(Isbn, u32)>>
where
    I: IntoIterator<Item = &'a PricedLine>,
{
    let mut moves: BTreeMap<Isbn, u32> = BTreeMap::new();
    for line in lines {
        let quantity = moves.entry(line.isbn.clone()).or_insert(0);
        *quantity = quantity
            .checked_add(line.quantity)
            .ok_or_else(|| DomainError::validation(format!("quantity for book {} is too large", line.isbn)))?;
    }
    Ok(moves.into_iter().collect())
}

/// Order row about to be inserted, with its detail lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub buyer_id: ParticipantId,
    pub store_id: ParticipantId,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub lines: Vec<PricedLine>,
}

impl NewOrder {
    pub fn pending(buyer_id: ParticipantId, group: StoreGroup, order_date: NaiveDate) -> Self {
        Self {
            buyer_id,
            store_id: group.store_id,
            total_price: group.total,
            status: OrderStatus::Pending,
            order_date,
            lines: group.lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(alias = "book_isbn")]
    pub isbn: Isbn,
    pub quantity: u32,
}

/// Direct order against a single store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub store_id: ParticipantId,
    pub items: Vec<OrderItem>,
}

impl OrderRequest {
    pub fn validated(self) -> DomainResult<Self> {
        if self.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        for item in &self.items {
            validate_quantity(item.quantity)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use proptest::prelude::*;

    fn line(isbn: &str, store: i64, qty: u32, price: &str) -> PricedLine {
        PricedLine {
            isbn: Isbn::parse(isbn).unwrap(),
            quantity: qty,
            unit_price: Price::new(Decimal::from_str(price).unwrap()).unwrap(),
            store_id: ParticipantId::new(store),
        }
    }

    #[test]
    fn groups_two_stores_in_first_seen_order() {
        let groups = group_by_store(vec![
            line("b1", 2, 1, "10.00"),
            line("a1", 1, 2, "5.25"),
            line("b2", 2, 3, "1.10"),
        ])
        .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].store_id, ParticipantId::new(2));
        assert_eq!(groups[0].lines.len(), 2);
        assert_eq!(groups[0].total, Decimal::from_str("13.30").unwrap());
        assert_eq!(groups[1].store_id, ParticipantId::new(1));
        assert_eq!(groups[1].total, Decimal::from_str("10.50").unwrap());
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_store(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn oversized_group_total_is_a_validation_error() {
        let err = group_by_store(vec![
            line("a1", 1, 60, "99999999.99"),
            line("a2", 1, 60, "99999999.99"),
        ])
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn stock_moves_follow_isbn_order_whatever_the_cart_order() {
        let forward = [line("a1", 1, 1, "1.00"), line("b1", 2, 2, "1.00")];
        let backward = [line("b1", 2, 2, "1.00"), line("a1", 1, 1, "1.00")];

        let expected = vec![(Isbn::parse("a1").unwrap(), 1), (Isbn::parse("b1").unwrap(), 2)];
        assert_eq!(stock_moves(&forward).unwrap(), expected);
        assert_eq!(stock_moves(&backward).unwrap(), expected);
    }

    #[test]
    fn stock_moves_merge_repeated_books() {
        let lines = [line("z9", 1, 2, "1.00"), line("a1", 1, 1, "1.00"), line("z9", 1, 3, "1.00")];
        let moves = stock_moves(&lines).unwrap();
        assert_eq!(moves, vec![(Isbn::parse("a1").unwrap(), 1), (Isbn::parse("z9").unwrap(), 5)]);

        let huge = [line("a1", 1, u32::MAX, "1.00"), line("a1", 1, 1, "1.00")];
        assert!(stock_moves(&huge).is_err());
    }

    #[test]
    fn order_request_validation() {
        let empty = OrderRequest {
            store_id: ParticipantId::new(1),
            items: vec![],
        };
        assert!(empty.validated().is_err());

        let zero = OrderRequest {
            store_id: ParticipantId::new(1),
            items: vec![OrderItem {
                isbn: Isbn::parse("x").unwrap(),
                quantity: 0,
            }],
        };
        assert!(zero.validated().is_err());
    }

    #[test]
    fn order_item_accepts_book_isbn_alias() {
        let item: OrderItem =
            serde_json::from_value(serde_json::json!({ "book_isbn": "123", "quantity": 2 })).unwrap();
        assert_eq!(item.isbn.as_str(), "123");
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn grouping_preserves_lines_and_totals(
            raw in prop::collection::vec((1i64..5, 1u32..20, 0i64..100_000), 0..30)
        ) {
            let lines: Vec<PricedLine> = raw
                .iter()
                .enumerate()
                .map(|(i, (store, qty, cents))| PricedLine {
                    isbn: Isbn::parse(format!("isbn-{i}")).unwrap(),
                    quantity: *qty,
                    unit_price: Price::new(Decimal::new(*cents, 2)).unwrap(),
                    store_id: ParticipantId::new(*store),
                })
                .collect();

            let groups = group_by_store(lines.clone()).unwrap();

            // Every line lands in exactly one group, stores are unique.
            let total_lines: usize = groups.iter().map(|g| g.lines.len()).sum();
            prop_assert_eq!(total_lines, lines.len());
            for (i, g) in groups.iter().enumerate() {
                prop_assert!(g.lines.iter().all(|l| l.store_id == g.store_id));
                prop_assert!(groups[i + 1..].iter().all(|o| o.store_id != g.store_id));
            }

            // Group order follows first appearance.
            let mut first_seen: Vec<ParticipantId> = Vec::new();
            for l in &lines {
                if !first_seen.contains(&l.store_id) {
                    first_seen.push(l.store_id);
                }
            }
            let group_order: Vec<ParticipantId> = groups.iter().map(|g| g.store_id).collect();
            prop_assert_eq!(group_order, first_seen);

            // Grand total is exact.
            let grand: Decimal = groups.iter().map(|g| g.total).sum();
            let expected_cents: i64 = raw.iter().map(|(_, q, c)| c * i64::from(*q)).sum();
            prop_assert_eq!(grand, Decimal::new(expected_cents, 2));
        }
    }
}
