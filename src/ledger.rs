//! Helpers shared by the append-only ledgers.
//!
//! Both the price ledger (`product_prices`) and the order status ledger
//! (`order_transactions`) resolve their "current" row the same way: the row
//! for which no other row with the same key is strictly later by
//! `(created_at, id)`. The SQL below is the only place that rule is spelled out.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Anti-join that rules out every ledger row which has a later sibling.
///
/// `current` is the alias of the candidate row, `later` the alias used for the
/// probing self-join. Pair it with [`LatestRow::is_latest`] in the `WHERE` clause.
#[derive(Debug, Clone, Copy)]
pub struct LatestRow {
    pub table: &'static str,
    pub key: &'static str,
    pub current: &'static str,
    pub later: &'static str,
}

impl LatestRow {
    pub const fn new(
        table: &'static str,
        key: &'static str,
        current: &'static str,
        later: &'static str,
    ) -> Self {
        Self {
            table,
            key,
            current,
            later,
        }
    }

    pub fn join(&self) -> String {
        let Self {
            table,
            key,
            current,
            later,
        } = self;
        format!(
            "LEFT JOIN {table} {later} ON ({later}.{key} = {current}.{key} AND \
             ({current}.created_at < {later}.created_at OR \
             ({current}.created_at = {later}.created_at AND {current}.id < {later}.id)))"
        )
    }

    pub fn is_latest(&self) -> String {
        format!("{}.id IS NULL", self.later)
    }
}

/// Current price of a product.
pub const CURRENT_PRICE: LatestRow = LatestRow::new("product_prices", "product_id", "pp1", "pp2");

/// Current status of an order.
pub const CURRENT_STATUS: LatestRow =
    LatestRow::new("order_transactions", "order_id", "ot1", "ot2");

/// Position of a ledger row in its total order.
pub trait LedgerEntry {
    fn created_at(&self) -> DateTime<Utc>;
    fn id(&self) -> Uuid;
}

/// In-memory counterpart of the anti-join: the entry no other entry follows.
pub fn latest<T: LedgerEntry>(entries: &[T]) -> Option<&T> {
    entries
        .iter()
        .max_by(|a, b| (a.created_at(), a.id()).cmp(&(b.created_at(), b.id())))
}

impl LedgerEntry for crate::models::ProductPrice {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

impl LedgerEntry for crate::models::OrderTransaction {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Row(DateTime<Utc>, Uuid);

    impl LedgerEntry for Row {
        fn created_at(&self) -> DateTime<Utc> {
            self.0
        }

        fn id(&self) -> Uuid {
            self.1
        }
    }

    #[test]
    fn price_and_status_share_the_same_predicate_shape() {
        let price = CURRENT_PRICE.join();
        let status = CURRENT_STATUS.join();
        assert_eq!(
            price.replace("product_prices", "T").replace("product_id", "K").replace("pp", "a"),
            status.replace("order_transactions", "T").replace("order_id", "K").replace("ot", "a"),
        );
        assert_eq!(CURRENT_PRICE.is_latest(), "pp2.id IS NULL");
    }

    #[test]
    fn join_compares_timestamp_then_id() {
        let sql = CURRENT_STATUS.join();
        assert!(sql.starts_with("LEFT JOIN order_transactions ot2"));
        assert!(sql.contains("ot1.created_at < ot2.created_at"));
        assert!(sql.contains("ot1.created_at = ot2.created_at AND ot1.id < ot2.id"));
    }

    #[test]
    fn latest_breaks_timestamp_ties_by_id() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let rows = vec![Row(at, high), Row(at, low)];
        assert_eq!(latest(&rows).map(|r| r.1), Some(high));
    }

    #[test]
    fn latest_prefers_later_timestamp_over_id() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let rows = vec![Row(early, Uuid::from_u128(u128::MAX)), Row(late, Uuid::nil())];
        assert_eq!(latest(&rows).map(|r| r.1), Some(Uuid::nil()));
        assert!(latest::<Row>(&[]).is_none());
    }

    #[test]
    fn v7_ids_follow_creation_order() {
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        assert!(first < second);
    }
}
