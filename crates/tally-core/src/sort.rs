//! # Sorting
//!
//! Tagged sort keys for the dashboard's list screens, each mapped to a typed
//! comparator. Every sort is stable: equal keys keep insertion order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::aggregate::{ClientView, ProductView};
use crate::types::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClientSortKey {
    #[default]
    Number,
    Name,
    Orders,
    TotalSpent,
    Balance,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortKey {
    #[default]
    Name,
    Stock,
    UnitCost,
    RetailValue,
    LastOrderedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortKey {
    #[default]
    Date,
    Total,
    Balance,
    Status,
}

/// Case-insensitive name comparison.
fn by_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

pub fn sort_clients(views: &mut [ClientView], key: ClientSortKey, direction: SortDirection) {
    views.sort_by(|a, b| {
        let ordering = match key {
            ClientSortKey::Number => a.client.number.cmp(&b.client.number),
            ClientSortKey::Name => by_name(&a.client.name, &b.client.name),
            ClientSortKey::Orders => a.stats.orders.cmp(&b.stats.orders),
            ClientSortKey::TotalSpent => a.stats.total_spent.cmp(&b.stats.total_spent),
            ClientSortKey::Balance => a.stats.balance.cmp(&b.stats.balance),
            ClientSortKey::CreatedAt => a.client.created_at.cmp(&b.client.created_at),
        };
        direction.apply(ordering)
    });
}

pub fn sort_products(views: &mut [ProductView], key: ProductSortKey, direction: SortDirection) {
    views.sort_by(|a, b| {
        let ordering = match key {
            ProductSortKey::Name => by_name(&a.product.name, &b.product.name),
            ProductSortKey::Stock => a.product.stock.cmp(&b.product.stock),
            ProductSortKey::UnitCost => a.product.unit_cost.cmp(&b.product.unit_cost),
            ProductSortKey::RetailValue => a.retail_value.cmp(&b.retail_value),
            // never-ordered products sort first ascending
            ProductSortKey::LastOrderedAt => a.product.last_ordered_at.cmp(&b.product.last_ordered_at),
        };
        direction.apply(ordering)
    });
}

pub fn sort_orders(orders: &mut [Order], key: OrderSortKey, direction: SortDirection) {
    orders.sort_by(|a, b| {
        let ordering = match key {
            OrderSortKey::Date => a.date.cmp(&b.date),
            OrderSortKey::Total => a.total.cmp(&b.total),
            OrderSortKey::Balance => a.balance().cmp(&b.balance()),
            OrderSortKey::Status => status_rank(a).cmp(&status_rank(b)),
        };
        direction.apply(ordering)
    });
}

fn status_rank(order: &Order) -> u8 {
    match order.status {
        OrderStatus::Draft => 0,
        OrderStatus::Unpaid => 1,
        OrderStatus::Completed => 2,
    }
}

/// Stable descending sort by a key; used for every "top N" ranking.
pub fn stable_sort_desc_by_key<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ClientStats;
    use crate::money::Money;
    use crate::types::{Adjustment, Client};
    use chrono::{TimeZone, Utc};

    fn view(number: u32, name: &str, spent: i64) -> ClientView {
        ClientView {
            client: Client {
                id: number.to_string(),
                number,
                name: name.to_string(),
                phone: None,
                email: None,
                address: None,
                notes: None,
                created_at: Utc.with_ymd_and_hms(2024, 1, number, 0, 0, 0).unwrap(),
            },
            stats: ClientStats {
                total_spent: Money::from_cents(spent),
                ..Default::default()
            },
        }
    }

    fn numbers(views: &[ClientView]) -> Vec<u32> {
        views.iter().map(|v| v.client.number).collect()
    }

    #[test]
    fn test_sort_clients_by_name_ignores_case() {
        let mut views = vec![view(1, "bob", 0), view(2, "Alice", 0), view(3, "carol", 0)];
        sort_clients(&mut views, ClientSortKey::Name, SortDirection::Ascending);
        assert_eq!(numbers(&views), vec![2, 1, 3]);
    }

    #[test]
    fn test_sort_clients_descending_is_stable() {
        let mut views = vec![view(1, "a", 100), view(2, "b", 500), view(3, "c", 100)];
        sort_clients(&mut views, ClientSortKey::TotalSpent, SortDirection::Descending);
        assert_eq!(numbers(&views), vec![2, 1, 3]);
    }

    #[test]
    fn test_sort_orders_by_status() {
        let now = Utc::now();
        let order = |id: &str, status: OrderStatus| Order {
            id: id.to_string(),
            client_id: "c".to_string(),
            items: vec![],
            total: Money::zero(),
            status,
            date: now,
            notes: None,
            amount_paid: Money::zero(),
            payment_methods: vec![],
            fee: Adjustment::none(),
            discount: Adjustment::none(),
            created_at: now,
            updated_at: now,
        };

        let mut orders = vec![
            order("a", OrderStatus::Completed),
            order("b", OrderStatus::Draft),
            order("c", OrderStatus::Unpaid),
        ];
        sort_orders(&mut orders, OrderSortKey::Status, SortDirection::Ascending);
        let ids: Vec<_> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_stable_sort_desc_by_key() {
        let mut pairs = vec![("x", 1), ("y", 3), ("z", 1)];
        stable_sort_desc_by_key(&mut pairs, |p| p.1);
        assert_eq!(pairs, vec![("y", 3), ("x", 1), ("z", 1)]);
    }
}
