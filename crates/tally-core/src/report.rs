//! # Reporting Engine
//!
//! Date-windowed financial rollups built on the same primitives as the
//! aggregation engine.
//!
//! ## Report Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DateRange (inclusive, either end open)                                 │
//! │       │                                                                 │
//! │       ├──► FinancialSummary                                             │
//! │       │      revenue    = Σ order.total                                 │
//! │       │      cost       = Σ item.quantity × product.unit_cost           │
//! │       │      profit     = revenue − cost                                │
//! │       │      net_income = profit − Σ expense.amount                     │
//! │       │                                                                 │
//! │       ├──► ProductProfit per product (units, sales, cost, margin %)     │
//! │       ├──► top-N clients by revenue, top-N products by sales            │
//! │       ├──► monthly series, "YYYY-MM" buckets, chronological             │
//! │       └──► expense breakdown by category                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Item cost uses the product's *current* unit cost; an item whose product
//! no longer exists costs nothing. Orders of every status are counted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Quantity};
use crate::snapshot::Snapshot;
use crate::sort::stable_sort_desc_by_key;
use crate::types::{Expense, Order, OrderItem};
use crate::UNCATEGORIZED;

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive date window. `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Every date.
    pub fn all() -> Self {
        DateRange::default()
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        DateRange {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

// =============================================================================
// Report Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialSummary {
    pub orders: usize,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    pub expenses: Money,
    pub net_income: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductProfit {
    pub product_id: String,
    pub name: String,
    pub units_sold: Quantity,
    pub total_sales: Money,
    pub total_cost: Money,
    pub net_profit: Money,
    /// Percentage of sales kept as profit; 0 when nothing was sold.
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientRevenue {
    pub client_id: String,
    pub name: String,
    pub orders: usize,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlyPoint {
    /// `YYYY-MM`.
    pub month: String,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    pub expenses: Money,
    pub net_income: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotal {
    pub category: String,
    pub count: usize,
    pub total: Money,
}

/// Everything the reports screen shows for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Report {
    pub range: DateRange,
    pub summary: FinancialSummary,
    pub products: Vec<ProductProfit>,
    pub top_clients: Vec<ClientRevenue>,
    pub top_products: Vec<ProductProfit>,
    pub monthly: Vec<MonthlyPoint>,
    pub expense_breakdown: Vec<CategoryTotal>,
}

// =============================================================================
// Primitives
// =============================================================================

/// Cost of one line at the product's current unit cost.
pub fn item_cost(snapshot: &Snapshot, item: &OrderItem) -> Money {
    snapshot
        .product(&item.product_id)
        .map(|product| product.unit_cost.scale(item.quantity))
        .unwrap_or_default()
}

pub fn order_cost(snapshot: &Snapshot, order: &Order) -> Money {
    order.items.iter().map(|item| item_cost(snapshot, item)).sum()
}

fn orders_in<'a>(snapshot: &'a Snapshot, range: &'a DateRange) -> impl Iterator<Item = &'a Order> + 'a {
    snapshot.orders.iter().filter(move |o| range.contains(o.date))
}

fn expenses_in<'a>(
    snapshot: &'a Snapshot,
    range: &'a DateRange,
) -> impl Iterator<Item = &'a Expense> + 'a {
    snapshot.expenses.iter().filter(move |e| range.contains(e.date))
}

fn margin(net_profit: Money, total_sales: Money) -> f64 {
    if total_sales.is_zero() {
        return 0.0;
    }
    net_profit.cents() as f64 / total_sales.cents() as f64 * 100.0
}

// =============================================================================
// Rollups
// =============================================================================

pub fn summary(snapshot: &Snapshot, range: &DateRange) -> FinancialSummary {
    let mut summary = FinancialSummary::default();

    for order in orders_in(snapshot, range) {
        summary.orders += 1;
        summary.revenue += order.total;
        summary.cost += order_cost(snapshot, order);
    }
    summary.expenses = expenses_in(snapshot, range).map(|e| e.amount).sum();
    summary.profit = summary.revenue - summary.cost;
    summary.net_income = summary.profit - summary.expenses;

    summary
}

/// Per-product profitability, in catalogue order, for products sold in the
/// window.
pub fn product_profits(snapshot: &Snapshot, range: &DateRange) -> Vec<ProductProfit> {
    let mut rows: Vec<ProductProfit> = snapshot
        .products
        .iter()
        .map(|p| ProductProfit {
            product_id: p.id.clone(),
            name: p.name.clone(),
            units_sold: Quantity::zero(),
            total_sales: Money::zero(),
            total_cost: Money::zero(),
            net_profit: Money::zero(),
            margin: 0.0,
        })
        .collect();

    for item in orders_in(snapshot, range).flat_map(|o| o.items.iter()) {
        let Some(row) = rows.iter_mut().find(|r| r.product_id == item.product_id) else {
            continue;
        };
        row.units_sold += item.quantity;
        row.total_sales += item.price;
        row.total_cost += item_cost(snapshot, item);
    }

    rows.retain(|r| r.units_sold.is_positive());
    for row in &mut rows {
        row.net_profit = row.total_sales - row.total_cost;
        row.margin = margin(row.net_profit, row.total_sales);
    }
    rows
}

/// Clients ranked by revenue in the window. Ties keep client order.
pub fn top_clients(snapshot: &Snapshot, range: &DateRange, n: usize) -> Vec<ClientRevenue> {
    let mut rows: Vec<ClientRevenue> = snapshot
        .clients
        .iter()
        .filter_map(|client| {
            let orders: Vec<&Order> = orders_in(snapshot, range)
                .filter(|o| o.client_id == client.id)
                .collect();
            if orders.is_empty() {
                return None;
            }
            Some(ClientRevenue {
                client_id: client.id.clone(),
                name: client.name.clone(),
                orders: orders.len(),
                revenue: orders.iter().map(|o| o.total).sum(),
            })
        })
        .collect();

    stable_sort_desc_by_key(&mut rows, |r| r.revenue);
    rows.truncate(n);
    rows
}

/// Products ranked by sales. Ties keep catalogue order.
pub fn top_products(profits: &[ProductProfit], n: usize) -> Vec<ProductProfit> {
    let mut rows = profits.to_vec();
    stable_sort_desc_by_key(&mut rows, |r| r.total_sales);
    rows.truncate(n);
    rows
}

pub fn monthly(snapshot: &Snapshot, range: &DateRange) -> Vec<MonthlyPoint> {
    let mut buckets: BTreeMap<String, MonthlyPoint> = BTreeMap::new();

    fn bucket<'m>(buckets: &'m mut BTreeMap<String, MonthlyPoint>, date: DateTime<Utc>) -> &'m mut MonthlyPoint {
        let month = date.format("%Y-%m").to_string();
        buckets.entry(month.clone()).or_insert_with(|| MonthlyPoint {
            month,
            revenue: Money::zero(),
            cost: Money::zero(),
            profit: Money::zero(),
            expenses: Money::zero(),
            net_income: Money::zero(),
        })
    }

    for order in orders_in(snapshot, range) {
        let point = bucket(&mut buckets, order.date);
        point.revenue += order.total;
        point.cost += order_cost(snapshot, order);
    }
    for expense in expenses_in(snapshot, range) {
        bucket(&mut buckets, expense.date).expenses += expense.amount;
    }

    buckets
        .into_values()
        .map(|mut point| {
            point.profit = point.revenue - point.cost;
            point.net_income = point.profit - point.expenses;
            point
        })
        .collect()
}

/// Expenses by category, largest first. Ties keep first-seen order.
pub fn expense_breakdown(snapshot: &Snapshot, range: &DateRange) -> Vec<CategoryTotal> {
    let mut rows: Vec<CategoryTotal> = Vec::new();

    for expense in expenses_in(snapshot, range) {
        let category = expense
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);

        match rows.iter_mut().find(|r| r.category == category) {
            Some(row) => {
                row.count += 1;
                row.total += expense.amount;
            }
            None => rows.push(CategoryTotal {
                category: category.to_string(),
                count: 1,
                total: expense.amount,
            }),
        }
    }

    stable_sort_desc_by_key(&mut rows, |r| r.total);
    rows
}

/// Builds the full report for `range`.
pub fn build(snapshot: &Snapshot, range: DateRange, top_n: usize) -> Report {
    let products = product_profits(snapshot, &range);

    Report {
        summary: summary(snapshot, &range),
        top_clients: top_clients(snapshot, &range, top_n),
        top_products: top_products(&products, top_n),
        monthly: monthly(snapshot, &range),
        expense_breakdown: expense_breakdown(snapshot, &range),
        products,
        range,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Adjustment, Client, OrderStatus, Product, UnitKind};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn product(id: &str, unit_cost: i64) -> Product {
        Product {
            id: id.to_string(),
            name: id.to_uppercase(),
            unit: UnitKind::Count,
            stock: Quantity::from_units(100),
            unit_cost: Money::from_cents(unit_cost),
            min_increment: Quantity::from_units(1),
            tiers: vec![],
            last_ordered_at: None,
            is_active: true,
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        }
    }

    fn client(id: &str) -> Client {
        Client {
            id: id.to_string(),
            number: 1,
            name: id.to_uppercase(),
            phone: None,
            email: None,
            address: None,
            notes: None,
            created_at: at(2024, 1, 1),
        }
    }

    fn order(id: &str, client_id: &str, date: DateTime<Utc>, lines: &[(&str, i64, i64)]) -> Order {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|(pid, units, price)| OrderItem {
                product_id: pid.to_string(),
                quantity: Quantity::from_units(*units),
                price: Money::from_cents(*price),
                tier_label: None,
            })
            .collect();
        let total = crate::totals::subtotal(&items);
        Order {
            id: id.to_string(),
            client_id: client_id.to_string(),
            items,
            total,
            status: OrderStatus::Completed,
            date,
            notes: None,
            amount_paid: total,
            payment_methods: vec![],
            fee: Adjustment::none(),
            discount: Adjustment::none(),
            created_at: date,
            updated_at: date,
        }
    }

    fn expense(date: DateTime<Utc>, cents: i64, category: Option<&str>) -> Expense {
        Expense {
            id: format!("e{}", cents),
            date,
            description: "x".to_string(),
            amount: Money::from_cents(cents),
            category: category.map(str::to_string),
            created_at: date,
        }
    }

    #[test]
    fn test_profit_without_expenses() {
        // total 100, item cost 60 → profit 40
        let snapshot = Snapshot {
            products: vec![product("p", 6000)],
            clients: vec![client("c")],
            orders: vec![order("o", "c", at(2024, 3, 1), &[("p", 1, 10000)])],
            ..Default::default()
        };

        let s = summary(&snapshot, &DateRange::all());
        assert_eq!(s.revenue, Money::from_cents(10000));
        assert_eq!(s.cost, Money::from_cents(6000));
        assert_eq!(s.profit, Money::from_cents(4000));
        assert_eq!(s.net_income, Money::from_cents(4000));
    }

    #[test]
    fn test_missing_product_costs_nothing() {
        let snapshot = Snapshot {
            orders: vec![order("o", "c", at(2024, 3, 1), &[("gone", 2, 500)])],
            ..Default::default()
        };
        let s = summary(&snapshot, &DateRange::all());
        assert_eq!(s.cost, Money::zero());
        assert_eq!(s.profit, Money::from_cents(500));
    }

    #[test]
    fn test_range_is_inclusive() {
        let snapshot = Snapshot {
            orders: vec![
                order("a", "c", at(2024, 1, 31), &[("p", 1, 100)]),
                order("b", "c", at(2024, 2, 15), &[("p", 1, 200)]),
                order("c", "c", at(2024, 3, 1), &[("p", 1, 400)]),
            ],
            expenses: vec![expense(at(2024, 2, 15), 50, None)],
            ..Default::default()
        };

        let range = DateRange::between(at(2024, 1, 31), at(2024, 2, 15));
        let s = summary(&snapshot, &range);
        assert_eq!(s.orders, 2);
        assert_eq!(s.revenue, Money::from_cents(300));
        assert_eq!(s.net_income, Money::from_cents(250));
    }

    #[test]
    fn test_product_profits_and_margin() {
        let snapshot = Snapshot {
            products: vec![product("a", 100), product("b", 100), product("idle", 100)],
            orders: vec![
                order("o1", "c", at(2024, 3, 1), &[("a", 2, 1000), ("b", 1, 100)]),
                order("o2", "c", at(2024, 3, 2), &[("a", 1, 500)]),
            ],
            ..Default::default()
        };

        let rows = product_profits(&snapshot, &DateRange::all());
        assert_eq!(rows.len(), 2);

        let a = &rows[0];
        assert_eq!(a.units_sold, Quantity::from_units(3));
        assert_eq!(a.total_sales, Money::from_cents(1500));
        assert_eq!(a.total_cost, Money::from_cents(300));
        assert_eq!(a.net_profit, Money::from_cents(1200));
        assert!((a.margin - 80.0).abs() < 1e-9);

        let b = &rows[1];
        assert_eq!(b.net_profit, Money::zero());
        assert_eq!(b.margin, 0.0);
    }

    #[test]
    fn test_top_clients_ties_keep_insertion_order() {
        let snapshot = Snapshot {
            clients: vec![client("x"), client("y"), client("z")],
            orders: vec![
                order("1", "x", at(2024, 3, 1), &[("p", 1, 500)]),
                order("2", "y", at(2024, 3, 1), &[("p", 1, 900)]),
                order("3", "z", at(2024, 3, 1), &[("p", 1, 500)]),
            ],
            ..Default::default()
        };

        let top = top_clients(&snapshot, &DateRange::all(), 3);
        let ids: Vec<_> = top.iter().map(|r| r.client_id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x", "z"]);

        assert_eq!(top_clients(&snapshot, &DateRange::all(), 1).len(), 1);
    }

    #[test]
    fn test_monthly_series_is_chronological() {
        let snapshot = Snapshot {
            products: vec![product("p", 100)],
            orders: vec![
                order("b", "c", at(2024, 2, 10), &[("p", 1, 1000)]),
                order("a", "c", at(2023, 12, 5), &[("p", 2, 3000)]),
            ],
            expenses: vec![expense(at(2024, 2, 1), 300, Some("Rent"))],
            ..Default::default()
        };

        let series = monthly(&snapshot, &DateRange::all());
        let months: Vec<_> = series.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2023-12", "2024-02"]);

        assert_eq!(series[0].profit, Money::from_cents(2800));
        assert_eq!(series[1].expenses, Money::from_cents(300));
        assert_eq!(series[1].net_income, Money::from_cents(600));
    }

    #[test]
    fn test_expense_breakdown_uncategorized() {
        let snapshot = Snapshot {
            expenses: vec![
                expense(at(2024, 1, 1), 100, None),
                expense(at(2024, 1, 2), 700, Some("Inventory")),
                expense(at(2024, 1, 3), 200, Some("  ")),
            ],
            ..Default::default()
        };

        let rows = expense_breakdown(&snapshot, &DateRange::all());
        assert_eq!(rows[0].category, "Inventory");
        assert_eq!(rows[1].category, UNCATEGORIZED);
        assert_eq!(rows[1].count, 2);
        assert_eq!(rows[1].total, Money::from_cents(300));
    }

    #[test]
    fn test_build_report() {
        let snapshot = Snapshot {
            products: vec![product("p", 100)],
            clients: vec![client("c")],
            orders: vec![order("o", "c", at(2024, 3, 1), &[("p", 1, 1000)])],
            ..Default::default()
        };

        let report = build(&snapshot, DateRange::all(), 5);
        assert_eq!(report.summary.orders, 1);
        assert_eq!(report.top_clients.len(), 1);
        assert_eq!(report.top_products.len(), 1);
        assert_eq!(report.monthly.len(), 1);
    }
}
