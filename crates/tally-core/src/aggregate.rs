//! # Aggregation Engine
//!
//! Per-client and per-product statistics, folded from a borrowed snapshot on
//! every read. Nothing here is stored, so nothing here can go stale.
//!
//! ```text
//! ClientStats                       ProductValuation
//! ─────────────────────────────     ───────────────────────────────────────
//! orders          = count           retail = stock × tier.price / tier.qty
//! total_spent     = Σ total                  (smallest positive tier)
//! total_paid      = Σ amount_paid   cost   = stock × unit_cost
//! balance         = spent − paid
//! total_discounts = Σ discount
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::snapshot::Snapshot;
use crate::types::{Client, Order, Product};

// =============================================================================
// Client Statistics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientStats {
    pub orders: usize,
    pub total_spent: Money,
    pub total_paid: Money,
    /// Amount still owed; negative when the client holds credit.
    pub balance: Money,
    pub total_discounts: Money,
}

/// Folds a client's orders into statistics.
pub fn client_stats<'a>(orders: impl IntoIterator<Item = &'a Order>) -> ClientStats {
    let mut stats = orders
        .into_iter()
        .fold(ClientStats::default(), |mut acc, order| {
            acc.orders += 1;
            acc.total_spent += order.total;
            acc.total_paid += order.amount_paid;
            acc.total_discounts += order.discount.amount;
            acc
        });
    stats.balance = stats.total_spent - stats.total_paid;
    stats
}

/// A client with its derived statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientView {
    pub client: Client,
    pub stats: ClientStats,
}

/// Every client with fresh statistics, in insertion order.
pub fn client_views(snapshot: &Snapshot) -> Vec<ClientView> {
    snapshot
        .clients
        .iter()
        .map(|client| ClientView {
            client: client.clone(),
            stats: client_stats(snapshot.orders_for(&client.id)),
        })
        .collect()
}

pub fn client_view(snapshot: &Snapshot, client_id: &str) -> Option<ClientView> {
    snapshot.client(client_id).map(|client| ClientView {
        client: client.clone(),
        stats: client_stats(snapshot.orders_for(&client.id)),
    })
}

// =============================================================================
// Product Valuation
// =============================================================================

/// Stock valued at the base tier's price. Zero with no stock or no usable tier.
pub fn retail_value(product: &Product) -> Money {
    if !product.stock.is_positive() {
        return Money::zero();
    }
    match product.base_tier() {
        Some(tier) => tier.price.pro_rata(product.stock, tier.quantity),
        None => Money::zero(),
    }
}

/// Stock valued at weighted-average cost.
pub fn inventory_cost(product: &Product) -> Money {
    product.unit_cost.scale(product.stock)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductView {
    pub product: Product,
    pub retail_value: Money,
    pub inventory_cost: Money,
}

impl ProductView {
    pub fn of(product: &Product) -> Self {
        ProductView {
            product: product.clone(),
            retail_value: retail_value(product),
            inventory_cost: inventory_cost(product),
        }
    }
}

/// Totals across the whole catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventorySummary {
    pub products: Vec<ProductView>,
    pub total_retail_value: Money,
    pub total_cost: Money,
    /// Products with zero stock.
    pub out_of_stock: usize,
}

pub fn inventory(snapshot: &Snapshot) -> InventorySummary {
    let products: Vec<ProductView> = snapshot.products.iter().map(ProductView::of).collect();

    InventorySummary {
        total_retail_value: products.iter().map(|v| v.retail_value).sum(),
        total_cost: products.iter().map(|v| v.inventory_cost).sum(),
        out_of_stock: products
            .iter()
            .filter(|v| !v.product.stock.is_positive())
            .count(),
        products,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
