//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │     Client      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  stock          │◄──│  items[]        │──►│  number (#12)   │       │
//! │  │  unit_cost      │   │  total (derived)│   │  (stats derived)│       │
//! │  │  tiers[]        │   │  amount_paid    │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    Expense      │   │    LogEntry     │   append-only history       │
//! │  │  amount > 0     │   │  action + JSON  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Values Are Not Fields
//! A client has no `balance` or `total_spent` field. Those are folds over the
//! client's orders computed by [`crate::aggregate`] on every read, so they
//! cannot drift from the order history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Quantity};

// =============================================================================
// Product
// =============================================================================

/// What a product's quantities measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Grams.
    Mass,
    /// Millilitres.
    Volume,
    /// Whole pieces.
    #[default]
    Count,
}

impl UnitKind {
    /// Short unit suffix used in log details.
    pub fn suffix(&self) -> &'static str {
        match self {
            UnitKind::Mass => "g",
            UnitKind::Volume => "ml",
            UnitKind::Count => "pcs",
        }
    }
}

/// A named price point for a fixed quantity (e.g. "3.5g" for $30).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tier {
    pub label: String,
    pub quantity: Quantity,
    pub price: Money,
}

impl Tier {
    pub fn new(label: impl Into<String>, quantity: Quantity, price: Money) -> Self {
        Tier {
            label: label.into(),
            quantity,
            price,
        }
    }
}

/// A product carried in inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    pub unit: UnitKind,

    /// Current stock level. Only reconciliation and replenishment move it.
    pub stock: Quantity,

    /// Weighted-average cost of one unit.
    pub unit_cost: Money,

    /// Smallest quantity the business sells.
    pub min_increment: Quantity,

    /// Price tiers in display order.
    pub tiers: Vec<Tier>,

    /// When an order last consumed this product.
    #[ts(as = "Option<String>")]
    pub last_ordered_at: Option<DateTime<Utc>>,

    /// Whether product is active (inactive products stay for history).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Finds a tier by its label.
    pub fn tier(&self, label: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.label == label)
    }

    /// The smallest positive-quantity tier, the basis for per-unit pricing.
    ///
    /// Ties keep the first tier in display order.
    pub fn base_tier(&self) -> Option<&Tier> {
        self.tiers
            .iter()
            .filter(|t| t.quantity.is_positive())
            .fold(None, |best: Option<&Tier>, t| match best {
                Some(b) if b.quantity <= t.quantity => Some(b),
                _ => Some(t),
            })
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Parked by hand; never produced by the totals calculator.
    #[default]
    Draft,
    /// Amount paid is below the total.
    Unpaid,
    /// Amount paid covers the total.
    Completed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Draft => write!(f, "draft"),
            OrderStatus::Unpaid => write!(f, "unpaid"),
            OrderStatus::Completed => write!(f, "completed"),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

// =============================================================================
// Adjustment
// =============================================================================

/// A fee or discount applied to a whole order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Adjustment {
    pub amount: Money,
    #[serde(default)]
    pub description: String,
}

impl Adjustment {
    pub fn new(amount: Money, description: impl Into<String>) -> Self {
        Adjustment {
            amount,
            description: description.into(),
        }
    }

    /// No adjustment.
    pub fn none() -> Self {
        Adjustment::default()
    }
}

// =============================================================================
// Order
// =============================================================================

/// A line item in an order.
///
/// Price is frozen at the moment the line is resolved; later tier edits do
/// not rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: Quantity,
    /// Line price (not unit price).
    pub price: Money,
    /// Tier the line was priced from, or `"custom"`.
    pub tier_label: Option<String>,
}

/// A client order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub client_id: String,
    pub items: Vec<OrderItem>,

    /// Σ item.price + fee − discount. Written only by the totals calculator.
    pub total: Money,

    pub status: OrderStatus,

    /// Business date of the order.
    #[ts(as = "String")]
    pub date: DateTime<Utc>,

    pub notes: Option<String>,

    #[serde(default)]
    pub amount_paid: Money,

    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,

    #[serde(default)]
    pub fee: Adjustment,

    #[serde(default)]
    pub discount: Adjustment,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Amount still owed; negative when the client has credit.
    #[inline]
    pub fn balance(&self) -> Money {
        self.total - self.amount_paid
    }
}

// =============================================================================
// Client
// =============================================================================

/// A customer of the business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    pub id: String,

    /// Short sequential display number (#1, #2, ...).
    pub number: u32,

    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expense
// =============================================================================

/// A business expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Activity Log
// =============================================================================

/// What a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    ClientCreated,
    ProductCreated,
    ProductUpdated,
    OrderCreated,
    OrderUpdated,
    OrderDeleted,
    PaymentRecorded,
    StockReplenished,
    ExpenseCreated,
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogAction::ClientCreated => "client_created",
            LogAction::ProductCreated => "product_created",
            LogAction::ProductUpdated => "product_updated",
            LogAction::OrderCreated => "order_created",
            LogAction::OrderUpdated => "order_updated",
            LogAction::OrderDeleted => "order_deleted",
            LogAction::PaymentRecorded => "payment_recorded",
            LogAction::StockReplenished => "stock_replenished",
            LogAction::ExpenseCreated => "expense_created",
        };
        f.write_str(name)
    }
}

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LogEntry {
    pub id: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: LogAction,
    #[ts(type = "Record<string, unknown>")]
    pub details: serde_json::Value,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product_with_tiers(tiers: Vec<Tier>) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            name: "Test".to_string(),
            unit: UnitKind::Mass,
            stock: Quantity::from_units(10),
            unit_cost: Money::zero(),
            min_increment: Quantity::from_units(1),
            tiers,
            last_ordered_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_base_tier_picks_smallest_positive_quantity() {
        let product = product_with_tiers(vec![
            Tier::new("3.5g", Quantity::from_milli(3500), Money::from_cents(3000)),
            Tier::new("zero", Quantity::zero(), Money::from_cents(100)),
            Tier::new("1g", Quantity::from_units(1), Money::from_cents(1000)),
            Tier::new("1g-alt", Quantity::from_units(1), Money::from_cents(900)),
        ]);

        let base = product.base_tier().unwrap();
        assert_eq!(base.label, "1g");
    }

    #[test]
    fn test_base_tier_none_without_positive_tiers() {
        let product = product_with_tiers(vec![Tier::new(
            "free",
            Quantity::zero(),
            Money::zero(),
        )]);
        assert!(product.base_tier().is_none());
    }

    #[test]
    fn test_order_status_default_and_serde() {
        assert_eq!(OrderStatus::default(), OrderStatus::Draft);
        let json = serde_json::to_string(&OrderStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn test_log_action_display_matches_serde() {
        let json = serde_json::to_string(&LogAction::StockReplenished).unwrap();
        assert_eq!(json, format!("\"{}\"", LogAction::StockReplenished));
    }

    #[test]
    fn test_unit_suffix() {
        assert_eq!(UnitKind::Mass.suffix(), "g");
        assert_eq!(UnitKind::Count.suffix(), "pcs");
    }
}
