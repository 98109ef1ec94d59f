//! # Order Totals Calculator
//!
//! Pure arithmetic from order lines to total, status and balance.
//!
//! ```text
//! total   = Σ item.price + fee.amount − discount.amount
//! status  = completed if amount_paid ≥ total, else unpaid
//! balance = total − amount_paid        (negative means credit)
//! ```
//!
//! Nothing is clamped: a discount larger than the subtotal yields a negative
//! total, which any payment (including zero) settles.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Adjustment, Order, OrderItem, OrderStatus};

/// Sum of line prices, before fee and discount.
pub fn subtotal(items: &[OrderItem]) -> Money {
    items.iter().map(|item| item.price).sum()
}

pub fn compute_total(items: &[OrderItem], fee: &Adjustment, discount: &Adjustment) -> Money {
    subtotal(items) + fee.amount - discount.amount
}

/// Payment status from the numbers alone. Never yields `Draft`.
pub fn compute_status(total: Money, amount_paid: Money) -> OrderStatus {
    if amount_paid >= total {
        OrderStatus::Completed
    } else {
        OrderStatus::Unpaid
    }
}

#[inline]
pub fn balance(total: Money, amount_paid: Money) -> Money {
    total - amount_paid
}

/// Status after a recalculation: a draft stays a draft.
pub fn settle_status(previous: OrderStatus, total: Money, amount_paid: Money) -> OrderStatus {
    match previous {
        OrderStatus::Draft => OrderStatus::Draft,
        _ => compute_status(total, amount_paid),
    }
}

/// Summary of an order's money, as shown on an order detail screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub fee: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub balance: Money,
    pub status: OrderStatus,
}

impl OrderTotals {
    /// Recomputes the summary from an order's lines and adjustments.
    pub fn of(order: &Order) -> Self {
        let total = compute_total(&order.items, &order.fee, &order.discount);
        OrderTotals {
            subtotal: subtotal(&order.items),
            fee: order.fee.amount,
            discount: order.discount.amount,
            total,
            paid: order.amount_paid,
            balance: balance(total, order.amount_paid),
            status: settle_status(order.status, total, order.amount_paid),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
