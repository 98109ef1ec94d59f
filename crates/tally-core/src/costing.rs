//! # Cost Averaging Engine
//!
//! Weighted-average unit cost on replenishment.
//!
//! ```text
//!                  stock × unit_cost + purchase_cost
//! new_unit_cost = ───────────────────────────────────   (rounded to the cent)
//!                           stock + added
//! ```
//!
//! The cost only moves when a positive quantity arrives with a positive
//! purchase cost and the resulting stock is positive. Free stock and
//! corrections (`added < 0`) leave it alone.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{round_div, Money, Quantity, MILLI_PER_UNIT};
use crate::types::Product;

/// Result of a replenishment calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Replenishment {
    pub new_stock: Quantity,
    pub new_unit_cost: Money,
    /// Whether the purchase should be recorded as an expense.
    pub paid: bool,
}

/// Computes the stock and unit cost after adding `added` units bought for
/// `purchase_cost` in total.
///
/// ## Errors
/// `InsufficientStock` when a negative correction would take stock below
/// zero.
pub fn replenish(product: &Product, added: Quantity, purchase_cost: Money) -> CoreResult<Replenishment> {
    let new_stock = product.stock + added;
    if new_stock.is_negative() {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: -added,
        });
    }

    let paid = added.is_positive() && purchase_cost.is_positive();
    let new_unit_cost = if paid && new_stock.is_positive() {
        weighted_average(product.stock, product.unit_cost, purchase_cost, new_stock)
    } else {
        product.unit_cost
    };

    Ok(Replenishment {
        new_stock,
        new_unit_cost,
        paid,
    })
}

fn weighted_average(stock: Quantity, unit_cost: Money, purchase: Money, new_stock: Quantity) -> Money {
    // Work in cent-thousandths so the division happens once.
    let held = stock.milli() as i128 * unit_cost.cents() as i128;
    let bought = purchase.cents() as i128 * MILLI_PER_UNIT as i128;
    Money::from_cents(round_div(held + bought, new_stock.milli() as i128) as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitKind;
    use chrono::Utc;

    fn product(stock_units: i64, unit_cost_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p".to_string(),
            name: "Gummies".to_string(),
            unit: UnitKind::Count,
            stock: Quantity::from_units(stock_units),
            unit_cost: Money::from_cents(unit_cost_cents),
            min_increment: Quantity::from_units(1),
            tiers: vec![],
            last_ordered_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_weighted_average() {
        let result = replenish(
            &product(10, 200),
            Quantity::from_units(10),
            Money::from_cents(4000),
        )
        .unwrap();

        assert_eq!(result.new_stock, Quantity::from_units(20));
        assert_eq!(result.new_unit_cost, Money::from_cents(300));
        assert!(result.paid);
    }

    #[test]
    fn test_average_rounds_to_cent() {
        // (3 × $1.00 + $1.00) / 6 = $0.6666… → $0.67
        let result =
            replenish(&product(3, 100), Quantity::from_units(3), Money::from_cents(100)).unwrap();
        assert_eq!(result.new_unit_cost, Money::from_cents(67));
    }

    #[test]
    fn test_from_empty_stock() {
        let result =
            replenish(&product(0, 0), Quantity::from_units(4), Money::from_cents(1000)).unwrap();
        assert_eq!(result.new_unit_cost, Money::from_cents(250));
    }

    #[test]
    fn test_free_stock_keeps_cost() {
        let result = replenish(&product(10, 200), Quantity::from_units(5), Money::zero()).unwrap();
        assert_eq!(result.new_unit_cost, Money::from_cents(200));
        assert!(!result.paid);
    }

    #[test]
    fn test_negative_correction() {
        let result =
            replenish(&product(10, 200), Quantity::from_units(-4), Money::from_cents(999)).unwrap();
        assert_eq!(result.new_stock, Quantity::from_units(6));
        assert_eq!(result.new_unit_cost, Money::from_cents(200));
        assert!(!result.paid);
    }

    #[test]
    fn test_correction_below_zero_rejected() {
        let err = replenish(&product(2, 200), Quantity::from_units(-3), Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
    }
}
