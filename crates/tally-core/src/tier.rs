//! # Tier Resolver
//!
//! Turns what the user asked for on an order line into a concrete
//! `(quantity, price, tier_label)` triple.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tier label matches a product tier?                                     │
//! │       │                                                                 │
//! │       ├── yes ─► tier.quantity, tier.price, tier.label                  │
//! │       │                                                                 │
//! │       └── no ──► quantity given?                                        │
//! │                    │                                                    │
//! │                    ├── no ─► UnresolvedLine                             │
//! │                    │                                                    │
//! │                    └── yes ─► price given?                              │
//! │                                 │                                       │
//! │                                 ├── yes ─► passed through, "custom"     │
//! │                                 │                                       │
//! │                                 └── no ──► priced from base tier,       │
//! │                                            whole currency unit,         │
//! │                                            "custom"                     │
//! │                                            (no tiers ─► UnresolvedLine) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Worked Example
//! Tiers `1g → $10`, `3.5g → $30`; the user types `7` with no tier.
//! The base tier is `1g`, so the price is `7 × $10 = $70`, label `"custom"`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Quantity};
use crate::types::{OrderItem, Product};
use crate::validation::{validate_non_negative, validate_quantity};
use crate::CUSTOM_TIER_LABEL;

/// An order line as the user entered it, before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product_id: String,
    pub tier_label: Option<String>,
    pub quantity: Option<Quantity>,
    pub price: Option<Money>,
}

impl LineRequest {
    /// A line that picks a named tier.
    pub fn tier(product_id: impl Into<String>, label: impl Into<String>) -> Self {
        LineRequest {
            product_id: product_id.into(),
            tier_label: Some(label.into()),
            ..Default::default()
        }
    }

    /// A custom quantity priced from the product's base tier.
    pub fn quantity(product_id: impl Into<String>, quantity: Quantity) -> Self {
        LineRequest {
            product_id: product_id.into(),
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    /// A fully custom quantity/price pair.
    pub fn custom(product_id: impl Into<String>, quantity: Quantity, price: Money) -> Self {
        LineRequest {
            product_id: product_id.into(),
            quantity: Some(quantity),
            price: Some(price),
            ..Default::default()
        }
    }
}

/// A priced line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub quantity: Quantity,
    pub price: Money,
    pub tier_label: String,
}

impl Resolved {
    pub fn into_item(self, product_id: impl Into<String>) -> OrderItem {
        OrderItem {
            product_id: product_id.into(),
            quantity: self.quantity,
            price: self.price,
            tier_label: Some(self.tier_label),
        }
    }
}

/// Resolves one order line against `product`'s tiers.
///
/// Explicit inputs are validated first: a zero or negative quantity and a
/// negative price are rejected rather than clamped.
pub fn resolve(
    product: &Product,
    tier_label: Option<&str>,
    quantity: Option<Quantity>,
    price: Option<Money>,
) -> CoreResult<Resolved> {
    if let Some(qty) = quantity {
        validate_quantity("quantity", qty)?;
    }
    if let Some(price) = price {
        validate_non_negative("price", price)?;
    }

    if let Some(tier) = tier_label.and_then(|label| product.tier(label)) {
        return Ok(Resolved {
            quantity: tier.quantity,
            price: tier.price,
            tier_label: tier.label.clone(),
        });
    }

    let Some(quantity) = quantity else {
        return Err(CoreError::UnresolvedLine {
            product: product.name.clone(),
            reason: match tier_label {
                Some(label) => format!("no tier named '{}' and no quantity given", label),
                None => "no tier or quantity given".to_string(),
            },
        });
    };

    if let Some(price) = price {
        return Ok(Resolved {
            quantity,
            price,
            tier_label: CUSTOM_TIER_LABEL.to_string(),
        });
    }

    let base = product
        .base_tier()
        .ok_or_else(|| CoreError::UnresolvedLine {
            product: product.name.clone(),
            reason: "product has no tiers; quantity and price are both required".to_string(),
        })?;

    let price = base.price.pro_rata(quantity, base.quantity).round_to_unit();

    Ok(Resolved {
        quantity,
        price,
        tier_label: CUSTOM_TIER_LABEL.to_string(),
    })
}

/// Resolves a [`LineRequest`] into an [`OrderItem`].
pub fn resolve_line(product: &Product, line: &LineRequest) -> CoreResult<OrderItem> {
    resolve(product, line.tier_label.as_deref(), line.quantity, line.price)
        .map(|resolved| resolved.into_item(product.id.clone()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Tier, UnitKind};
    use chrono::Utc;

    fn flower(tiers: Vec<Tier>) -> Product {
        let now = Utc::now();
        Product {
            id: "flower".to_string(),
            name: "Blue Dream".to_string(),
            unit: UnitKind::Mass,
            stock: Quantity::from_units(100),
            unit_cost: Money::from_cents(400),
            min_increment: Quantity::from_milli(500),
            tiers,
            last_ordered_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn standard_tiers() -> Vec<Tier> {
        vec![
            Tier::new("1g", Quantity::from_units(1), Money::from_cents(1000)),
            Tier::new("3.5g", Quantity::from_milli(3500), Money::from_cents(3000)),
        ]
    }

    #[test]
    fn test_tier_match_is_verbatim() {
        let product = flower(standard_tiers());
        let resolved = resolve(&product, Some("3.5g"), None, None).unwrap();

        assert_eq!(resolved.quantity, Quantity::from_milli(3500));
        assert_eq!(resolved.price, Money::from_cents(3000));
        assert_eq!(resolved.tier_label, "3.5g");
    }

    #[test]
    fn test_tier_match_ignores_explicit_quantity() {
        let product = flower(standard_tiers());
        let resolved =
            resolve(&product, Some("1g"), Some(Quantity::from_units(4)), None).unwrap();
        assert_eq!(resolved.quantity, Quantity::from_units(1));
    }

    #[test]
    fn test_custom_quantity_priced_from_smallest_tier() {
        let product = flower(standard_tiers());
        let resolved = resolve(&product, None, Some(Quantity::from_units(7)), None).unwrap();

        assert_eq!(resolved.price, Money::from_cents(7000));
        assert_eq!(resolved.tier_label, CUSTOM_TIER_LABEL);
    }

    #[test]
    fn test_custom_price_rounds_to_whole_unit() {
        // $30 per 3.5g → 2g is $17.142857 → $17
        let product = flower(vec![Tier::new(
            "3.5g",
            Quantity::from_milli(3500),
            Money::from_cents(3000),
        )]);
        let resolved = resolve(&product, None, Some(Quantity::from_units(2)), None).unwrap();
        assert_eq!(resolved.price, Money::from_cents(1700));
    }

    #[test]
    fn test_unknown_tier_label_falls_back_to_quantity() {
        let product = flower(standard_tiers());
        let resolved =
            resolve(&product, Some("ounce"), Some(Quantity::from_units(2)), None).unwrap();
        assert_eq!(resolved.price, Money::from_cents(2000));
        assert_eq!(resolved.tier_label, CUSTOM_TIER_LABEL);
    }

    #[test]
    fn test_explicit_pair_passes_through() {
        let product = flower(standard_tiers());
        let resolved = resolve(
            &product,
            None,
            Some(Quantity::from_milli(2500)),
            Some(Money::from_cents(1999)),
        )
        .unwrap();

        assert_eq!(resolved.quantity, Quantity::from_milli(2500));
        assert_eq!(resolved.price, Money::from_cents(1999));
    }

    #[test]
    fn test_no_tiers_requires_price() {
        let product = flower(vec![]);

        let err = resolve(&product, None, Some(Quantity::from_units(1)), None).unwrap_err();
        assert!(matches!(err, CoreError::UnresolvedLine { .. }));

        let ok = resolve(
            &product,
            None,
            Some(Quantity::from_units(1)),
            Some(Money::from_cents(500)),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_missing_quantity_is_unresolved() {
        let product = flower(standard_tiers());
        let err = resolve(&product, Some("ounce"), None, None).unwrap_err();
        assert!(matches!(err, CoreError::UnresolvedLine { .. }));
    }

    #[test]
    fn test_rejects_non_positive_quantity_and_negative_price() {
        let product = flower(standard_tiers());

        let err = resolve(&product, None, Some(Quantity::zero()), None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = resolve(
            &product,
            None,
            Some(Quantity::from_units(1)),
            Some(Money::from_cents(-100)),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_resolve_line_builds_order_item() {
        let product = flower(standard_tiers());
        let item = resolve_line(&product, &LineRequest::tier("flower", "1g")).unwrap();

        assert_eq!(item.product_id, "flower");
        assert_eq!(item.tier_label.as_deref(), Some("1g"));
    }
}
