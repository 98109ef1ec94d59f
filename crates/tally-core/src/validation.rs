//! # Validation Module
//!
//! Input validation for every value that enters the ledger through an
//! operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Dashboard (TypeScript)                                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Operations (Rust)                                            │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field rules, run before any ChangeSet is built       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Stock Reconciliation                                         │
//! │  └── Whole-batch availability check                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inputs are rejected, never clamped: a negative price is an error, not a
//! zero price.
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Quantity;
//! use tally_core::validation::{validate_name, validate_quantity};
//!
//! validate_name("name", "Blue Dream").unwrap();
//! assert!(validate_quantity("quantity", Quantity::zero()).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};
use crate::types::Tier;
use crate::{MAX_NAME_LENGTH, MAX_NOTES_LENGTH, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (client, product, tier label).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LENGTH`] characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(name.to_string())
}

/// Normalizes an optional free-text field.
///
/// Blank text becomes `None`; anything longer than [`MAX_NOTES_LENGTH`] is
/// rejected.
pub fn validate_optional_text(
    field: &str,
    text: Option<&str>,
) -> ValidationResult<Option<String>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if text.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }

    Ok(Some(text.to_string()))
}

/// Validates an optional email address.
///
/// Only the shape is checked (something@something); delivery is not our
/// concern.
pub fn validate_email(email: Option<&str>) -> ValidationResult<Option<String>> {
    let email = validate_optional_text("email", email)?;

    if let Some(address) = &email {
        let valid = match address.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
            None => false,
        };
        if !valid {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must look like name@domain".to_string(),
            });
        }
    }

    Ok(email)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity that must be strictly positive (order lines, tiers).
pub fn validate_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

/// Validates a quantity that may be zero but not negative (stock levels).
pub fn validate_stock(field: &str, qty: Quantity) -> ValidationResult<()> {
    if qty.is_negative() {
        return Err(ValidationError::must_not_be_negative(field));
    }
    Ok(())
}

/// Validates a price, cost or payment.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, unpaid orders)
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("price", Money::from_cents(1099)).is_ok());
/// assert!(validate_non_negative("price", Money::zero()).is_ok());
/// assert!(validate_non_negative("price", Money::from_cents(-100)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::must_not_be_negative(field));
    }
    Ok(())
}

/// Validates an amount that must be strictly positive (expenses).
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in an order.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_ORDER_ITEMS`] lines
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("items"));
    }

    if count > MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates a product's tier list.
///
/// Every tier needs a label, a positive quantity and a non-negative price.
/// Labels must be unique within the product, and `"custom"` is reserved for
/// lines that match no tier.
pub fn validate_tiers(tiers: &[Tier]) -> ValidationResult<()> {
    let mut seen = HashSet::new();

    for tier in tiers {
        let label = validate_name("tier label", &tier.label)?;

        if label == crate::CUSTOM_TIER_LABEL {
            return Err(ValidationError::InvalidFormat {
                field: "tier label".to_string(),
                reason: format!("'{}' is reserved", crate::CUSTOM_TIER_LABEL),
            });
        }

        if !seen.insert(label.clone()) {
            return Err(ValidationError::Duplicate {
                field: "tier label".to_string(),
                value: label,
            });
        }

        validate_quantity("tier quantity", tier.quantity)?;
        validate_non_negative("tier price", tier.price)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Blue Dream ").unwrap(), "Blue Dream");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("notes", None).unwrap(), None);
        assert_eq!(validate_optional_text("notes", Some("  ")).unwrap(), None);
        assert_eq!(
            validate_optional_text("notes", Some(" gate code 12 ")).unwrap(),
            Some("gate code 12".to_string())
        );
        assert!(validate_optional_text("notes", Some(&"x".repeat(5000))).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email(Some("sam@example.com")).is_ok());
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("nope")).is_err());
        assert!(validate_email(Some("@example.com")).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", Quantity::from_milli(1)).is_ok());
        assert!(validate_quantity("quantity", Quantity::zero()).is_err());
        assert!(validate_quantity("quantity", Quantity::from_units(-1)).is_err());
        assert!(validate_stock("stock", Quantity::zero()).is_ok());
        assert!(validate_stock("stock", Quantity::from_milli(-1)).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_non_negative("price", Money::zero()).is_ok());
        assert!(validate_non_negative("price", Money::from_cents(-1)).is_err());
        assert!(validate_positive_amount("amount", Money::from_cents(1)).is_ok());
        assert!(validate_positive_amount("amount", Money::zero()).is_err());
    }

    #[test]
    fn test_validate_item_count() {
        assert!(validate_item_count(1).is_ok());
        assert!(validate_item_count(MAX_ORDER_ITEMS).is_ok());
        assert!(validate_item_count(0).is_err());
        assert!(validate_item_count(MAX_ORDER_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_tiers() {
        let ok = vec![
            Tier::new("1g", Quantity::from_units(1), Money::from_cents(1000)),
            Tier::new("3.5g", Quantity::from_milli(3500), Money::from_cents(3000)),
        ];
        assert!(validate_tiers(&ok).is_ok());

        let dup = vec![
            Tier::new("1g", Quantity::from_units(1), Money::from_cents(1000)),
            Tier::new("1g", Quantity::from_units(2), Money::from_cents(1800)),
        ];
        assert!(matches!(
            validate_tiers(&dup),
            Err(ValidationError::Duplicate { .. })
        ));

        let reserved = vec![Tier::new("custom", Quantity::from_units(1), Money::zero())];
        assert!(validate_tiers(&reserved).is_err());

        let zero_qty = vec![Tier::new("x", Quantity::zero(), Money::zero())];
        assert!(validate_tiers(&zero_qty).is_err());

        let negative_price = vec![Tier::new("x", Quantity::from_units(1), Money::from_cents(-1))];
        assert!(validate_tiers(&negative_price).is_err());
    }
}
