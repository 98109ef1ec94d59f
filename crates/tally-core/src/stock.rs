//! # Stock Reconciliation Engine
//!
//! Computes the net stock movement of an order create, edit or delete and
//! applies it to the affected products as one batch.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  plan_create(items)            consumed = Σ qty per product            │
//! │  plan_edit(original, updated)  returned = Σ original, consumed = Σ new  │
//! │  plan_delete(items)            returned = Σ qty per product            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  StockPlan: one coalesced entry per product, first-appearance order     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  apply(plan, snapshot, at)                                              │
//! │    1. check EVERY entry against the pre-transaction snapshot            │
//! │    2. only then build the updated products                              │
//! │                                                                         │
//! │  Any failure in step 1 returns before a single product is touched.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why coalesce
//! Two lines of the same product (a tier line plus a custom line) must be
//! checked against stock together. Checking them one at a time would let
//! `2 + 2` pass against a stock of `3`.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::money::Quantity;
use crate::snapshot::Snapshot;
use crate::types::{OrderItem, Product};

// =============================================================================
// Plan
// =============================================================================

/// Stock movement for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: String,
    /// Quantity given back (from the original order or a deletion).
    pub returned: Quantity,
    /// Quantity taken (by the new or updated order).
    pub consumed: Quantity,
}

impl StockDelta {
    /// Signed change to apply to stock.
    pub fn net(&self) -> Quantity {
        self.returned - self.consumed
    }
}

/// What kind of reconciliation a plan describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Create,
    Edit,
    Delete,
}

/// A coalesced, not-yet-applied stock movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPlan {
    pub kind: PlanKind,
    pub deltas: Vec<StockDelta>,
}

impl StockPlan {
    fn new(kind: PlanKind) -> Self {
        StockPlan {
            kind,
            deltas: Vec::new(),
        }
    }

    fn entry(&mut self, product_id: &str) -> &mut StockDelta {
        let index = match self.deltas.iter().position(|d| d.product_id == product_id) {
            Some(index) => index,
            None => {
                self.deltas.push(StockDelta {
                    product_id: product_id.to_string(),
                    returned: Quantity::zero(),
                    consumed: Quantity::zero(),
                });
                self.deltas.len() - 1
            }
        };
        &mut self.deltas[index]
    }

    fn consume(&mut self, items: &[OrderItem]) {
        for item in items {
            self.entry(&item.product_id).consumed += item.quantity;
        }
    }

    fn restore(&mut self, items: &[OrderItem]) {
        for item in items {
            self.entry(&item.product_id).returned += item.quantity;
        }
    }
}

pub fn plan_create(items: &[OrderItem]) -> StockPlan {
    let mut plan = StockPlan::new(PlanKind::Create);
    plan.consume(items);
    plan
}

pub fn plan_edit(original: &[OrderItem], updated: &[OrderItem]) -> StockPlan {
    let mut plan = StockPlan::new(PlanKind::Edit);
    plan.restore(original);
    plan.consume(updated);
    plan
}

pub fn plan_delete(items: &[OrderItem]) -> StockPlan {
    let mut plan = StockPlan::new(PlanKind::Delete);
    plan.restore(items);
    plan
}

// =============================================================================
// Apply
// =============================================================================

/// Validates `plan` against `snapshot` and returns the updated products.
///
/// Products that consume stock get `last_ordered_at = at`. A product that
/// only gets stock back (a deletion, or a line removed by an edit) keeps its
/// previous `last_ordered_at`. Products whose stock and stamp are both
/// unchanged are left out of the result.
///
/// ## Errors
/// - `ProductNotFound` if a consuming product is missing
/// - `InsufficientStock` if any product would end below zero
///
/// A product missing from the snapshot that only receives stock back is
/// skipped with a warning: there is nothing left to return stock to.
pub fn apply(plan: &StockPlan, snapshot: &Snapshot, at: DateTime<Utc>) -> CoreResult<Vec<Product>> {
    let mut checked: Vec<(&Product, &StockDelta)> = Vec::with_capacity(plan.deltas.len());

    for delta in &plan.deltas {
        let Some(product) = snapshot.product(&delta.product_id) else {
            if delta.consumed.is_positive() {
                return Err(CoreError::ProductNotFound(delta.product_id.clone()));
            }
            warn!(
                product_id = %delta.product_id,
                returned = %delta.returned,
                "Skipping stock return for missing product"
            );
            continue;
        };

        let available = product.stock + delta.returned;
        if available < delta.consumed {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available,
                requested: delta.consumed,
            });
        }

        checked.push((product, delta));
    }

    let mut updated = Vec::with_capacity(checked.len());
    for (product, delta) in checked {
        let net = delta.net();
        let stamp = delta.consumed.is_positive();
        if net.is_zero() && !stamp {
            continue;
        }

        let mut next = product.clone();
        next.stock += net;
        if stamp {
            next.last_ordered_at = Some(at);
        }
        next.updated_at = at;

        debug!(
            product_id = %next.id,
            from = %product.stock,
            to = %next.stock,
            kind = ?plan.kind,
            "Stock reconciled"
        );
        updated.push(next);
    }

    Ok(updated)
}

// =============================================================================
// Unit Tests
// =============================================================================
