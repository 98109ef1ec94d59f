//! # tally-core: Pure Reconciliation Logic for Tally
//!
//! This crate is the **heart** of Tally. It contains the order/inventory
//! reconciliation engine as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Dashboard (external)                         │   │
//! │  │    Clients ──► Orders ──► Inventory ──► Reports                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Ledger service)                    │   │
//! │  │    lock ──► load Snapshot ──► run operation ──► commit          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   tier ──► totals ──► stock ──► costing                        │   │
//! │  │                 │                                               │   │
//! │  │                 ▼                                               │   │
//! │  │   operations: (&Snapshot, input) → Mutation { value, ChangeSet }│   │
//! │  │                                                                 │   │
//! │  │   aggregate ──► report        transfer (import/export)          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money (cents) and Quantity (thousandths), integer arithmetic
//! - [`types`] - Domain types (Product, Order, Client, Expense, LogEntry)
//! - [`snapshot`] - Snapshot, ChangeSet, OpContext, Mutation
//! - [`tier`] - Tier Resolver
//! - [`totals`] - Order totals and payment status
//! - [`stock`] - Stock Reconciliation Engine
//! - [`costing`] - Weighted-average cost on replenishment
//! - [`aggregate`] - Per-client and per-product derived statistics
//! - [`report`] - Date-windowed financial rollups
//! - [`sort`] - Typed sort keys
//! - [`transfer`] - JSON snapshot import/export and tabular export
//! - [`operations`] - The mutating operations
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: the clock and the actor arrive in an [`OpContext`]
//! 2. **No I/O**: every operation returns a [`ChangeSet`] for the caller to commit
//! 3. **Integer Money**: cents and thousandths; floats only for display percentages
//! 4. **Derived, Not Stored**: client balances are folds over orders
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::{Money, Quantity};
//! use tally_core::totals::{compute_status, compute_total};
//! use tally_core::types::{Adjustment, OrderItem, OrderStatus};
//!
//! let items = vec![OrderItem {
//!     product_id: "p1".to_string(),
//!     quantity: Quantity::from_milli(3500),
//!     price: Money::from_cents(3000),
//!     tier_label: Some("3.5g".to_string()),
//! }];
//!
//! let total = compute_total(
//!     &items,
//!     &Adjustment::new(Money::from_cents(500), "delivery"),
//!     &Adjustment::new(Money::from_cents(200), "loyalty"),
//! );
//! assert_eq!(total.cents(), 3300);
//! assert_eq!(compute_status(total, Money::from_cents(3300)), OrderStatus::Completed);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod costing;
pub mod error;
pub mod money;
pub mod operations;
pub mod report;
pub mod snapshot;
pub mod sort;
pub mod stock;
pub mod tier;
pub mod totals;
pub mod transfer;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Quantity};
pub use snapshot::{ChangeSet, Mutation, OpContext, Snapshot};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum length of a display name.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of free-text fields (notes, addresses, descriptions).
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Tier label recorded on order lines that match no product tier.
pub const CUSTOM_TIER_LABEL: &str = "custom";

/// Expense category for purchases synthesized by a paid replenishment.
pub const INVENTORY_EXPENSE_CATEGORY: &str = "Inventory";

/// Bucket name for expenses without a category in reports.
pub const UNCATEGORIZED: &str = "Uncategorized";
