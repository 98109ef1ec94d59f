//! # Snapshot & ChangeSet
//!
//! The explicit state value every operation reads, and the delta every
//! operation produces.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Snapshot (borrowed) ──► operation(ctx, input) ──► Mutation            │
//! │                                                      ├── value          │
//! │                                                      └── ChangeSet      │
//! │                                                            │            │
//! │              ┌─────────────────────────────────────────────┤            │
//! │              ▼                                             ▼            │
//! │   Snapshot::apply (in memory)            SnapshotRepository::commit     │
//! │                                          (one SQLite transaction)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A ChangeSet is all-or-nothing: an operation either returns one with every
//! affected entity in it, or returns an error and no ChangeSet at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::totals;
use crate::types::{Client, Expense, LogAction, LogEntry, Order, OrderStatus, Product};

// =============================================================================
// Snapshot
// =============================================================================

/// The full ledger state; the unit of read and atomic write.
///
/// Field names double as the keys of the JSON export format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Snapshot {
    pub clients: Vec<Client>,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    pub expenses: Vec<Expense>,
    pub logs: Vec<LogEntry>,
}

impl Snapshot {
    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Orders placed by one client, in insertion order.
    pub fn orders_for<'a>(&'a self, client_id: &'a str) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders.iter().filter(move |o| o.client_id == client_id)
    }

    /// Next sequential client number (`max + 1`, starting at 1).
    pub fn next_client_number(&self) -> u32 {
        self.clients.iter().map(|c| c.number).max().unwrap_or(0) + 1
    }

    /// Total number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.clients.len()
            + self.products.len()
            + self.orders.len()
            + self.expenses.len()
            + self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Returns the next snapshot with `changes` applied.
    pub fn apply(&self, changes: &ChangeSet) -> Snapshot {
        let mut next = self.clone();
        next.apply_mut(changes);
        next
    }

    /// Applies `changes` in place.
    ///
    /// Upserts keep an existing record's position; new records are appended.
    pub fn apply_mut(&mut self, changes: &ChangeSet) {
        for client in &changes.clients {
            upsert(&mut self.clients, client.clone(), |c| &c.id);
        }
        for product in &changes.products {
            upsert(&mut self.products, product.clone(), |p| &p.id);
        }
        for order in &changes.orders {
            upsert(&mut self.orders, order.clone(), |o| &o.id);
        }
        if !changes.removed_orders.is_empty() {
            self.orders
                .retain(|o| !changes.removed_orders.contains(&o.id));
        }
        self.expenses.extend(changes.expenses.iter().cloned());
        if let Some(entry) = &changes.log {
            self.logs.push(entry.clone());
        }
    }

    /// Scans loaded data for states the operations can never produce.
    ///
    /// An empty result means the snapshot is internally consistent.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for product in &self.products {
            if product.stock.is_negative() {
                issues.push(IntegrityIssue::NegativeStock {
                    product_id: product.id.clone(),
                });
            }
            if product.unit_cost.is_negative() {
                issues.push(IntegrityIssue::NegativeUnitCost {
                    product_id: product.id.clone(),
                });
            }
        }

        let mut numbers = std::collections::HashSet::new();
        for client in &self.clients {
            if !numbers.insert(client.number) {
                issues.push(IntegrityIssue::DuplicateClientNumber {
                    number: client.number,
                });
            }
        }

        for order in &self.orders {
            if self.client(&order.client_id).is_none() {
                issues.push(IntegrityIssue::OrphanOrder {
                    order_id: order.id.clone(),
                    client_id: order.client_id.clone(),
                });
            }

            let expected = totals::compute_total(&order.items, &order.fee, &order.discount);
            if expected != order.total {
                issues.push(IntegrityIssue::TotalMismatch {
                    order_id: order.id.clone(),
                    stored: order.total,
                    expected,
                });
            }

            if order.status != OrderStatus::Draft
                && order.status != totals::compute_status(order.total, order.amount_paid)
            {
                issues.push(IntegrityIssue::StatusMismatch {
                    order_id: order.id.clone(),
                    status: order.status,
                });
            }

            if order.amount_paid.is_negative() {
                issues.push(IntegrityIssue::NegativePayment {
                    order_id: order.id.clone(),
                });
            }
        }

        issues
    }
}

fn upsert<T>(list: &mut Vec<T>, item: T, id: impl Fn(&T) -> &String) {
    match list.iter().position(|existing| id(existing) == id(&item)) {
        Some(index) => list[index] = item,
        None => list.push(item),
    }
}

// =============================================================================
// Integrity Issues
// =============================================================================

/// A consistency violation found in loaded data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    NegativeStock { product_id: String },
    NegativeUnitCost { product_id: String },
    DuplicateClientNumber { number: u32 },
    OrphanOrder { order_id: String, client_id: String },
    TotalMismatch { order_id: String, stored: Money, expected: Money },
    StatusMismatch { order_id: String, status: OrderStatus },
    NegativePayment { order_id: String },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::NegativeStock { product_id } => {
                write!(f, "product {} has negative stock", product_id)
            }
            IntegrityIssue::NegativeUnitCost { product_id } => {
                write!(f, "product {} has negative unit cost", product_id)
            }
            IntegrityIssue::DuplicateClientNumber { number } => {
                write!(f, "client number #{} is used more than once", number)
            }
            IntegrityIssue::OrphanOrder { order_id, client_id } => {
                write!(f, "order {} references missing client {}", order_id, client_id)
            }
            IntegrityIssue::TotalMismatch {
                order_id,
                stored,
                expected,
            } => write!(
                f,
                "order {} total is {} but its lines add up to {}",
                order_id, stored, expected
            ),
            IntegrityIssue::StatusMismatch { order_id, status } => {
                write!(f, "order {} is marked {} against its payment", order_id, status)
            }
            IntegrityIssue::NegativePayment { order_id } => {
                write!(f, "order {} has a negative amount paid", order_id)
            }
        }
    }
}

// =============================================================================
// Operation Context
// =============================================================================

/// Who is acting and when. The core never reads the clock itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpContext {
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl OpContext {
    pub fn new(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        OpContext {
            actor: actor.into(),
            at,
        }
    }

    /// Context stamped with the current time.
    pub fn now(actor: impl Into<String>) -> Self {
        OpContext::new(actor, Utc::now())
    }

    /// Generates a fresh entity id.
    pub fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Builds an activity log entry stamped with this context.
    pub fn log(&self, action: LogAction, details: serde_json::Value) -> LogEntry {
        LogEntry {
            id: self.new_id(),
            timestamp: self.at,
            actor: self.actor.clone(),
            action,
            details,
        }
    }
}

// =============================================================================
// ChangeSet
// =============================================================================

/// Everything one operation writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Upserted clients.
    pub clients: Vec<Client>,
    /// Upserted products.
    pub products: Vec<Product>,
    /// Upserted orders.
    pub orders: Vec<Order>,
    pub removed_orders: Vec<String>,
    /// Appended expenses.
    pub expenses: Vec<Expense>,
    /// Appended activity log entry.
    pub log: Option<LogEntry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
            && self.products.is_empty()
            && self.orders.is_empty()
            && self.removed_orders.is_empty()
            && self.expenses.is_empty()
            && self.log.is_none()
    }

    pub fn with_log(mut self, entry: LogEntry) -> Self {
        self.log = Some(entry);
        self
    }
}

/// The typed result of an operation together with the changes to commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    pub value: T,
    pub changes: ChangeSet,
}

impl<T> Mutation<T> {
    pub fn new(value: T, changes: ChangeSet) -> Self {
        Mutation { value, changes }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
