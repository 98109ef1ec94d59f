//! # Operations
//!
//! The mutating operations of the ledger. Each one is a pure function:
//!
//! ```text
//! (&Snapshot, &OpContext, input) ──► Result<Mutation<T>, CoreError>
//!                                          │
//!                                          ├── value:   the created/updated entity
//!                                          └── changes: ChangeSet to commit
//! ```
//!
//! ## Operation Map
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ create_client    │ next number, client_created                          │
//! │ create_product   │ validated tiers, product_created                     │
//! │ update_product   │ never touches stock, product_updated                 │
//! │ create_order     │ resolve lines → reconcile stock → totals             │
//! │ edit_order       │ resolve lines → reconcile vs. stored order → totals  │
//! │ delete_order     │ reverse stock, remove order                          │
//! │ record_payment   │ amount paid + methods → status, no stock effect      │
//! │ mark_paid        │ amount paid = total                                  │
//! │ replenish_stock  │ cost averaging + "Inventory" expense when paid       │
//! │ add_expense      │ amount > 0                                           │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! Every check runs before the ChangeSet is assembled. An `Err` means the
//! snapshot would be left exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use ts_rs::TS;

use crate::costing;
use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Quantity};
use crate::snapshot::{ChangeSet, Mutation, OpContext, Snapshot};
use crate::stock;
use crate::tier::{resolve_line, LineRequest};
use crate::totals::{compute_status, compute_total, settle_status};
use crate::types::{
    Adjustment, Client, Expense, LogAction, Order, OrderItem, OrderStatus, PaymentMethod,
    Product, Tier, UnitKind,
};
use crate::validation::{
    validate_email, validate_item_count, validate_name, validate_non_negative,
    validate_optional_text, validate_positive_amount, validate_quantity, validate_stock,
    validate_tiers,
};
use crate::INVENTORY_EXPENSE_CATEGORY;

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub unit: UnitKind,
    /// Opening stock.
    #[serde(default)]
    pub stock: Quantity,
    #[serde(default)]
    pub unit_cost: Money,
    /// Defaults to one whole unit.
    pub min_increment: Option<Quantity>,
    #[serde(default)]
    pub tiers: Vec<Tier>,
}

/// A partial product edit. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub unit: Option<UnitKind>,
    pub unit_cost: Option<Money>,
    pub min_increment: Option<Quantity>,
    pub tiers: Option<Vec<Tier>>,
    pub is_active: Option<bool>,
}

/// An order as submitted from the order form, for both create and edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDraft {
    pub client_id: String,
    pub lines: Vec<LineRequest>,
    /// Business date; defaults to the operation time (or the stored date on edit).
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub amount_paid: Money,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub fee: Adjustment,
    #[serde(default)]
    pub discount: Adjustment,
    /// Park the order as a draft instead of deriving its status.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExpense {
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
}

// =============================================================================
// Clients
// =============================================================================

pub fn create_client(
    snapshot: &Snapshot,
    ctx: &OpContext,
    input: NewClient,
) -> CoreResult<Mutation<Client>> {
    debug!(name = %input.name, "create_client");

    let client = Client {
        id: ctx.new_id(),
        number: snapshot.next_client_number(),
        name: validate_name("name", &input.name)?,
        phone: validate_optional_text("phone", input.phone.as_deref())?,
        email: validate_email(input.email.as_deref())?,
        address: validate_optional_text("address", input.address.as_deref())?,
        notes: validate_optional_text("notes", input.notes.as_deref())?,
        created_at: ctx.at,
    };

    let log = ctx.log(
        LogAction::ClientCreated,
        json!({
            "client_id": client.id,
            "number": client.number,
            "name": client.name,
        }),
    );
    let changes = ChangeSet {
        clients: vec![client.clone()],
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(client, changes))
}

// =============================================================================
// Products
// =============================================================================

pub fn create_product(
    _snapshot: &Snapshot,
    ctx: &OpContext,
    input: NewProduct,
) -> CoreResult<Mutation<Product>> {
    debug!(name = %input.name, tiers = input.tiers.len(), "create_product");

    let name = validate_name("name", &input.name)?;
    validate_stock("stock", input.stock)?;
    validate_non_negative("unit_cost", input.unit_cost)?;
    validate_tiers(&input.tiers)?;
    let min_increment = input.min_increment.unwrap_or(Quantity::from_units(1));
    validate_quantity("min_increment", min_increment)?;

    let product = Product {
        id: ctx.new_id(),
        name,
        unit: input.unit,
        stock: input.stock,
        unit_cost: input.unit_cost,
        min_increment,
        tiers: input.tiers,
        last_ordered_at: None,
        is_active: true,
        created_at: ctx.at,
        updated_at: ctx.at,
    };

    let log = ctx.log(
        LogAction::ProductCreated,
        json!({
            "product_id": product.id,
            "name": product.name,
            "stock": product.stock,
            "unit": product.unit.suffix(),
        }),
    );
    let changes = ChangeSet {
        products: vec![product.clone()],
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(product, changes))
}

/// Applies a product edit. Stock is never part of an edit; use
/// [`replenish_stock`].
pub fn update_product(
    snapshot: &Snapshot,
    ctx: &OpContext,
    product_id: &str,
    update: ProductUpdate,
) -> CoreResult<Mutation<Product>> {
    debug!(product_id, "update_product");

    let mut product = snapshot
        .product(product_id)
        .cloned()
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
    let mut fields = Vec::new();

    if let Some(name) = update.name {
        product.name = validate_name("name", &name)?;
        fields.push("name");
    }
    if let Some(unit) = update.unit {
        product.unit = unit;
        fields.push("unit");
    }
    if let Some(unit_cost) = update.unit_cost {
        validate_non_negative("unit_cost", unit_cost)?;
        product.unit_cost = unit_cost;
        fields.push("unit_cost");
    }
    if let Some(min_increment) = update.min_increment {
        validate_quantity("min_increment", min_increment)?;
        product.min_increment = min_increment;
        fields.push("min_increment");
    }
    if let Some(tiers) = update.tiers {
        validate_tiers(&tiers)?;
        product.tiers = tiers;
        fields.push("tiers");
    }
    if let Some(is_active) = update.is_active {
        product.is_active = is_active;
        fields.push("is_active");
    }
    product.updated_at = ctx.at;

    let log = ctx.log(
        LogAction::ProductUpdated,
        json!({
            "product_id": product.id,
            "name": product.name,
            "fields": fields,
        }),
    );
    let changes = ChangeSet {
        products: vec![product.clone()],
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(product, changes))
}

/// Adds (or, with a negative quantity, writes off) stock.
///
/// A positive quantity bought at a positive cost re-averages the unit cost
/// and records the purchase as an `"Inventory"` expense. Zero leaves stock
/// and cost as they are.
pub fn replenish_stock(
    snapshot: &Snapshot,
    ctx: &OpContext,
    product_id: &str,
    added: Quantity,
    purchase_cost: Money,
) -> CoreResult<Mutation<Product>> {
    debug!(product_id, %added, %purchase_cost, "replenish_stock");

    validate_non_negative("purchase_cost", purchase_cost)?;

    let current = snapshot
        .product(product_id)
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
    let outcome = costing::replenish(current, added, purchase_cost)?;

    let mut product = current.clone();
    product.stock = outcome.new_stock;
    product.unit_cost = outcome.new_unit_cost;
    product.updated_at = ctx.at;

    let expense = outcome.paid.then(|| Expense {
        id: ctx.new_id(),
        date: ctx.at,
        description: format!(
            "Restock: {} ({} {})",
            product.name,
            added,
            product.unit.suffix()
        ),
        amount: purchase_cost,
        category: Some(INVENTORY_EXPENSE_CATEGORY.to_string()),
        created_at: ctx.at,
    });

    let log = ctx.log(
        LogAction::StockReplenished,
        json!({
            "product_id": product.id,
            "name": product.name,
            "added": added,
            "previous_stock": current.stock,
            "new_stock": product.stock,
            "previous_unit_cost": current.unit_cost,
            "new_unit_cost": product.unit_cost,
            "purchase_cost": purchase_cost,
            "expense_id": expense.as_ref().map(|e| e.id.clone()),
        }),
    );
    let changes = ChangeSet {
        products: vec![product.clone()],
        expenses: expense.into_iter().collect(),
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(product, changes))
}

// =============================================================================
// Orders
// =============================================================================

/// Validated pieces shared by create and edit.
struct CheckedDraft {
    items: Vec<OrderItem>,
    notes: Option<String>,
    payment_methods: Vec<PaymentMethod>,
    total: Money,
}

fn check_draft(snapshot: &Snapshot, draft: &OrderDraft) -> CoreResult<CheckedDraft> {
    if snapshot.client(&draft.client_id).is_none() {
        return Err(CoreError::ClientNotFound(draft.client_id.clone()));
    }
    validate_item_count(draft.lines.len())?;
    validate_non_negative("amount_paid", draft.amount_paid)?;
    let notes = validate_optional_text("notes", draft.notes.as_deref())?;

    let items = draft
        .lines
        .iter()
        .map(|line| {
            let product = snapshot
                .product(&line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            resolve_line(product, line)
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let total = compute_total(&items, &draft.fee, &draft.discount);

    Ok(CheckedDraft {
        items,
        notes,
        payment_methods: dedup_methods(&draft.payment_methods),
        total,
    })
}

/// Payment methods are a set; keep first-seen order.
fn dedup_methods(methods: &[PaymentMethod]) -> Vec<PaymentMethod> {
    let mut unique = Vec::with_capacity(methods.len());
    for method in methods {
        if !unique.contains(method) {
            unique.push(*method);
        }
    }
    unique
}

pub fn create_order(
    snapshot: &Snapshot,
    ctx: &OpContext,
    draft: OrderDraft,
) -> CoreResult<Mutation<Order>> {
    debug!(client_id = %draft.client_id, lines = draft.lines.len(), "create_order");

    let checked = check_draft(snapshot, &draft)?;
    let products = stock::apply(&stock::plan_create(&checked.items), snapshot, ctx.at)?;

    let status = if draft.draft {
        OrderStatus::Draft
    } else {
        compute_status(checked.total, draft.amount_paid)
    };

    let order = Order {
        id: ctx.new_id(),
        client_id: draft.client_id,
        items: checked.items,
        total: checked.total,
        status,
        date: draft.date.unwrap_or(ctx.at),
        notes: checked.notes,
        amount_paid: draft.amount_paid,
        payment_methods: checked.payment_methods,
        fee: draft.fee,
        discount: draft.discount,
        created_at: ctx.at,
        updated_at: ctx.at,
    };

    let log = ctx.log(
        LogAction::OrderCreated,
        json!({
            "order_id": order.id,
            "client_id": order.client_id,
            "items": order.items.len(),
            "total": order.total,
            "amount_paid": order.amount_paid,
            "status": order.status,
        }),
    );
    let changes = ChangeSet {
        products,
        orders: vec![order.clone()],
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(order, changes))
}

/// Replaces an order's contents, reconciling stock against the stored
/// version as one coalesced delta per product.
///
/// The draft flag on the form decides whether the order stays parked;
/// otherwise the status follows the payment. Unit cost is never revisited.
pub fn edit_order(
    snapshot: &Snapshot,
    ctx: &OpContext,
    order_id: &str,
    draft: OrderDraft,
) -> CoreResult<Mutation<Order>> {
    debug!(order_id, lines = draft.lines.len(), "edit_order");

    let existing = snapshot
        .order(order_id)
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

    let checked = check_draft(snapshot, &draft)?;
    let plan = stock::plan_edit(&existing.items, &checked.items);
    let products = stock::apply(&plan, snapshot, ctx.at)?;

    let status = if draft.draft {
        OrderStatus::Draft
    } else {
        compute_status(checked.total, draft.amount_paid)
    };

    let order = Order {
        id: existing.id.clone(),
        client_id: draft.client_id,
        items: checked.items,
        total: checked.total,
        status,
        date: draft.date.unwrap_or(existing.date),
        notes: checked.notes,
        amount_paid: draft.amount_paid,
        payment_methods: checked.payment_methods,
        fee: draft.fee,
        discount: draft.discount,
        created_at: existing.created_at,
        updated_at: ctx.at,
    };

    let log = ctx.log(
        LogAction::OrderUpdated,
        json!({
            "order_id": order.id,
            "client_id": order.client_id,
            "previous_total": existing.total,
            "total": order.total,
            "status": order.status,
        }),
    );
    let changes = ChangeSet {
        products,
        orders: vec![order.clone()],
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(order, changes))
}

/// Removes an order and returns its stock. Returns the removed order.
pub fn delete_order(
    snapshot: &Snapshot,
    ctx: &OpContext,
    order_id: &str,
) -> CoreResult<Mutation<Order>> {
    debug!(order_id, "delete_order");

    let order = snapshot
        .order(order_id)
        .cloned()
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
    let products = stock::apply(&stock::plan_delete(&order.items), snapshot, ctx.at)?;

    let log = ctx.log(
        LogAction::OrderDeleted,
        json!({
            "order_id": order.id,
            "client_id": order.client_id,
            "total": order.total,
            "items": order.items.len(),
        }),
    );
    let changes = ChangeSet {
        products,
        removed_orders: vec![order.id.clone()],
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(order, changes))
}

/// Sets the amount paid (not an increment) and re-derives the status.
///
/// A draft stays a draft. `methods` replaces the recorded payment methods
/// when given.
pub fn record_payment(
    snapshot: &Snapshot,
    ctx: &OpContext,
    order_id: &str,
    amount_paid: Money,
    methods: Option<Vec<PaymentMethod>>,
) -> CoreResult<Mutation<Order>> {
    debug!(order_id, %amount_paid, "record_payment");

    validate_non_negative("amount_paid", amount_paid)?;
    let mut order = snapshot
        .order(order_id)
        .cloned()
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

    order.amount_paid = amount_paid;
    if let Some(methods) = methods {
        order.payment_methods = dedup_methods(&methods);
    }
    order.status = settle_status(order.status, order.total, order.amount_paid);
    order.updated_at = ctx.at;

    Ok(payment_mutation(ctx, order))
}

/// Records the order as paid in full.
///
/// This is an explicit settlement, so a draft becomes completed too. A
/// negative total is settled with a zero payment.
pub fn mark_paid(snapshot: &Snapshot, ctx: &OpContext, order_id: &str) -> CoreResult<Mutation<Order>> {
    debug!(order_id, "mark_paid");

    let mut order = snapshot
        .order(order_id)
        .cloned()
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

    order.amount_paid = order.total.max(Money::zero());
    order.status = compute_status(order.total, order.amount_paid);
    order.updated_at = ctx.at;

    Ok(payment_mutation(ctx, order))
}

fn payment_mutation(ctx: &OpContext, order: Order) -> Mutation<Order> {
    let log = ctx.log(
        LogAction::PaymentRecorded,
        json!({
            "order_id": order.id,
            "amount_paid": order.amount_paid,
            "balance": order.balance(),
            "status": order.status,
        }),
    );
    let changes = ChangeSet {
        orders: vec![order.clone()],
        ..Default::default()
    }
    .with_log(log);

    Mutation::new(order, changes)
}

// =============================================================================
// Expenses
// =============================================================================

pub fn add_expense(
    _snapshot: &Snapshot,
    ctx: &OpContext,
    input: NewExpense,
) -> CoreResult<Mutation<Expense>> {
    debug!(amount = %input.amount, "add_expense");

    validate_positive_amount("amount", input.amount)?;
    let expense = Expense {
        id: ctx.new_id(),
        date: input.date.unwrap_or(ctx.at),
        description: validate_name("description", &input.description)?,
        amount: input.amount,
        category: validate_optional_text("category", input.category.as_deref())?,
        created_at: ctx.at,
    };

    let log = ctx.log(
        LogAction::ExpenseCreated,
        json!({
            "expense_id": expense.id,
            "description": expense.description,
            "amount": expense.amount,
            "category": expense.category,
        }),
    );
    let changes = ChangeSet {
        expenses: vec![expense.clone()],
        ..Default::default()
    }
    .with_log(log);

    Ok(Mutation::new(expense, changes))
}

// =============================================================================
// Unit Tests
// =============================================================================
