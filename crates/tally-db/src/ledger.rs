//! # Ledger Service
//!
//! The single entry point the dashboard talks to. Every mutation runs the
//! pure tally-core operation against a freshly loaded snapshot and commits
//! the resulting ChangeSet in one transaction.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ledger.create_order(draft)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  writer.lock()          ← one writer at a time                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  snapshots().load()     ← current state                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  operations::create_order(&snapshot, &ctx, draft)                       │
//! │       │                                                                 │
//! │       ├── Err(CoreError) ──► returned, nothing written                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  snapshots().commit(&changes)  ← BEGIN … COMMIT                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads load their own snapshot and never take the writer lock; each read
//! folds over one consistent snapshot.

use tally_core::aggregate::{self, ClientView, InventorySummary, ProductView};
use tally_core::operations::{
    self, NewClient, NewExpense, NewProduct, OrderDraft, ProductUpdate,
};
use tally_core::report::{self, DateRange, Report};
use tally_core::snapshot::IntegrityIssue;
use tally_core::sort::{
    self, ClientSortKey, OrderSortKey, ProductSortKey, SortDirection,
};
use tally_core::transfer::{self, TableKind};
use tally_core::{
    Client, CoreResult, Expense, Money, Mutation, OpContext, Order, PaymentMethod, Product,
    Quantity, Snapshot,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::SnapshotRepository;

/// Async service serialising every write to one store.
#[derive(Debug)]
pub struct Ledger {
    db: Database,
    repo: SnapshotRepository,
    actor: String,
    top_n: usize,
    writer: Mutex<()>,
}

impl Ledger {
    pub fn new(db: Database, actor: impl Into<String>) -> Self {
        Ledger {
            repo: db.snapshots(),
            db,
            actor: actor.into(),
            top_n: 5,
            writer: Mutex::new(()),
        }
    }

    /// Opens the configured database and wraps it.
    pub async fn open(config: &LedgerConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;
        Ok(Ledger::new(db, config.actor()).with_top_n(config.top_n()))
    }

    /// Length of the report rankings.
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Load → run → commit under the writer lock.
    async fn mutate<T>(
        &self,
        operation: &'static str,
        run: impl FnOnce(&Snapshot, &OpContext) -> CoreResult<Mutation<T>>,
    ) -> DbResult<T> {
        let _guard = self.writer.lock().await;

        let snapshot = self.repo.load().await?;
        let ctx = OpContext::now(self.actor.as_str());

        let Mutation { value, changes } = run(&snapshot, &ctx).map_err(|e| {
            warn!(operation, error = %e, "Operation rejected");
            e
        })?;

        self.repo.commit(&changes).await?;
        info!(operation, actor = %ctx.actor, "Mutation committed");
        Ok(value)
    }

    // =========================================================================
    // Clients
    // =========================================================================

    pub async fn create_client(&self, input: NewClient) -> DbResult<Client> {
        self.mutate("create_client", move |s, ctx| {
            operations::create_client(s, ctx, input)
        })
        .await
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, input: NewProduct) -> DbResult<Product> {
        self.mutate("create_product", move |s, ctx| {
            operations::create_product(s, ctx, input)
        })
        .await
    }

    pub async fn update_product(&self, product_id: &str, update: ProductUpdate) -> DbResult<Product> {
        self.mutate("update_product", move |s, ctx| {
            operations::update_product(s, ctx, product_id, update)
        })
        .await
    }

    /// Adds stock; a non-zero purchase cost re-averages the unit cost and
    /// books an inventory expense.
    pub async fn replenish_stock(
        &self,
        product_id: &str,
        added: Quantity,
        purchase_cost: Money,
    ) -> DbResult<Product> {
        self.mutate("replenish_stock", move |s, ctx| {
            operations::replenish_stock(s, ctx, product_id, added, purchase_cost)
        })
        .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn create_order(&self, draft: OrderDraft) -> DbResult<Order> {
        self.mutate("create_order", move |s, ctx| {
            operations::create_order(s, ctx, draft)
        })
        .await
    }

    pub async fn edit_order(&self, order_id: &str, draft: OrderDraft) -> DbResult<Order> {
        self.mutate("edit_order", move |s, ctx| {
            operations::edit_order(s, ctx, order_id, draft)
        })
        .await
    }

    /// Deletes the order and returns its stock. Returns the removed order.
    pub async fn delete_order(&self, order_id: &str) -> DbResult<Order> {
        self.mutate("delete_order", move |s, ctx| {
            operations::delete_order(s, ctx, order_id)
        })
        .await
    }

    pub async fn record_payment(
        &self,
        order_id: &str,
        amount_paid: Money,
        methods: Option<Vec<PaymentMethod>>,
    ) -> DbResult<Order> {
        self.mutate("record_payment", move |s, ctx| {
            operations::record_payment(s, ctx, order_id, amount_paid, methods)
        })
        .await
    }

    pub async fn mark_paid(&self, order_id: &str) -> DbResult<Order> {
        self.mutate("mark_paid", move |s, ctx| operations::mark_paid(s, ctx, order_id))
            .await
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    pub async fn add_expense(&self, input: NewExpense) -> DbResult<Expense> {
        self.mutate("add_expense", move |s, ctx| {
            operations::add_expense(s, ctx, input)
        })
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn snapshot(&self) -> DbResult<Snapshot> {
        self.repo.load().await
    }

    pub async fn clients(&self, key: ClientSortKey, direction: SortDirection) -> DbResult<Vec<ClientView>> {
        let mut views = aggregate::client_views(&self.snapshot().await?);
        sort::sort_clients(&mut views, key, direction);
        Ok(views)
    }

    pub async fn client(&self, client_id: &str) -> DbResult<ClientView> {
        aggregate::client_view(&self.snapshot().await?, client_id)
            .ok_or_else(|| DbError::not_found("Client", client_id))
    }

    pub async fn products(
        &self,
        key: ProductSortKey,
        direction: SortDirection,
    ) -> DbResult<Vec<ProductView>> {
        let mut views = aggregate::inventory(&self.snapshot().await?).products;
        sort::sort_products(&mut views, key, direction);
        Ok(views)
    }

    pub async fn orders(&self, key: OrderSortKey, direction: SortDirection) -> DbResult<Vec<Order>> {
        let mut orders = self.snapshot().await?.orders;
        sort::sort_orders(&mut orders, key, direction);
        Ok(orders)
    }

    pub async fn inventory(&self) -> DbResult<InventorySummary> {
        Ok(aggregate::inventory(&self.snapshot().await?))
    }

    pub async fn report(&self, range: DateRange) -> DbResult<Report> {
        Ok(report::build(&self.snapshot().await?, range, self.top_n))
    }

    /// Inconsistencies in the stored data. Empty for any store written only
    /// through the ledger.
    pub async fn integrity_issues(&self) -> DbResult<Vec<IntegrityIssue>> {
        let issues = self.snapshot().await?.integrity_issues();
        for issue in &issues {
            warn!(%issue, "Integrity issue");
        }
        Ok(issues)
    }

    // =========================================================================
    // Import / Export
    // =========================================================================

    pub async fn export_json(&self) -> DbResult<String> {
        Ok(transfer::export_json(&self.snapshot().await?)?)
    }

    pub async fn export_table(&self, kind: TableKind) -> DbResult<String> {
        Ok(transfer::export_table(kind, &self.snapshot().await?)?)
    }

    /// Replaces the whole store with an export document. The document is
    /// validated in full first; a rejected import leaves the store as it was.
    ///
    /// Returns the number of records imported.
    pub async fn import_json(&self, text: &str) -> DbResult<usize> {
        let snapshot = transfer::import_json(text).map_err(|e| {
            warn!(error = %e, "Import rejected");
            e
        })?;

        let _guard = self.writer.lock().await;
        self.repo.replace_all(&snapshot).await?;

        let records = snapshot.record_count();
        info!(records, actor = %self.actor, "Snapshot imported");
        Ok(records)
    }

    /// Deletes every record.
    pub async fn wipe(&self) -> DbResult<()> {
        let _guard = self.writer.lock().await;
        self.repo.wipe().await?;
        warn!(actor = %self.actor, "Ledger wiped");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tally_core::tier::LineRequest;
    use tally_core::{CoreError, LogAction, OrderStatus, Tier, UnitKind};

    async fn ledger() -> Ledger {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Ledger::new(db, "admin")
    }

    async fn seeded(ledger: &Ledger) -> (Client, Product) {
        let client = ledger
            .create_client(NewClient {
                name: "Sam".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let product = ledger
            .create_product(NewProduct {
                name: "Blue Dream".to_string(),
                unit: UnitKind::Mass,
                stock: Quantity::from_units(10),
                unit_cost: Money::from_cents(400),
                min_increment: None,
                tiers: vec![
                    Tier::new("1g", Quantity::from_units(1), Money::from_cents(1000)),
                    Tier::new("3.5g", Quantity::from_milli(3500), Money::from_cents(3000)),
                ],
            })
            .await
            .unwrap();
        (client, product)
    }

    fn draft(client: &Client, lines: Vec<LineRequest>) -> OrderDraft {
        OrderDraft {
            client_id: client.id.clone(),
            lines,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_order_lifecycle_persists() {
        let ledger = ledger().await;
        let (client, product) = seeded(&ledger).await;

        let order = ledger
            .create_order(draft(&client, vec![LineRequest::tier(&product.id, "3.5g")]))
            .await
            .unwrap();
        assert_eq!(order.total, Money::from_cents(3000));
        assert_eq!(order.status, OrderStatus::Unpaid);

        let stored = ledger.snapshot().await.unwrap();
        assert_eq!(
            stored.product(&product.id).unwrap().stock,
            Quantity::from_milli(6500)
        );

        let paid = ledger.mark_paid(&order.id).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Completed);
        assert_eq!(ledger.client(&client.id).await.unwrap().stats.balance, Money::zero());

        ledger.delete_order(&order.id).await.unwrap();
        let stored = ledger.snapshot().await.unwrap();
        assert!(stored.orders.is_empty());
        assert_eq!(stored.product(&product.id).unwrap().stock, Quantity::from_units(10));
        assert!(ledger.integrity_issues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_operation_writes_nothing() {
        let ledger = ledger().await;
        let (client, product) = seeded(&ledger).await;
        let before = ledger.snapshot().await.unwrap();

        let err = ledger
            .create_order(draft(
                &client,
                vec![LineRequest::quantity(&product.id, Quantity::from_units(11))],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
        assert_eq!(ledger.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_every_mutation_is_logged() {
        let ledger = ledger().await;
        let (_, product) = seeded(&ledger).await;
        ledger
            .replenish_stock(&product.id, Quantity::from_units(10), Money::from_cents(6000))
            .await
            .unwrap();

        let snapshot = ledger.snapshot().await.unwrap();
        let actions: Vec<LogAction> = snapshot.logs.iter().map(|l| l.action).collect();
        assert_eq!(
            actions,
            vec![
                LogAction::ClientCreated,
                LogAction::ProductCreated,
                LogAction::StockReplenished
            ]
        );
        assert!(snapshot.logs.iter().all(|l| l.actor == "admin"));
        assert_eq!(snapshot.expenses.len(), 1);
        // (10 × 4.00 + 60.00) / 20
        assert_eq!(snapshot.products[0].unit_cost, Money::from_cents(500));
    }

    #[tokio::test]
    async fn test_sorted_reads() {
        let ledger = ledger().await;
        for name in ["carol", "Alice", "bob"] {
            ledger
                .create_client(NewClient {
                    name: name.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let names: Vec<String> = ledger
            .clients(ClientSortKey::Name, SortDirection::Ascending)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.client.name)
            .collect();
        assert_eq!(names, vec!["Alice", "bob", "carol"]);

        let numbers: Vec<u32> = ledger
            .clients(ClientSortKey::Number, SortDirection::Descending)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.client.number)
            .collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let source = ledger().await;
        let (client, product) = seeded(&source).await;
        source
            .create_order(draft(&client, vec![LineRequest::tier(&product.id, "1g")]))
            .await
            .unwrap();
        let text = source.export_json().await.unwrap();

        let target = ledger().await;
        seeded(&target).await;
        let imported = target.import_json(&text).await.unwrap();

        let snapshot = target.snapshot().await.unwrap();
        assert_eq!(snapshot, source.snapshot().await.unwrap());
        assert_eq!(imported, snapshot.record_count());
    }

    #[tokio::test]
    async fn test_bad_import_keeps_store() {
        let ledger = ledger().await;
        seeded(&ledger).await;
        let before = ledger.snapshot().await.unwrap();

        let err = ledger.import_json(r#"{"clients": []}"#).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(ledger.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_report_and_wipe() {
        let ledger = ledger().await;
        let (client, product) = seeded(&ledger).await;
        ledger
            .create_order(OrderDraft {
                amount_paid: Money::from_cents(1000),
                ..draft(&client, vec![LineRequest::tier(&product.id, "1g")])
            })
            .await
            .unwrap();

        let report = ledger.report(DateRange::all()).await.unwrap();
        assert_eq!(report.summary.revenue, Money::from_cents(1000));
        assert_eq!(report.summary.profit, Money::from_cents(600));
        assert_eq!(report.top_clients[0].client_id, client.id);

        let table = ledger.export_table(TableKind::Orders).await.unwrap();
        assert_eq!(table.lines().count(), 2);

        ledger.wipe().await.unwrap();
        assert!(ledger.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_see_whole_commits_while_writing() {
        const ORDERS: usize = 150;
        let initial = Quantity::from_units(1000);

        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("tally.db")))
            .await
            .unwrap();
        let ledger = Arc::new(Ledger::new(db, "admin"));

        let client = ledger
            .create_client(NewClient {
                name: "Sam".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let product = ledger
            .create_product(NewProduct {
                name: "Pre-roll".to_string(),
                unit: UnitKind::Count,
                stock: initial,
                unit_cost: Money::from_cents(300),
                min_increment: None,
                tiers: vec![],
            })
            .await
            .unwrap();

        let writer = {
            let ledger = Arc::clone(&ledger);
            let line =
                LineRequest::custom(&product.id, Quantity::from_units(1), Money::from_cents(800));
            let order = draft(&client, vec![line]);
            tokio::spawn(async move {
                for _ in 0..ORDERS {
                    ledger.create_order(order.clone()).await.unwrap();
                }
            })
        };

        let mut reads = 0;
        while !writer.is_finished() {
            let snapshot = ledger.snapshot().await.unwrap();
            let stock = snapshot.product(&product.id).unwrap().stock.milli();
            let sold: i64 = snapshot
                .orders
                .iter()
                .flat_map(|o| o.items.iter())
                .map(|item| item.quantity.milli())
                .sum();
            assert_eq!(stock + sold, initial.milli(), "torn read after {} reads", reads);
            reads += 1;
        }
        writer.await.unwrap();

        let snapshot = ledger.snapshot().await.unwrap();
        assert_eq!(snapshot.orders.len(), ORDERS);
        assert_eq!(
            snapshot.product(&product.id).unwrap().stock,
            Quantity::from_units(1000 - ORDERS as i64)
        );
    }
}
