//! # Snapshot Repository
//!
//! Stores every collection as one row per record: the record's id, its
//! insertion position, and the record serialized as JSON.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ChangeSet                                                              │
//! │    clients/products/orders ──► upsert (new rows go to the end,          │
//! │                                 existing rows keep their position)      │
//! │    removed_orders          ──► delete                                   │
//! │    expenses, log           ──► append                                   │
//! │                                                                         │
//! │  BEGIN ─── all of the above ─── COMMIT                                  │
//! │  (any failure rolls the whole set back)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tally_core::{ChangeSet, Snapshot};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const CLIENTS: &str = "clients";
const PRODUCTS: &str = "products";
const ORDERS: &str = "orders";
const EXPENSES: &str = "expenses";
const ACTIVITY_LOG: &str = "activity_log";

/// Every table the repository owns.
pub const TABLES: [&str; 5] = [CLIENTS, PRODUCTS, ORDERS, EXPENSES, ACTIVITY_LOG];

/// Repository for the whole ledger snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    pool: SqlitePool,
}

impl SnapshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SnapshotRepository { pool }
    }

    /// Loads every collection in insertion order.
    ///
    /// All five tables are read inside one transaction, so a commit landing
    /// mid-load is either wholly visible or not at all.
    pub async fn load(&self) -> DbResult<Snapshot> {
        let mut tx = self.begin().await?;

        let snapshot = Snapshot {
            clients: load_table(&mut tx, CLIENTS).await?,
            products: load_table(&mut tx, PRODUCTS).await?,
            orders: load_table(&mut tx, ORDERS).await?,
            expenses: load_table(&mut tx, EXPENSES).await?,
            logs: load_table(&mut tx, ACTIVITY_LOG).await?,
        };

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(records = snapshot.record_count(), "Snapshot loaded");
        Ok(snapshot)
    }

    /// Total rows across every table.
    pub async fn record_count(&self) -> DbResult<usize> {
        let mut total = 0usize;
        for table in TABLES {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await?;
            total += count as usize;
        }
        Ok(total)
    }

    /// Writes one operation's changes atomically.
    pub async fn commit(&self, changes: &ChangeSet) -> DbResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.begin().await?;

        for client in &changes.clients {
            upsert(&mut tx, CLIENTS, &client.id, client).await?;
        }
        for product in &changes.products {
            upsert(&mut tx, PRODUCTS, &product.id, product).await?;
        }
        for order in &changes.orders {
            upsert(&mut tx, ORDERS, &order.id, order).await?;
        }
        for id in &changes.removed_orders {
            sqlx::query("DELETE FROM orders WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        for expense in &changes.expenses {
            upsert(&mut tx, EXPENSES, &expense.id, expense).await?;
        }
        if let Some(entry) = &changes.log {
            upsert(&mut tx, ACTIVITY_LOG, &entry.id, entry).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            clients = changes.clients.len(),
            products = changes.products.len(),
            orders = changes.orders.len(),
            removed = changes.removed_orders.len(),
            expenses = changes.expenses.len(),
            "ChangeSet committed"
        );
        Ok(())
    }

    /// Replaces the entire store with `snapshot` in one transaction.
    pub async fn replace_all(&self, snapshot: &Snapshot) -> DbResult<()> {
        let mut tx = self.begin().await?;

        clear(&mut tx).await?;
        insert_all(&mut tx, CLIENTS, snapshot.clients.iter().map(|c| (c.id.as_str(), c))).await?;
        insert_all(&mut tx, PRODUCTS, snapshot.products.iter().map(|p| (p.id.as_str(), p))).await?;
        insert_all(&mut tx, ORDERS, snapshot.orders.iter().map(|o| (o.id.as_str(), o))).await?;
        insert_all(&mut tx, EXPENSES, snapshot.expenses.iter().map(|e| (e.id.as_str(), e))).await?;
        insert_all(&mut tx, ACTIVITY_LOG, snapshot.logs.iter().map(|l| (l.id.as_str(), l))).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(records = snapshot.record_count(), "Store replaced");
        Ok(())
    }

    /// Deletes every record.
    pub async fn wipe(&self) -> DbResult<()> {
        let mut tx = self.begin().await?;
        clear(&mut tx).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!("Store wiped");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

async fn load_table<T: DeserializeOwned>(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
) -> DbResult<Vec<T>> {
    let payloads: Vec<String> =
        sqlx::query_scalar(&format!("SELECT payload FROM {} ORDER BY position", table))
            .fetch_all(&mut **tx)
            .await?;

    payloads
        .iter()
        .map(|payload| serde_json::from_str(payload).map_err(|e| DbError::payload(table, e)))
        .collect()
}

/// Inserts at the end of the table, or rewrites the payload in place.
async fn upsert<T: Serialize>(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    id: &str,
    record: &T,
) -> DbResult<()> {
    let payload = serde_json::to_string(record).map_err(|e| DbError::payload(table, e))?;

    let sql = format!(
        "INSERT INTO {table} (id, position, payload) \
         VALUES (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM {table}), ?2) \
         ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
        table = table
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(payload)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn insert_all<'a, T: Serialize + 'a>(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    records: impl Iterator<Item = (&'a str, &'a T)>,
) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO {} (id, position, payload) VALUES (?1, ?2, ?3)",
        table
    );

    for (position, (id, record)) in records.enumerate() {
        let payload = serde_json::to_string(record).map_err(|e| DbError::payload(table, e))?;
        sqlx::query(&sql)
            .bind(id)
            .bind(position as i64 + 1)
            .bind(payload)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

async fn clear(tx: &mut Transaction<'_, Sqlite>) -> DbResult<()> {
    for table in TABLES {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tally_core::{Client, LogAction, OpContext};

    async fn repo() -> SnapshotRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().snapshots()
    }

    fn ctx() -> OpContext {
        OpContext::new("admin", Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    fn client(ctx: &OpContext, number: u32, name: &str) -> Client {
        Client {
            id: ctx.new_id(),
            number,
            name: name.to_string(),
            phone: None,
            email: None,
            address: None,
            notes: None,
            created_at: ctx.at,
        }
    }

    #[tokio::test]
    async fn test_empty_store_loads_empty_snapshot() {
        let repo = repo().await;
        assert!(repo.load().await.unwrap().is_empty());
        assert_eq!(repo.record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_appends_and_updates_in_place() {
        let repo = repo().await;
        let ctx = ctx();
        let mut first = client(&ctx, 1, "Sam");
        let second = client(&ctx, 2, "Alex");

        repo.commit(&ChangeSet {
            clients: vec![first.clone(), second.clone()],
            log: Some(ctx.log(LogAction::ClientCreated, json!({"n": 2}))),
            ..Default::default()
        })
        .await
        .unwrap();

        first.name = "Samantha".to_string();
        repo.commit(&ChangeSet {
            clients: vec![first.clone()],
            ..Default::default()
        })
        .await
        .unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.clients, vec![first, second]);
        assert_eq!(loaded.logs.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_all_then_wipe() {
        let repo = repo().await;
        let ctx = ctx();
        let snapshot = Snapshot {
            clients: vec![client(&ctx, 1, "Sam"), client(&ctx, 2, "Alex")],
            ..Default::default()
        };

        repo.commit(&ChangeSet {
            clients: vec![client(&ctx, 9, "Gone")],
            ..Default::default()
        })
        .await
        .unwrap();
        repo.replace_all(&snapshot).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), snapshot);

        repo.wipe().await.unwrap();
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_reported() {
        let repo = repo().await;
        sqlx::query("INSERT INTO clients (id, position, payload) VALUES ('x', 1, '{oops')")
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.load().await.unwrap_err();
        assert!(matches!(err, DbError::Serialization { ref table, .. } if table == "clients"));
    }
}
