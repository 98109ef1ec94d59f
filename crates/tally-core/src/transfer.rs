//! # Import/Export
//!
//! The full data set as one versionless JSON document, plus a tabular
//! (comma-separated) export per entity kind.
//!
//! ## JSON Snapshot Format
//! ```text
//! {
//!   "clients":  [ Client, ... ],
//!   "products": [ Product, ... ],
//!   "orders":   [ Order, ... ],
//!   "expenses": [ Expense, ... ],
//!   "logs":     [ LogEntry, ... ]
//! }
//! ```
//!
//! Import is all-or-nothing: the document is fully validated into a
//! [`Snapshot`] before the caller replaces anything, and every rejection
//! names the offending key.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::snapshot::Snapshot;

/// Top-level keys of the export document, in order.
pub const SNAPSHOT_KEYS: [&str; 5] = ["clients", "products", "orders", "expenses", "logs"];

// =============================================================================
// JSON Snapshot
// =============================================================================

/// Serializes the whole snapshot.
pub fn export_json(snapshot: &Snapshot) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Parses and validates an export document into a replacement snapshot.
///
/// ## Errors
/// `InvalidImport` when the text is not JSON, a key is missing or not an
/// array, a record fails to parse, or an id repeats within a collection.
pub fn import_json(text: &str) -> CoreResult<Snapshot> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| CoreError::InvalidImport(format!("not valid JSON: {}", e)))?;

    let Value::Object(mut root) = document else {
        return Err(CoreError::InvalidImport(
            "top level must be an object".to_string(),
        ));
    };

    let snapshot = Snapshot {
        clients: collection(&mut root, "clients")?,
        products: collection(&mut root, "products")?,
        orders: collection(&mut root, "orders")?,
        expenses: collection(&mut root, "expenses")?,
        logs: collection(&mut root, "logs")?,
    };

    unique_ids("clients", snapshot.clients.iter().map(|c| c.id.as_str()))?;
    unique_ids("products", snapshot.products.iter().map(|p| p.id.as_str()))?;
    unique_ids("orders", snapshot.orders.iter().map(|o| o.id.as_str()))?;
    unique_ids("expenses", snapshot.expenses.iter().map(|e| e.id.as_str()))?;
    unique_ids("logs", snapshot.logs.iter().map(|l| l.id.as_str()))?;

    Ok(snapshot)
}

fn collection<T: DeserializeOwned>(root: &mut Map<String, Value>, key: &str) -> CoreResult<Vec<T>> {
    let value = root
        .remove(key)
        .ok_or_else(|| CoreError::InvalidImport(format!("missing '{}'", key)))?;

    let Value::Array(records) = value else {
        return Err(CoreError::InvalidImport(format!("'{}' must be an array", key)));
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record)
                .map_err(|e| CoreError::InvalidImport(format!("'{}'[{}]: {}", key, index, e)))
        })
        .collect()
}

fn unique_ids<'a>(key: &str, ids: impl Iterator<Item = &'a str>) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CoreError::InvalidImport(format!(
                "'{}' contains duplicate id {}",
                key, id
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Tabular Export
// =============================================================================

/// Which collection to export as a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Clients,
    Products,
    Orders,
    Expenses,
    Logs,
}

const DELIMITER: char = ',';

/// Renders one collection as comma-separated text.
///
/// The header row comes from the first record's field names. `null` renders
/// as an empty cell and nested arrays/objects as compact JSON. An empty
/// collection renders as an empty string.
pub fn export_table(kind: TableKind, snapshot: &Snapshot) -> CoreResult<String> {
    let rows = match kind {
        TableKind::Clients => to_rows(&snapshot.clients)?,
        TableKind::Products => to_rows(&snapshot.products)?,
        TableKind::Orders => to_rows(&snapshot.orders)?,
        TableKind::Expenses => to_rows(&snapshot.expenses)?,
        TableKind::Logs => to_rows(&snapshot.logs)?,
    };
    Ok(render_table(&rows))
}

fn to_rows<T: Serialize>(records: &[T]) -> CoreResult<Vec<Value>> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(CoreError::from))
        .collect()
}

/// Renders JSON objects as delimited text.
pub fn render_table(rows: &[Value]) -> String {
    let Some(Value::Object(first)) = rows.first() else {
        return String::new();
    };
    let header: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        header
            .iter()
            .map(|h| quote(h))
            .collect::<Vec<_>>()
            .join(&DELIMITER.to_string()),
    );

    for row in rows {
        let cells: Vec<String> = header
            .iter()
            .map(|key| quote(&cell(row.get(key.as_str()))))
            .collect();
        lines.push(cells.join(&DELIMITER.to_string()));
    }

    lines.join("\n")
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => nested.to_string(),
        Some(scalar) => scalar.to_string(),
    }
}

fn quote(text: &str) -> String {
    if text.contains(|c: char| c == DELIMITER || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
