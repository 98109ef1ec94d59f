//! # Seed Data Generator
//!
//! Populates a ledger with demo clients, products, orders and expenses for
//! dashboard development. Everything goes through the Ledger, so the seeded
//! store is reconciled exactly as real use would leave it.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (tally.toml / TALLY_DB_PATH)
//! cargo run -p tally-db --bin seed
//!
//! # Seed a specific file with 200 orders
//! cargo run -p tally-db --bin seed -- --db ./tally_dev.db --orders 200
//! ```
//!
//! Logging follows `RUST_LOG` (default `info,tally=debug,sqlx=warn`).

use std::env;
use std::path::PathBuf;

use tally_core::operations::{NewClient, NewExpense, NewProduct, OrderDraft};
use tally_core::report::DateRange;
use tally_core::tier::LineRequest;
use tally_core::{Adjustment, Money, PaymentMethod, Quantity, Tier, UnitKind};
use tally_db::{Ledger, LedgerConfig};
use tracing_subscriber::EnvFilter;

const CLIENTS: &[(&str, &str)] = &[
    ("Sam Rivera", "555-0101"),
    ("Alex Chen", "555-0102"),
    ("Jordan Blake", "555-0103"),
    ("Casey Morgan", "555-0104"),
    ("Riley Park", "555-0105"),
    ("Taylor Quinn", "555-0106"),
];

/// (name, stock in grams, unit cost in cents per gram, tiers as (label, milli-grams, cents))
const FLOWER: &[(&str, i64, i64, &[(&str, i64, i64)])] = &[
    ("Blue Dream", 250, 400, &[("1g", 1000, 1000), ("3.5g", 3500, 3000), ("7g", 7000, 5500)]),
    ("OG Kush", 180, 450, &[("1g", 1000, 1200), ("3.5g", 3500, 3500)]),
    ("Sour Diesel", 120, 380, &[("1g", 1000, 1000), ("3.5g", 3500, 2800), ("14g", 14000, 9500)]),
];

/// (name, stock in pieces, unit cost in cents, tiers as (label, milli-pieces, cents))
const PACKAGED: &[(&str, i64, i64, &[(&str, i64, i64)])] = &[
    ("Gummies 10pk", 40, 800, &[("1 pack", 1000, 2000), ("3 packs", 3000, 5500)]),
    ("Pre-roll", 60, 300, &[("single", 1000, 800), ("5 pack", 5000, 3500)]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut orders: usize = 40;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    orders = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>     Number of orders to generate (default: 40)");
                println!("  -d, --db <PATH>      Database file (default: from tally.toml)");
                println!("      --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", config.database_path().display());
    println!("Orders:   {}", orders);
    println!();

    let ledger = Ledger::open(&config).await?;

    let existing = ledger.database().snapshots().record_count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} records", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut client_ids = Vec::new();
    for (name, phone) in CLIENTS {
        let client = ledger
            .create_client(NewClient {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                ..Default::default()
            })
            .await?;
        client_ids.push(client.id);
    }
    println!("✓ {} clients", client_ids.len());

    // (product id, tier labels)
    let mut catalogue: Vec<(String, Vec<String>)> = Vec::new();
    let groups = [(UnitKind::Mass, FLOWER), (UnitKind::Count, PACKAGED)];
    for (unit, rows) in groups {
        for (name, stock, unit_cost, tiers) in rows {
            let product = ledger
                .create_product(NewProduct {
                    name: name.to_string(),
                    unit,
                    stock: Quantity::from_units(*stock),
                    unit_cost: Money::from_cents(*unit_cost),
                    min_increment: None,
                    tiers: tiers
                        .iter()
                        .map(|(label, qty, price)| {
                            Tier::new(*label, Quantity::from_milli(*qty), Money::from_cents(*price))
                        })
                        .collect(),
                })
                .await?;
            let labels = product.tiers.iter().map(|t| t.label.clone()).collect();
            catalogue.push((product.id, labels));
        }
    }
    println!("✓ {} products", catalogue.len());

    let mut created = 0;
    for n in 0..orders {
        let (draft, settle) = demo_order(n, &client_ids, &catalogue);
        match ledger.create_order(draft).await {
            Ok(order) => {
                created += 1;
                if settle {
                    ledger.mark_paid(&order.id).await?;
                }
            }
            // stock runs out on long runs; that is fine for demo data
            Err(e) if e.is_rejection() => tracing::debug!(order = n, error = %e, "Skipped order"),
            Err(e) => return Err(e.into()),
        }
    }
    println!("✓ {} orders ({} skipped)", created, orders - created);

    if let Some((product_id, _)) = catalogue.first() {
        ledger
            .replenish_stock(product_id, Quantity::from_units(100), Money::from_cents(42_000))
            .await?;
    }
    for (description, cents, category) in [
        ("Rent", 120_000, "Overhead"),
        ("Delivery fuel", 6_500, "Transport"),
        ("Packaging", 3_200, ""),
    ] {
        ledger
            .add_expense(NewExpense {
                date: None,
                description: description.to_string(),
                amount: Money::from_cents(cents),
                category: Some(category.to_string()),
            })
            .await?;
    }
    println!("✓ Restock and expenses recorded");

    let report = ledger.report(DateRange::all()).await?;
    println!();
    println!("Revenue:    {}", report.summary.revenue);
    println!("Profit:     {}", report.summary.profit);
    println!("Net income: {}", report.summary.net_income);
    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    ledger.database().close().await;
    Ok(())
}

/// Builds the n-th demo order and whether to settle it in full afterwards.
/// Deterministic, so reruns on an empty database produce the same shape.
fn demo_order(
    n: usize,
    clients: &[String],
    catalogue: &[(String, Vec<String>)],
) -> (OrderDraft, bool) {
    let (product_id, labels) = &catalogue[n % catalogue.len()];

    let mut lines = vec![LineRequest::tier(product_id, labels[n % labels.len()].as_str())];
    if n % 3 == 0 {
        let (other, _) = &catalogue[(n + 1) % catalogue.len()];
        lines.push(LineRequest::quantity(other, Quantity::from_milli(1500)));
    }

    let fee = if n % 4 == 0 {
        Adjustment::new(Money::from_cents(500), "delivery")
    } else {
        Adjustment::none()
    };
    let discount = if n % 5 == 0 {
        Adjustment::new(Money::from_cents(250), "loyalty")
    } else {
        Adjustment::none()
    };

    // every third order left unpaid, every fifth part-paid, every seventh parked
    let draft = n % 7 == 6;
    let part_paid = n % 5 == 2;
    let amount_paid = if part_paid {
        Money::from_cents(1000)
    } else {
        Money::zero()
    };
    let payment_methods = match n % 3 {
        0 if !part_paid => vec![],
        1 => vec![PaymentMethod::Cash],
        _ => vec![PaymentMethod::Transfer],
    };
    let settle = !draft && !part_paid && n % 3 != 0;

    let order = OrderDraft {
        client_id: clients[n % clients.len()].clone(),
        lines,
        notes: None,
        date: None,
        amount_paid,
        payment_methods,
        fee,
        discount,
        draft,
    };
    (order, settle)
}
