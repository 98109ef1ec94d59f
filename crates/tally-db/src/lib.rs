//! # tally-db: Storage and Ledger Service for Tally
//!
//! This crate persists the Tally snapshot in SQLite and exposes the
//! [`Ledger`], the async service that runs every tally-core operation
//! against the store.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Dashboard (create order, record payment, view report)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Ledger     │    │  Repository   │    │  Migrations  │  │   │
//! │  │   │  (ledger.rs)  │───►│ (snapshot.rs) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ writer lock   │    │ load          │    │ 001_initial  │  │   │
//! │  │   │ tally-core ops│    │ commit        │    │ _schema.sql  │  │   │
//! │  │   │ reports       │    │ replace_all   │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │   LedgerConfig (config.rs)     │  Database (pool.rs)           │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/tally/tally.db (or TALLY_DB_PATH)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`ledger`] - The Ledger service
//! - [`config`] - tally.toml + environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`repository`] - Snapshot persistence
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Ledger, LedgerConfig};
//!
//! let config = LedgerConfig::load(None)?;
//! let ledger = Ledger::open(&config).await?;
//!
//! let client = ledger.create_client(NewClient { name: "Sam".into(), ..Default::default() }).await?;
//! let report = ledger.report(DateRange::all()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::LedgerConfig;
pub use error::{DbError, DbResult};
pub use ledger::Ledger;
pub use pool::{Database, DbConfig, DbLocation};
pub use repository::SnapshotRepository;
