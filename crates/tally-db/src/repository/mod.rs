//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Ledger                                                                │
//! │       │                                                                 │
//! │       │  db.snapshots().load() / .commit(&changes)                     │
//! │       ▼                                                                 │
//! │  SnapshotRepository                                                    │
//! │  ├── load(&self)              → Snapshot                               │
//! │  ├── commit(&self, changes)   one transaction per ChangeSet            │
//! │  ├── replace_all(&self, snap) import / restore                         │
//! │  └── wipe(&self)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite: clients │ products │ orders │ expenses │ activity_log         │
//! │          (id, position, payload JSON)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SnapshotRepository`] - Whole-ledger load and transactional commit

pub mod snapshot;

pub use snapshot::{SnapshotRepository, TABLES};
