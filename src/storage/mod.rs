//! Persistence for organization snapshots and their change history.
//!
//! Two tables in SQLite:
//! - `organizations`: one mutable row per organization (the snapshot)
//! - `organization_history`: append-only, one row per observed field change
//!
//! ## File Layout
//!
//! ```text
//! data/
//! ├── organizations.db      # snapshot table (and history by default)
//! └── history.db            # optional: history table, attached as `history`
//! ```
//!
//! Both files share one connection, so a single transaction covers the
//! snapshot update and the history rows it produces.

mod schema;
pub mod sqlite;

// Re-export for convenience
pub use sqlite::{OrgStore, StoreTx};

/// Row counts reported by `info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub active: usize,
    pub inactive: usize,
    pub history_entries: usize,
}
