// src/pipeline/reconcile.rs

//! Snapshot-and-history reconciliation for one fetched organization.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{FieldChange, HistoryEntry, Organization};
use crate::storage::OrgStore;

use super::diff::diff_fields;

/// What reconciling one record did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First observation; stored as the baseline without history
    Inserted,
    /// Tracked fields changed; one history row per change
    Updated { changes: Vec<FieldChange> },
    /// Only `last_seen` was refreshed
    Unchanged,
}

impl ReconcileOutcome {
    /// Number of history rows written.
    pub fn history_count(&self) -> usize {
        match self {
            ReconcileOutcome::Updated { changes } => changes.len(),
            _ => 0,
        }
    }
}

/// Reconcile a freshly fetched record against the stored snapshot.
///
/// Every write for the organization happens in one transaction: on error
/// nothing is committed and the store is left as it was.
pub fn reconcile(
    store: &mut OrgStore,
    fetched: &Organization,
    observed_at: DateTime<Utc>,
) -> Result<ReconcileOutcome> {
    let tx = store.transaction()?;

    let outcome = match tx.snapshot(&fetched.symbol)? {
        None => {
            tx.insert_snapshot(fetched, observed_at)?;
            ReconcileOutcome::Inserted
        }
        Some(prior) => {
            let symbol = prior.symbol();
            if !prior.is_active() {
                log::info!("{symbol}: listed again, reactivating");
            }

            let changes = diff_fields(&prior.org, fetched);
            if changes.is_empty() {
                tx.touch(symbol, observed_at)?;
                ReconcileOutcome::Unchanged
            } else {
                for change in &changes {
                    tx.append_history(&HistoryEntry::from_change(symbol, change, observed_at))?;
                }
                tx.update_fields(symbol, fetched, &changes, observed_at)?;
                ReconcileOutcome::Updated { changes }
            }
        }
    };

    tx.commit()?;
    Ok(outcome)
}
