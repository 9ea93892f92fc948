//! Per-run counters.

use std::fmt;

use chrono::{DateTime, Utc};

use super::reconcile::ReconcileOutcome;

/// Counters for one import or discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Organizations marked inactive after a not-found response
    pub inactive: usize,
    /// Transient fetch errors, unknown seeds and failed writes
    pub failed: usize,
    pub history_entries: usize,
    /// Listing pages that could not be fetched during discovery
    pub failed_pages: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            inserted: 0,
            updated: 0,
            unchanged: 0,
            inactive: 0,
            failed: 0,
            history_entries: 0,
            failed_pages: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Count a successful reconciliation.
    pub fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Inserted => self.inserted += 1,
            ReconcileOutcome::Updated { .. } => self.updated += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
        self.history_entries += outcome.history_count();
    }

    /// Organizations the run attempted. Failed listing pages are not
    /// organizations and are not counted.
    pub fn processed(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.inactive + self.failed
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_secs(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed: {} inserted, {} updated, {} unchanged, {} inactive, {} failed; {} history entries in {:.1}s",
            self.processed(),
            self.inserted,
            self.updated,
            self.unchanged,
            self.inactive,
            self.failed,
            self.history_entries,
            self.duration_secs()
        )?;
        if self.failed_pages > 0 {
            write!(f, "; {} listing pages failed", self.failed_pages)?;
        }
        Ok(())
    }
}
