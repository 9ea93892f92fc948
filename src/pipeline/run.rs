// src/pipeline/run.rs

//! Periodic import run.
//!
//! Refreshes every tracked organization one at a time. Per-organization
//! failures are logged and counted; only setup problems abort the run.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{FetchError, Result};
use crate::models::{Config, Organization};
use crate::services::OrgSource;
use crate::storage::OrgStore;

use super::reconcile::{ReconcileOutcome, reconcile};
use super::summary::RunSummary;

/// Run one import cycle over the tracked organizations.
pub async fn run_import(
    config: &Config,
    source: &dyn OrgSource,
    store: &mut OrgStore,
) -> Result<RunSummary> {
    let mut summary = RunSummary::start();
    let symbols = tracked_symbols(config, store, summary.started_at)?;
    log::info!("Import starting: {} organizations to refresh", symbols.len());
    if symbols.is_empty() {
        log::warn!(
            "No active organizations and no seeds configured; run `orgwatch discover` or `orgwatch run --discover`"
        );
    }

    let delay = Duration::from_millis(config.source.request_delay_ms);
    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match source.fetch_organization(symbol).await {
            Ok(org) => apply_fetched(store, &org, &mut summary),
            Err(FetchError::NotFound { .. }) => deactivate(store, symbol, &mut summary),
            Err(e) => {
                summary.failed += 1;
                log::warn!("{symbol}: skipped ({}): {e}", e.kind());
            }
        }
    }

    summary.finish();
    log::info!("Import finished: {summary}");
    Ok(summary)
}

/// Symbols refreshed by a run: stored active organizations followed by the
/// configured seeds, without duplicates.
pub fn tracked_symbols(
    config: &Config,
    store: &OrgStore,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let stale_before = match config.run.stale_after_hours {
        0 => None,
        hours => i64::try_from(hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .and_then(|age| now.checked_sub_signed(age)),
    };

    let stored = store.tracked_symbols(stale_before)?;
    let mut seen = HashSet::new();
    Ok(stored
        .into_iter()
        .chain(config.seed_symbols())
        .filter(|symbol| seen.insert(symbol.to_uppercase()))
        .collect())
}

/// Reconcile one fetched record and count the result.
pub(crate) fn apply_fetched(store: &mut OrgStore, org: &Organization, summary: &mut RunSummary) {
    match reconcile(store, org, Utc::now()) {
        Ok(outcome) => {
            match &outcome {
                ReconcileOutcome::Inserted => log::info!("{}: new organization", org.symbol),
                ReconcileOutcome::Updated { changes } => {
                    let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
                    log::info!("{}: changed {}", org.symbol, fields.join(", "));
                }
                ReconcileOutcome::Unchanged => log::debug!("{}: unchanged", org.symbol),
            }
            summary.record(&outcome);
        }
        Err(e) => {
            summary.failed += 1;
            log::error!("{}: write failed ({}): {e}", org.symbol, e.kind());
        }
    }
}

fn deactivate(store: &mut OrgStore, symbol: &str, summary: &mut RunSummary) {
    match store.mark_inactive(symbol) {
        Ok(true) => {
            summary.inactive += 1;
            log::warn!("{symbol}: no longer listed, marked inactive");
        }
        Ok(false) => {
            summary.failed += 1;
            log::warn!("{symbol}: not found and not stored, check the seed list");
        }
        Err(e) => {
            summary.failed += 1;
            log::error!("{symbol}: could not mark inactive ({}): {e}", e.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrgStatus;
    use crate::pipeline::testing::{FakeSource, org, test_config};
    use chrono::TimeZone;

    fn seeded_store(at: DateTime<Utc>) -> OrgStore {
        let mut store = OrgStore::open_in_memory().unwrap();
        for (symbol, name) in [("ORG1", "Alpha"), ("ORG2", "Beta"), ("ORG3", "Gamma")] {
            reconcile(&mut store, &org(symbol, name, 100), at).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_mixed_run() {
        let earlier = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let mut store = seeded_store(earlier);
        let source = FakeSource::new()
            .with_org(org("ORG1", "Alpha Corp", 100))
            .with_not_found("ORG2")
            .with_transient("ORG3");

        let summary = run_import(&test_config(), &source, &mut store).await.unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.inactive, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.history_entries, 1);
        assert!(summary.finished_at.is_some());

        let history = store.history("ORG1", None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].field, "name");
        assert_eq!(history[0].old_value.as_deref(), Some("Alpha"));
        assert_eq!(history[0].new_value.as_deref(), Some("Alpha Corp"));

        let org2 = store.snapshot("ORG2").unwrap().unwrap();
        assert_eq!(org2.status, OrgStatus::Inactive);
        assert_eq!(org2.org.name, "Beta");
        assert!(store.history("ORG2", None).unwrap().is_empty());

        let org3 = store.snapshot("ORG3").unwrap().unwrap();
        assert_eq!(org3.last_seen, earlier);
        assert_eq!(org3.org.name, "Gamma");
        assert!(store.history("ORG3", None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_moves_on_to_next_symbol() {
        let earlier = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let mut store = seeded_store(earlier);
        let source = FakeSource::new()
            .with_transient("ORG1")
            .with_org(org("ORG2", "Beta Prime", 100))
            .with_org(org("ORG3", "Gamma", 120));

        let summary = run_import(&test_config(), &source, &mut store).await.unwrap();

        assert_eq!(source.calls(), vec!["ORG1", "ORG2", "ORG3"]);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.history_entries, 2);

        let org1 = store.snapshot("ORG1").unwrap().unwrap();
        assert_eq!(org1.last_seen, earlier);
        assert!(org1.is_active());
        assert_eq!(store.snapshot("ORG2").unwrap().unwrap().org.name, "Beta Prime");
        assert_eq!(store.history("ORG3", None).unwrap()[0].field, "member_count");
    }

    #[tokio::test]
    async fn test_write_failure_rolls_back_and_run_continues() {
        let earlier = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let mut store = seeded_store(earlier);
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER fail_org2 BEFORE UPDATE ON organizations
                 WHEN OLD.symbol = 'ORG2'
                 BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
            )
            .unwrap();
        let source = FakeSource::new()
            .with_org(org("ORG1", "Alpha", 100))
            .with_org(org("ORG2", "Beta Prime", 100))
            .with_org(org("ORG3", "Gamma Prime", 100));

        let summary = run_import(&test_config(), &source, &mut store).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.history_entries, 1);

        // Nothing of the failed reconciliation is left behind.
        let org2 = store.snapshot("ORG2").unwrap().unwrap();
        assert_eq!(org2.org.name, "Beta");
        assert_eq!(org2.last_seen, earlier);
        assert!(store.history("ORG2", None).unwrap().is_empty());

        let org3 = store.snapshot("ORG3").unwrap().unwrap();
        assert_eq!(org3.org.name, "Gamma Prime");
        assert_eq!(store.history("ORG3", None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_organizations_are_not_refreshed() {
        let earlier = Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap();
        let mut store = seeded_store(earlier);
        store.mark_inactive("ORG2").unwrap();
        let source = FakeSource::new()
            .with_org(org("ORG1", "Alpha", 100))
            .with_org(org("ORG3", "Gamma", 100));

        let summary = run_import(&test_config(), &source, &mut store).await.unwrap();

        assert_eq!(summary.unchanged, 2);
        assert_eq!(source.calls(), vec!["ORG1", "ORG3"]);
    }

    #[tokio::test]
    async fn test_seed_symbols() {
        let mut store = OrgStore::open_in_memory().unwrap();
        let mut config = test_config();
        config.run.seed = vec!["org1".into(), "ORG1".into(), " NEW ".into()];
        let source = FakeSource::new().with_org(org("ORG1", "Alpha", 100));

        let summary = run_import(&config, &source, &mut store).await.unwrap();

        assert_eq!(source.calls(), vec!["ORG1", "NEW"]);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inactive, 0);
        assert!(store.snapshot("NEW").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_store_and_no_seeds() {
        let mut store = OrgStore::open_in_memory().unwrap();
        let source = FakeSource::new();

        let summary = run_import(&test_config(), &source, &mut store).await.unwrap();

        assert_eq!(summary.processed(), 0);
        assert!(source.calls().is_empty());
    }

    #[test]
    fn test_tracked_symbols_stale_filter() {
        let now = Utc.with_ymd_and_hms(2025, 4, 24, 12, 0, 0).unwrap();
        let mut store = OrgStore::open_in_memory().unwrap();
        reconcile(&mut store, &org("OLD", "Old", 1), now - TimeDelta::hours(30)).unwrap();
        reconcile(&mut store, &org("FRESH", "Fresh", 1), now - TimeDelta::hours(2)).unwrap();

        let mut config = test_config();
        assert_eq!(tracked_symbols(&config, &store, now).unwrap(), vec!["OLD", "FRESH"]);

        config.run.stale_after_hours = 24;
        config.run.seed = vec!["fresh".into()];
        assert_eq!(tracked_symbols(&config, &store, now).unwrap(), vec!["OLD", "FRESH"]);

        config.run.seed.clear();
        assert_eq!(tracked_symbols(&config, &store, now).unwrap(), vec!["OLD"]);
    }
}
