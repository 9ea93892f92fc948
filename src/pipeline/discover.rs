// src/pipeline/discover.rs

//! Listing sweep for organizations the store has not seen yet.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::Result;
use crate::models::Config;
use crate::services::OrgSource;
use crate::storage::OrgStore;

use super::run::apply_fetched;
use super::summary::RunSummary;

/// Walk the listing under each configured sort order and reconcile every
/// organization found.
///
/// A sort order stops at its first empty page, at `max_pages`, or at the
/// first failed page.
pub async fn run_discovery(
    config: &Config,
    source: &dyn OrgSource,
    store: &mut OrgStore,
) -> Result<RunSummary> {
    let mut summary = RunSummary::start();
    let delay = Duration::from_millis(config.source.request_delay_ms);
    let mut seen = HashSet::new();

    log::info!(
        "Discovery starting: {} sort orders, up to {} pages each",
        config.source.sort_methods.len(),
        config.source.max_pages
    );

    for sort in &config.source.sort_methods {
        for page in 1..=config.source.max_pages {
            let orgs = match source.fetch_listing(sort, page).await {
                Ok(orgs) => orgs,
                Err(e) => {
                    summary.failed_pages += 1;
                    log::warn!("Listing {sort} page {page} ({}): {e}", e.kind());
                    break;
                }
            };
            if orgs.is_empty() {
                log::debug!("Listing {sort} exhausted after {} pages", page - 1);
                break;
            }

            for org in orgs {
                if seen.insert(org.symbol.to_uppercase()) {
                    apply_fetched(store, &org, &mut summary);
                }
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    summary.finish();
    log::info!("Discovery finished: {summary}");
    Ok(summary)
}
