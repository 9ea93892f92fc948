//! Service layer for the importer.
//!
//! This module contains the source-site access:
//! - Listing markup parsing (`OrgParser`)
//! - Directory API client (`RsiClient`)
//! - The `OrgSource` seam the pipeline fetches through

mod orgs;
mod parser;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::Organization;

pub use orgs::RsiClient;
pub use parser::OrgParser;

/// Read-only access to the organization directory.
#[async_trait]
pub trait OrgSource: Send + Sync {
    /// Fetch the current record of one organization.
    ///
    /// Fails with [`FetchError::NotFound`] when the site no longer knows the
    /// symbol, [`FetchError::Transient`] for anything worth retrying later.
    async fn fetch_organization(&self, symbol: &str) -> Result<Organization, FetchError>;

    /// Fetch one page of the directory listing. An empty page ends the listing.
    async fn fetch_listing(&self, sort: &str, page: u32) -> Result<Vec<Organization>, FetchError>;
}
