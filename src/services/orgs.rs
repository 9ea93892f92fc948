// src/services/orgs.rs

//! Organization directory client.
//!
//! Talks to the `orgs/getOrgs` endpoint of the RSI website. The endpoint
//! answers a JSON envelope whose `data.html` field carries the listing markup.

use std::future::Future;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::{FetchError, Result};
use crate::models::{Config, Organization};
use crate::services::{OrgParser, OrgSource};
use crate::utils::http;

const LIST_ENDPOINT: &str = "api/orgs/getOrgs";

const CODE_OK: &str = "OK";
const CODE_THROTTLED: &str = "ErrApiThrottled";
const CODE_INVALID_ORG: &str = "ErrInvalidOrganization";

/// JSON envelope returned by the directory API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// One page of listing markup and the total hit count the API reported.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListingPage {
    html: String,
    total_rows: Option<u64>,
}

/// Client for the RSI organization directory.
pub struct RsiClient {
    client: Client,
    list_url: Url,
    page_size: u32,
    max_pages: u32,
    parser: OrgParser,
}

impl RsiClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = http::create_client(&config.source)?;
        let base = Url::parse(&config.source.base_url)?;
        Ok(Self {
            client,
            list_url: base.join(LIST_ENDPOINT)?,
            page_size: config.source.page_size,
            max_pages: config.source.max_pages,
            parser: OrgParser::new(&config.selectors, &config.source.base_url)?,
        })
    }

    /// Request one listing page.
    async fn get_orgs(
        &self,
        context: &str,
        search: &str,
        sort: &str,
        page: u32,
    ) -> std::result::Result<ListingPage, FetchError> {
        let body = json!({
            "sort": sort,
            "search": search,
            "commitment": [],
            "roleplay": [],
            "size": [],
            "model": [],
            "activity": [],
            "language": [],
            "recruiting": [],
            "pagesize": self.page_size,
            "page": page,
        });

        let response = self
            .client
            .post(self.list_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::transient(context, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::transient(context, format!("HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::transient(context, e))?;

        extract_listing_html(context, &text)
    }
}

/// Classify an API envelope and pull out the listing markup.
fn extract_listing_html(context: &str, body: &str) -> std::result::Result<ListingPage, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::transient(context, "empty response"));
    }

    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::transient(context, format!("invalid JSON: {e}")))?;

    match response.code.as_str() {
        CODE_OK => {}
        CODE_INVALID_ORG => return Err(FetchError::not_found(context)),
        CODE_THROTTLED => return Err(FetchError::transient(context, "API throttled")),
        code => {
            return Err(FetchError::transient(
                context,
                format!("API error {code}: {}", response.msg),
            ));
        }
    }

    let data = response.data.as_ref();
    let html = data
        .and_then(|data| data.get("html"))
        .and_then(|html| html.as_str())
        .ok_or_else(|| FetchError::transient(context, "response has no data.html"))?;

    // Sent as a number or a numeric string.
    let total_rows = data.and_then(|data| data.get("totalrows")).and_then(|rows| {
        rows.as_u64()
            .or_else(|| rows.as_str().and_then(|s| s.trim().parse().ok()))
    });

    Ok(ListingPage {
        html: html.to_string(),
        total_rows,
    })
}

#[async_trait]
impl OrgSource for RsiClient {
    async fn fetch_organization(
        &self,
        symbol: &str,
    ) -> std::result::Result<Organization, FetchError> {
        search_symbol(symbol, self.page_size, self.max_pages, |page| async move {
            let listing = self.get_orgs(symbol, symbol, "", page).await?;
            Ok::<_, FetchError>((self.parser.parse_listing(&listing.html), listing.total_rows))
        })
        .await
    }

    async fn fetch_listing(
        &self,
        sort: &str,
        page: u32,
    ) -> std::result::Result<Vec<Organization>, FetchError> {
        let context = format!("listing page {page} ({sort})");
        let listing = self.get_orgs(&context, "", sort, page).await?;
        Ok(self.parser.parse_listing(&listing.html))
    }
}

/// Page through search results until the exact symbol shows up.
///
/// The search matches names and symbols by substring, so the wanted cell
/// can sit behind many partial hits. `NotFound` is only returned once the
/// results are exhausted; running into `max_pages` first is transient.
async fn search_symbol<F, Fut>(
    symbol: &str,
    page_size: u32,
    max_pages: u32,
    mut fetch_page: F,
) -> std::result::Result<Organization, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<(Vec<Organization>, Option<u64>), FetchError>>,
{
    let wanted = symbol.trim();

    for page in 1..=max_pages.max(1) {
        let (candidates, total_rows) = fetch_page(page).await?;
        let page_len = candidates.len();

        if let Some(org) = candidates
            .into_iter()
            .find(|org| org.symbol.eq_ignore_ascii_case(wanted))
        {
            return Ok(org);
        }

        let covered = u64::from(page) * u64::from(page_size);
        let exhausted = page_len == 0 || total_rows.is_some_and(|total| covered >= total);
        if exhausted {
            return Err(FetchError::not_found(symbol));
        }
    }

    Err(FetchError::transient(
        symbol,
        format!("no exact match within {max_pages} search pages"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::tests::cell_html;
    use std::future::ready;

    fn envelope(code: &str, html: &str, total_rows: serde_json::Value) -> String {
        let success = u8::from(code == CODE_OK);
        json!({
            "success": success,
            "code": code,
            "msg": "msg",
            "data": { "totalrows": total_rows, "html": html },
        })
        .to_string()
    }

    fn named(symbol: &str) -> Organization {
        Organization {
            symbol: symbol.into(),
            name: format!("{symbol} name"),
            ..Organization::default()
        }
    }

    /// One page of `symbols`, served `page_size` at a time.
    fn results(symbols: &[String], page: u32, page_size: u32) -> Vec<Organization> {
        symbols
            .iter()
            .skip(((page - 1) * page_size) as usize)
            .take(page_size as usize)
            .map(|s| named(s))
            .collect()
    }

    #[test]
    fn test_ok_envelope_yields_html() {
        let page = extract_listing_html("ORG1", &envelope("OK", "<div></div>", json!(1))).unwrap();
        assert_eq!(page.html, "<div></div>");
        assert_eq!(page.total_rows, Some(1));
    }

    #[test]
    fn test_total_rows_as_string_or_missing() {
        let page = extract_listing_html("ORG1", &envelope("OK", "", json!("30"))).unwrap();
        assert_eq!(page.total_rows, Some(30));

        let page = extract_listing_html("ORG1", r#"{"code":"OK","data":{"html":""}}"#).unwrap();
        assert_eq!(page.total_rows, None);
    }

    #[test]
    fn test_throttled_is_transient() {
        let err = extract_listing_html("ORG1", &envelope(CODE_THROTTLED, "", json!(0))).unwrap_err();
        assert!(matches!(err, FetchError::Transient { .. }));
    }

    #[test]
    fn test_invalid_org_is_not_found() {
        let err =
            extract_listing_html("ORG2", &envelope(CODE_INVALID_ORG, "", json!(0))).unwrap_err();
        assert!(matches!(err, FetchError::NotFound { ref symbol } if symbol == "ORG2"));
    }

    #[test]
    fn test_malformed_bodies_are_transient() {
        for body in ["", "   ", "not json", r#"{"code":"OK","data":[]}"#] {
            let err = extract_listing_html("ORG3", body).unwrap_err();
            assert!(
                matches!(err, FetchError::Transient { .. }),
                "body {body:?} should be transient"
            );
        }
    }

    #[tokio::test]
    async fn test_search_exact_match_on_first_page() {
        let parser = OrgParser::new(
            &crate::models::OrgSelectors::default(),
            "https://robertsspaceindustries.com",
        )
        .unwrap();
        let html = format!(
            "{}{}",
            cell_html("ORG10", "Other", "3"),
            cell_html("ORG1", "Alpha", "100")
        );

        let org = search_symbol("org1", 12, 5, |_| {
            ready(Ok((parser.parse_listing(&html), Some(2))))
        })
        .await
        .unwrap();
        assert_eq!(org.name, "Alpha");

        let err = search_symbol("ORG2", 12, 5, |_| {
            ready(Ok((parser.parse_listing(&html), Some(2))))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_search_pages_past_partial_matches() {
        // Twelve substring hits fill page 1; the exact symbol is on page 2.
        let mut hits: Vec<String> = (0..12).map(|i| format!("ACE{i}")).collect();
        hits.push("ACE".into());
        hits.extend((12..29).map(|i| format!("ACE{i}")));
        assert_eq!(hits.len(), 30);

        let mut requested = Vec::new();
        let org = search_symbol("ACE", 12, 400, |page| {
            requested.push(page);
            ready(Ok((results(&hits, page, 12), Some(30))))
        })
        .await
        .unwrap();

        assert_eq!(org.symbol, "ACE");
        assert_eq!(requested, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_search_not_found_only_when_exhausted() {
        let hits: Vec<String> = (0..30).map(|i| format!("ACE{i}")).collect();

        let mut requested = Vec::new();
        let err = search_symbol("ACE", 12, 400, |page| {
            requested.push(page);
            ready(Ok((results(&hits, page, 12), Some(30))))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, FetchError::NotFound { .. }));
        assert_eq!(requested, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_search_without_total_stops_at_empty_page() {
        let hits: Vec<String> = (0..12).map(|i| format!("ACE{i}")).collect();

        let mut requested = Vec::new();
        let err = search_symbol("ACE", 12, 400, |page| {
            requested.push(page);
            ready(Ok((results(&hits, page, 12), None)))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, FetchError::NotFound { .. }));
        assert_eq!(requested, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_search_hitting_page_cap_is_transient() {
        let hits: Vec<String> = (0..100).map(|i| format!("ACE{i}")).collect();

        let err = search_symbol("ACE", 12, 2, |page| {
            ready(Ok((results(&hits, page, 12), Some(100))))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, FetchError::Transient { .. }));
    }

    #[tokio::test]
    async fn test_search_failure_on_later_page_is_transient() {
        let hits: Vec<String> = (0..30).map(|i| format!("ACE{i}")).collect();

        let err = search_symbol("ACE", 12, 400, |page| {
            ready(if page == 1 {
                Ok((results(&hits, page, 12), Some(30)))
            } else {
                Err(FetchError::transient("ACE", "ErrApiThrottled"))
            })
        })
        .await
        .unwrap_err();

        assert!(matches!(err, FetchError::Transient { .. }));
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let client = RsiClient::new(&Config::default()).unwrap();
        assert_eq!(
            client.list_url.as_str(),
            "https://robertsspaceindustries.com/api/orgs/getOrgs"
        );
        assert_eq!(client.max_pages, 400);
    }
}
