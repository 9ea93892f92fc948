// src/services/parser.rs

//! Organization listing parser.
//!
//! Turns the `div.org-cell` markup returned by the directory API into
//! [`Organization`] records using the configured CSS selectors.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{OrgSelectors, Organization, parse_member_count};
use crate::utils::{extract_org_symbol, non_empty, normalize_whitespace, resolve_url};

// Positions of the info values inside a cell.
const ARCHETYPE: usize = 0;
const LANGUAGE: usize = 1;
const COMMITMENT: usize = 2;
const RECRUITMENT: usize = 3;
const ROLE_PLAY: usize = 4;
const MEMBERS: usize = 5;

/// Parser for organization listing markup with pre-compiled selectors.
#[derive(Debug, Clone)]
pub struct OrgParser {
    cell: Selector,
    link: Selector,
    image: Selector,
    name: Selector,
    symbol: Selector,
    value: Selector,
    base_url: Url,
}

impl OrgParser {
    /// Compile the selectors; links and images resolve against `base_url`.
    pub fn new(selectors: &OrgSelectors, base_url: &str) -> Result<Self> {
        Ok(Self {
            cell: Self::parse_selector(&selectors.cell)?,
            link: Self::parse_selector(&selectors.link)?,
            image: Self::parse_selector(&selectors.image)?,
            name: Self::parse_selector(&selectors.name)?,
            symbol: Self::parse_selector(&selectors.symbol)?,
            value: Self::parse_selector(&selectors.value)?,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Parse every organization cell in a listing fragment.
    ///
    /// Cells without a recognizable symbol are skipped.
    pub fn parse_listing(&self, html: &str) -> Vec<Organization> {
        let document = Html::parse_document(html);
        let mut organizations = Vec::new();

        for cell in document.select(&self.cell) {
            match self.parse_cell(&cell) {
                Some(org) => organizations.push(org),
                None => log::warn!("Skipping organization cell without a symbol"),
            }
        }
        organizations
    }

    fn parse_cell(&self, cell: &ElementRef) -> Option<Organization> {
        let url = cell
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_url(&self.base_url, href.trim()));

        let symbol = Self::first_text(cell, &self.symbol)
            .or_else(|| url.as_deref().and_then(extract_org_symbol))?;

        let name = Self::first_text(cell, &self.name).unwrap_or_default();

        let url_image = cell
            .select(&self.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|src| resolve_url(&self.base_url, src.trim()));

        let values: Vec<String> = cell
            .select(&self.value)
            .map(|v| normalize_whitespace(&v.text().collect::<String>()))
            .collect();
        let value_at = |i: usize| values.get(i).and_then(|v| non_empty(v));

        Some(Organization {
            symbol,
            name,
            member_count: values.get(MEMBERS).and_then(|v| parse_member_count(v)),
            language: value_at(LANGUAGE),
            recruitment: value_at(RECRUITMENT),
            archetype: value_at(ARCHETYPE),
            commitment: value_at(COMMITMENT),
            role_play: value_at(ROLE_PLAY),
            url_image,
            url,
        })
    }

    fn first_text(cell: &ElementRef, selector: &Selector) -> Option<String> {
        cell.select(selector)
            .next()
            .and_then(|el| non_empty(&el.text().collect::<String>()))
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}
