// src/models/selectors.rs

//! CSS selectors for scraping the organization directory.

use serde::{Deserialize, Serialize};

/// CSS selectors for one organization cell of the listing markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgSelectors {
    /// Selector for each organization cell in the listing
    #[serde(default = "defaults::cell")]
    pub cell: String,

    /// Selector for the link to the organization page within a cell
    #[serde(default = "defaults::link")]
    pub link: String,

    /// Selector for the logo image within a cell
    #[serde(default = "defaults::image")]
    pub image: String,

    /// Selector for the display name within a cell
    #[serde(default = "defaults::name")]
    pub name: String,

    /// Selector for the symbol within a cell
    #[serde(default = "defaults::symbol")]
    pub symbol: String,

    /// Selector for the info values, in order: archetype, language,
    /// commitment, recruitment, role play, members
    #[serde(default = "defaults::value")]
    pub value: String,
}

impl Default for OrgSelectors {
    fn default() -> Self {
        Self {
            cell: defaults::cell(),
            link: defaults::link(),
            image: defaults::image(),
            name: defaults::name(),
            symbol: defaults::symbol(),
            value: defaults::value(),
        }
    }
}

impl OrgSelectors {
    /// All selectors paired with their config key, for validation.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("cell", &self.cell),
            ("link", &self.link),
            ("image", &self.image),
            ("name", &self.name),
            ("symbol", &self.symbol),
            ("value", &self.value),
        ]
    }
}

mod defaults {
    pub fn cell() -> String {
        "div.org-cell".into()
    }
    pub fn link() -> String {
        "a.trans-03s".into()
    }
    pub fn image() -> String {
        "span.thumb img".into()
    }
    pub fn name() -> String {
        "h3.name".into()
    }
    pub fn symbol() -> String {
        "span.symbol".into()
    }
    pub fn value() -> String {
        "span.right span.value".into()
    }
}
