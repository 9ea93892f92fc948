//! Change-history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TrackedField;

/// One tracked field that differs between the stored snapshot and a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: TrackedField,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// An immutable record of one field's change between two observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row id assigned by the store (0 before insertion)
    #[serde(default)]
    pub id: i64,
    pub symbol: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Build the entry recorded for a detected change.
    pub fn from_change(symbol: &str, change: &FieldChange, observed_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            symbol: symbol.to_string(),
            field: change.field.as_str().to_string(),
            old_value: change.old.clone(),
            new_value: change.new.clone(),
            observed_at,
        }
    }

    /// Format the entry for display, `-` standing in for absent values.
    pub fn describe(&self) -> String {
        format!(
            "{} {}: {} -> {}",
            self.observed_at.format("%Y-%m-%d %H:%M:%S"),
            self.field,
            self.old_value.as_deref().unwrap_or("-"),
            self.new_value.as_deref().unwrap_or("-"),
        )
    }
}
