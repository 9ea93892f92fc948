//! Field-level diff between a stored snapshot and a fetched record.
//!
//! Produces the minimal list of tracked-field changes; the reconciler turns
//! each one into a history row and a column update.

use crate::models::{FieldChange, Organization, TrackedField};

/// Calculator for computing tracked-field changes.
#[derive(Debug, Clone)]
pub struct DiffCalculator {
    /// Fields compared, in the order changes are reported
    fields: Vec<TrackedField>,
}

impl Default for DiffCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffCalculator {
    /// Create a calculator comparing every tracked field.
    pub fn new() -> Self {
        Self {
            fields: TrackedField::ALL.to_vec(),
        }
    }

    /// Create a calculator comparing only the given fields.
    pub fn only(fields: &[TrackedField]) -> Self {
        Self {
            fields: fields.to_vec(),
        }
    }

    /// Changes needed to turn `prior` into `fetched`.
    pub fn calculate(&self, prior: &Organization, fetched: &Organization) -> Vec<FieldChange> {
        self.fields
            .iter()
            .filter_map(|&field| {
                let old = prior.field_value(field);
                let new = fetched.field_value(field);
                (old != new).then_some(FieldChange { field, old, new })
            })
            .collect()
    }
}

/// Convenience function comparing every tracked field.
pub fn diff_fields(prior: &Organization, fetched: &Organization) -> Vec<FieldChange> {
    DiffCalculator::new().calculate(prior, fetched)
}
