// src/models/mod.rs

//! Domain models for the importer.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod history;
mod organization;
mod selectors;

// Re-export all public types
pub use config::{Config, LoggingConfig, RunConfig, SourceConfig, StorageConfig};
pub use history::{FieldChange, HistoryEntry};
pub use organization::{
    OrgStatus, Organization, OrganizationSnapshot, TrackedField, parse_member_count,
};
pub use selectors::OrgSelectors;
