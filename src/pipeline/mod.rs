//! Pipeline entry points.
//!
//! - `run_import`: Refresh tracked organizations and record their changes
//! - `run_discovery`: Sweep the public listing for new organizations

pub mod diff;
pub mod discover;
pub mod reconcile;
pub mod run;
pub mod summary;

pub use diff::{DiffCalculator, diff_fields};
pub use discover::run_discovery;
pub use reconcile::{ReconcileOutcome, reconcile};
pub use run::{run_import, tracked_symbols};
pub use summary::RunSummary;
