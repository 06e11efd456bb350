//! Core pipeline for the independent-sector weekly activity dashboard.
//!
//! The pipeline runs once at startup: load the weekly activity extract and
//! the provider-location lookup, left-join them, and reshape the long
//! activity log into the resident wide fact table. Everything after that
//! is a pure function of the immutable table plus the current filter
//! selection, so a web host can recompute any UI region per interaction
//! (and concurrently across sessions) without locking. If live uploads are
//! ever wired up, the host should swap the whole table reference
//! atomically rather than mutate it.

pub mod aggregate;
pub mod error;
pub mod join;
pub mod loader;
pub mod output;
pub mod present;
pub mod reshape;
pub mod types;
pub mod util;

use std::path::Path;

pub use error::{DashboardError, Result};
pub use types::{FactTable, FilterSelection, Grouping};

/// Run the startup pipeline: Loader, Joiner, Reshaper. Any data error is
/// fatal; there is no partial-load mode.
pub fn build_resident_table(activity_path: &Path, location_path: &Path) -> Result<FactTable> {
    let activity = loader::load_activity(activity_path)?;
    let locations = loader::load_locations(location_path)?;
    let joined = join::join_locations(&activity, &locations);
    reshape::build_fact_table(&joined)
}
