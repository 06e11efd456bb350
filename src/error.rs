use thiserror::Error;

/// Startup data errors. All of these are fatal: the dashboard has no
/// partial-load mode, so the host aborts rather than serving a table built
/// from a half-read extract.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} row {row}: missing required field {field}")]
    MissingField {
        path: String,
        row: usize,
        field: &'static str,
    },

    #[error("{path} row {row}: invalid {field} value {value:?}")]
    BadNumber {
        path: String,
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("{path} row {row}: invalid week date {value:?} (expected DD/MM/YYYY or YYYY-MM-DD)")]
    BadDate {
        path: String,
        row: usize,
        value: String,
    },

    #[error("{path} row {row}: unknown role {value:?} (expected Actuals, Plan or Capacity)")]
    BadRole {
        path: String,
        row: usize,
        value: String,
    },

    #[error("{path} row {row}: unknown catchment {value:?} (expected Inner or Outer)")]
    BadCatchment {
        path: String,
        row: usize,
        value: String,
    },

    #[error("{path}: duplicate provider {provider:?} in location lookup")]
    DuplicateProvider { path: String, provider: String },

    #[error("no activity rows remain after reshaping; nothing to serve")]
    NoFacts,
}

pub type Result<T> = std::result::Result<T, DashboardError>;
