use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tabled::Tabled;

/// Raw activity-log row as it appears in the weekly extract. All fields are
/// optional strings; cleaning and validation happen in the loader.
#[derive(Debug, Deserialize)]
pub struct RawActivityRow {
    #[serde(rename = "Provider")]
    pub provider: Option<String>,
    #[serde(rename = "POD")]
    pub pod: Option<String>,
    #[serde(rename = "Activity Type")]
    pub activity_type: Option<String>,
    #[serde(rename = "Plan or Actuals")]
    pub plan_or_actuals: Option<String>,
    #[serde(rename = "Week Commencing Date")]
    pub week_commencing: Option<String>,
    #[serde(rename = "Activity Count")]
    pub activity_count: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLocationRow {
    #[serde(rename = "Provider")]
    pub provider: Option<String>,
    #[serde(rename = "Lat")]
    pub lat: Option<String>,
    #[serde(rename = "Long")]
    pub long: Option<String>,
    #[serde(rename = "STP")]
    pub stp: Option<String>,
    #[serde(rename = "Inner or Outer")]
    pub inner_or_outer: Option<String>,
}

/// Whether a count row records realized, planned, or available activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Actual,
    Plan,
    Capacity,
}

impl Role {
    /// The extract writes "Actuals" (plural); accept the singular as well.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim() {
            "Actuals" | "Actual" => Some(Role::Actual),
            "Plan" => Some(Role::Plan),
            "Capacity" => Some(Role::Capacity),
            _ => None,
        }
    }
}

/// Inner/outer catchment classification of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Catchment {
    Inner,
    Outer,
}

impl Catchment {
    pub fn parse(s: &str) -> Option<Catchment> {
        match s.trim() {
            "Inner" => Some(Catchment::Inner),
            "Outer" => Some(Catchment::Outer),
            _ => None,
        }
    }
}

impl fmt::Display for Catchment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Catchment::Inner => write!(f, "Inner"),
            Catchment::Outer => write!(f, "Outer"),
        }
    }
}

/// One cleaned activity-log row.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub provider: String,
    pub pod: String,
    pub subtype: String,
    pub role: Role,
    pub week: NaiveDate,
    pub count: f64,
}

/// One row of the static provider-location lookup. `provider` is unique.
#[derive(Debug, Clone)]
pub struct LocationRecord {
    pub provider: String,
    pub lat: f64,
    pub lon: f64,
    pub stp: String,
    pub catchment: Catchment,
}

/// Activity row after the left join to the location lookup. Rows whose
/// provider has no location entry carry `None` for every joined field.
#[derive(Debug, Clone)]
pub struct JoinedRecord {
    pub provider: String,
    pub pod: String,
    pub subtype: String,
    pub role: Role,
    pub week: NaiveDate,
    pub count: f64,
    pub stp: Option<String>,
    pub catchment: Option<Catchment>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// One wide fact row per (subtype, provider, STP, POD, week). Plan and
/// capacity are zero when the source had no row in that role for the key.
#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub subtype: String,
    pub provider: String,
    pub stp: Option<String>,
    pub pod: String,
    pub week: NaiveDate,
    pub catchment: Option<Catchment>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub actual: f64,
    pub plan: f64,
    pub capacity: f64,
}

/// The resident fact table: built once at startup, read-only afterwards.
/// Rows are in deterministic key order so downstream output is stable.
#[derive(Debug, Clone)]
pub struct FactTable {
    pub rows: Vec<FactRow>,
    pub first_week: NaiveDate,
    pub last_week: NaiveDate,
}

/// Current state of the dashboard filter controls, rebuilt per interaction.
#[derive(Debug, Clone)]
pub struct FilterSelection {
    pub pods: HashSet<String>,
    pub stps: HashSet<String>,
    pub catchments: HashSet<Catchment>,
    /// `None` means the subtype checklist is not wired (first variant of
    /// the dashboard); `Some` restricts to the listed subtypes.
    pub subtypes: Option<HashSet<String>>,
    /// Inclusive week range; `None` leaves the table unbounded.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Grouping dimension requested by a UI region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// STP x provider, feeds the utilisation table.
    RegionProvider,
    /// STP x POD, feeds the summary cards.
    RegionCategory,
    /// Week only, feeds the line chart.
    Week,
    /// POD x week, feeds the bar/scatter combo chart.
    CategoryWeek,
    /// STP x provider x coordinates, feeds the map. Providers without
    /// coordinates have nothing to plot and are omitted.
    Site,
}

/// Key of one aggregate group, matching the `Grouping` that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupKey {
    RegionProvider { stp: String, provider: String },
    RegionCategory { stp: String, pod: String },
    Week { week: NaiveDate },
    CategoryWeek { pod: String, week: NaiveDate },
    Site { stp: String, provider: String, lat: f64, lon: f64 },
}

/// One aggregated group. Utilisation percentages are `None` whenever the
/// denominator is zero; the sentinel survives into presentation as a
/// placeholder, never as infinity or NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub actual: f64,
    pub plan: f64,
    pub capacity: f64,
    pub plan_utilisation: Option<f64>,
    pub capacity_utilisation: Option<f64>,
}

/// The two headline scalars above the dashboard charts. `None` renders as
/// the "no data" placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCards {
    /// Mean capacity utilisation over the most recent week only.
    pub weekly_utilisation: Option<f64>,
    /// Mean capacity utilisation over the whole filtered range.
    pub total_utilisation: Option<f64>,
    /// The week the weekly card refers to.
    pub week: NaiveDate,
}

/// Display band for a utilisation cell. Boundaries are inclusive on the
/// lower bound of the upper band: exactly 60 is Amber, exactly 80 is Green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Band {
    /// Undefined ratio (zero denominator) or no data.
    Grey,
    /// Below 60%.
    Red,
    /// 60% to just under 80%.
    Amber,
    /// 80% and above.
    Green,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Grey => write!(f, "grey"),
            Band::Red => write!(f, "red"),
            Band::Amber => write!(f, "amber"),
            Band::Green => write!(f, "green"),
        }
    }
}

/// One row of the utilisation table, formatted for display.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct UtilisationRow {
    #[serde(rename = "STP")]
    #[tabled(rename = "STP")]
    pub stp: String,
    #[serde(rename = "Provider")]
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[serde(rename = "Actual Activity")]
    #[tabled(rename = "Actual Activity")]
    pub actual: String,
    #[serde(rename = "Plan Activity")]
    #[tabled(rename = "Plan Activity")]
    pub plan: String,
    #[serde(rename = "Capacity")]
    #[tabled(rename = "Capacity")]
    pub capacity: String,
    #[serde(rename = "Plan Utilisation (%)")]
    #[tabled(rename = "Plan Utilisation (%)")]
    pub plan_utilisation: String,
    #[serde(rename = "PlanBand")]
    #[tabled(rename = "PlanBand")]
    pub plan_band: Band,
    #[serde(rename = "Capacity Utilisation (%)")]
    #[tabled(rename = "Capacity Utilisation (%)")]
    pub capacity_utilisation: String,
    #[serde(rename = "CapacityBand")]
    #[tabled(rename = "CapacityBand")]
    pub capacity_band: Band,
}

/// One (week, value) point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub week: NaiveDate,
    pub value: f64,
}

/// The actual-vs-capacity weekly line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityTrend {
    pub actual: Vec<SeriesPoint>,
    pub capacity: Vec<SeriesPoint>,
}

/// One per-(POD, week) capacity-utilisation observation on the combo chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilisationPoint {
    pub pod: String,
    pub week: NaiveDate,
    pub value: f64,
}

/// The combo chart: per-week averaged bars with the underlying scatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilisationChart {
    pub bars: Vec<SeriesPoint>,
    pub points: Vec<UtilisationPoint>,
}

/// One map marker. `size` is the charting library's area-proportional
/// marker size, already scaled from the summed actual count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub provider: String,
    pub stp: String,
    pub lat: f64,
    pub lon: f64,
    pub size: f64,
    pub label: String,
}
