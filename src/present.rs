// Presentation adapters: translate aggregator output into the structures
// the UI regions render. All numeric formatting (thousands separators,
// whole-percent rounding) happens here and nowhere earlier.
use crate::aggregate::aggregate;
use crate::types::{
    ActivityTrend, AggregateRow, Band, FactTable, FilterSelection, GroupKey, Grouping, MapMarker,
    SeriesPoint, UtilisationChart, UtilisationPoint, UtilisationRow,
};
use crate::util::{format_number, mean};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Placeholder for undefined ratios and missing data.
pub const NO_DATA: &str = "n/a";

/// Map a utilisation percentage onto its display band.
///
/// Convention (both dashboard variants disagreed at the boundaries, so one
/// was picked and is used everywhere): boundaries are inclusive on the
/// lower bound of the upper band. Exactly 60 is Amber, exactly 80 is Green.
pub fn utilisation_band(value: Option<f64>) -> Band {
    match value {
        None => Band::Grey,
        Some(v) if v < 60.0 => Band::Red,
        Some(v) if v < 80.0 => Band::Amber,
        Some(_) => Band::Green,
    }
}

fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}", v),
        None => NO_DATA.to_string(),
    }
}

/// Build the utilisation table: one formatted, banded row per STP x
/// provider group under the current selection.
pub fn utilisation_table(table: &FactTable, filter: &FilterSelection) -> Vec<UtilisationRow> {
    aggregate(table, filter, Grouping::RegionProvider)
        .into_iter()
        .filter_map(|row| {
            let GroupKey::RegionProvider { stp, provider } = row.key.clone() else {
                return None;
            };
            Some(UtilisationRow {
                stp,
                provider,
                actual: format_number(row.actual, 0),
                plan: format_number(row.plan, 0),
                capacity: format_number(row.capacity, 0),
                plan_utilisation: format_pct(row.plan_utilisation),
                plan_band: utilisation_band(row.plan_utilisation),
                capacity_utilisation: format_pct(row.capacity_utilisation),
                capacity_band: utilisation_band(row.capacity_utilisation),
            })
        })
        .collect()
}

/// Format a summary-card scalar to two decimals, or the placeholder when
/// the selection had no defined utilisation.
pub fn format_card(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => NO_DATA.to_string(),
    }
}

/// Weekly actual-vs-capacity series for the line chart.
pub fn activity_trend(table: &FactTable, filter: &FilterSelection) -> ActivityTrend {
    let rows = aggregate(table, filter, Grouping::Week);
    let point_of = |row: &AggregateRow, value: f64| -> Option<SeriesPoint> {
        match row.key {
            GroupKey::Week { week } => Some(SeriesPoint { week, value }),
            _ => None,
        }
    };
    ActivityTrend {
        actual: rows.iter().filter_map(|r| point_of(r, r.actual)).collect(),
        capacity: rows.iter().filter_map(|r| point_of(r, r.capacity)).collect(),
    }
}

/// The bar/scatter combo chart: every defined per-(POD, week) capacity
/// utilisation as a scatter point, and the per-week mean of those points
/// as the bar heights.
pub fn utilisation_chart(table: &FactTable, filter: &FilterSelection) -> UtilisationChart {
    let mut points: Vec<UtilisationPoint> = Vec::new();
    for row in aggregate(table, filter, Grouping::CategoryWeek) {
        let GroupKey::CategoryWeek { pod, week } = row.key else {
            continue;
        };
        if let Some(value) = row.capacity_utilisation {
            points.push(UtilisationPoint { pod, week, value });
        }
    }

    let mut by_week: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for p in &points {
        by_week.entry(p.week).or_default().push(p.value);
    }
    let bars = by_week
        .into_iter()
        .filter_map(|(week, values)| mean(&values).map(|value| SeriesPoint { week, value }))
        .collect();

    UtilisationChart { bars, points }
}

/// One marker per located provider, sized by summed actual activity.
///
/// The divisor keeps the marker area readable at the default zoom; it is
/// the scale the original map rendered with.
const MARKER_SCALE: f64 = 2.5;

pub fn map_markers(table: &FactTable, filter: &FilterSelection) -> Vec<MapMarker> {
    aggregate(table, filter, Grouping::Site)
        .into_iter()
        .filter_map(|row| {
            let GroupKey::Site {
                stp,
                provider,
                lat,
                lon,
            } = row.key
            else {
                return None;
            };
            let label = format!(
                "{} activities at {} within {}",
                format_number(row.actual, 0),
                provider,
                stp
            );
            Some(MapMarker {
                provider,
                stp,
                lat,
                lon,
                size: row.actual / MARKER_SCALE,
                label,
            })
        })
        .collect()
}
