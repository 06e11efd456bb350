use crate::types::{
    AggregateRow, FactRow, FactTable, FilterSelection, GroupKey, Grouping, SummaryCards,
};
use crate::util::mean;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// The four service categories offered by the POD dropdown.
pub const POD_OPTIONS: [&str; 4] = ["Elective", "Daycase", "Diagnostics", "Outpatients"];

/// Short region codes shown on the STP dropdown, mapped to the full STP
/// names used in the location lookup.
pub static REGION_CODES: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("SWL", "South West London STP"),
        ("SEL", "South East London STP"),
        ("NWL", "North West London STP"),
        ("NCL", "North London STP"),
        ("NEL", "East London STP"),
    ]
});

/// Expand a short region code to its full STP name.
pub fn region_name(code: &str) -> Option<&'static str> {
    REGION_CODES
        .iter()
        .find(|(short, _)| *short == code)
        .map(|(_, full)| *full)
}

/// Membership test against every active filter dimension. Rows whose
/// provider had no location match carry `None` region/catchment and can
/// never match a closed selection set, so they drop out here rather than
/// crashing anything downstream.
fn matches(row: &FactRow, filter: &FilterSelection) -> bool {
    if !filter.pods.contains(&row.pod) {
        return false;
    }
    if !row.stp.as_ref().is_some_and(|s| filter.stps.contains(s)) {
        return false;
    }
    if !row
        .catchment
        .is_some_and(|c| filter.catchments.contains(&c))
    {
        return false;
    }
    if let Some(subtypes) = &filter.subtypes {
        if !subtypes.contains(&row.subtype) {
            return false;
        }
    }
    if let Some((start, end)) = filter.date_range {
        if row.week < start || row.week > end {
            return false;
        }
    }
    true
}

#[derive(Default)]
struct Acc {
    actual: f64,
    plan: f64,
    cap_sum: f64,
    cap_n: usize,
}

/// Percentage ratio with the zero-denominator (and 0/0) cases mapped to
/// the undefined sentinel instead of infinity or NaN.
fn pct(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator * 100.0)
    }
}

/// Group the filtered rows by `key_of`, then finish each group into an
/// `AggregateRow`. Actual and plan are summed; capacity is averaged across
/// the group's fact rows, the same rule the reshaper applies within a key.
/// `key_of` returning `None` drops the row from this grouping (used by the
/// map, which cannot plot rows without coordinates).
///
/// A `BTreeMap` keeps group order deterministic, so identical inputs give
/// bit-identical output.
fn aggregate_by<K: Ord>(
    table: &FactTable,
    filter: &FilterSelection,
    key_of: impl Fn(&FactRow) -> Option<K>,
    to_group_key: impl Fn(&K) -> GroupKey,
) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<K, Acc> = BTreeMap::new();
    for row in table.rows.iter().filter(|r| matches(r, filter)) {
        let Some(key) = key_of(row) else { continue };
        let acc = groups.entry(key).or_default();
        acc.actual += row.actual;
        acc.plan += row.plan;
        acc.cap_sum += row.capacity;
        acc.cap_n += 1;
    }

    groups
        .iter()
        .map(|(key, acc)| {
            let capacity = if acc.cap_n == 0 {
                0.0
            } else {
                acc.cap_sum / acc.cap_n as f64
            };
            AggregateRow {
                key: to_group_key(key),
                actual: acc.actual,
                plan: acc.plan,
                capacity,
                plan_utilisation: pct(acc.actual, acc.plan),
                capacity_utilisation: pct(acc.actual, capacity),
            }
        })
        .collect()
}

/// Recompute the aggregate a UI region needs from the resident fact table.
///
/// Pure function of its arguments: no shared mutable state, so concurrent
/// sessions can call it freely against the same table. An empty filter
/// result is an empty vector, never an error.
pub fn aggregate(
    table: &FactTable,
    filter: &FilterSelection,
    grouping: Grouping,
) -> Vec<AggregateRow> {
    match grouping {
        Grouping::RegionProvider => aggregate_by(
            table,
            filter,
            |r| r.stp.clone().map(|stp| (stp, r.provider.clone())),
            |(stp, provider)| GroupKey::RegionProvider {
                stp: stp.clone(),
                provider: provider.clone(),
            },
        ),
        Grouping::RegionCategory => aggregate_by(
            table,
            filter,
            |r| r.stp.clone().map(|stp| (stp, r.pod.clone())),
            |(stp, pod)| GroupKey::RegionCategory {
                stp: stp.clone(),
                pod: pod.clone(),
            },
        ),
        Grouping::Week => aggregate_by(
            table,
            filter,
            |r| Some(r.week),
            |week| GroupKey::Week { week: *week },
        ),
        Grouping::CategoryWeek => aggregate_by(
            table,
            filter,
            |r| Some((r.pod.clone(), r.week)),
            |(pod, week)| GroupKey::CategoryWeek {
                pod: pod.clone(),
                week: *week,
            },
        ),
        Grouping::Site => aggregate_by(
            table,
            filter,
            // Coordinate bits keep the key Ord without losing the exact
            // float values; rows with no coordinates have no marker.
            |r| match (r.stp.clone(), r.lat, r.lon) {
                (Some(stp), Some(lat), Some(lon)) => {
                    Some((stp, r.provider.clone(), lat.to_bits(), lon.to_bits()))
                }
                _ => None,
            },
            |(stp, provider, lat, lon)| GroupKey::Site {
                stp: stp.clone(),
                provider: provider.clone(),
                lat: f64::from_bits(*lat),
                lon: f64::from_bits(*lon),
            },
        ),
    }
}

/// The two headline utilisation scalars.
///
/// Both are the mean of the defined capacity-utilisation values across the
/// STP x POD groups: the total card over the caller's full selection, the
/// weekly card with the date range pinned to the most recent week in the
/// table. Groups with undefined utilisation are skipped, and a selection
/// with none defined gives `None` so the host renders a placeholder.
pub fn summary_cards(table: &FactTable, filter: &FilterSelection) -> SummaryCards {
    let total = card_value(table, filter);

    let mut weekly_filter = filter.clone();
    weekly_filter.date_range = Some((table.last_week, table.last_week));
    let weekly = card_value(table, &weekly_filter);

    SummaryCards {
        weekly_utilisation: weekly,
        total_utilisation: total,
        week: table.last_week,
    }
}

fn card_value(table: &FactTable, filter: &FilterSelection) -> Option<f64> {
    let defined: Vec<f64> = aggregate(table, filter, Grouping::RegionCategory)
        .iter()
        .filter_map(|r| r.capacity_utilisation)
        .collect();
    mean(&defined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Catchment;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn week(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn fact(provider: &str, pod: &str, d: u32, actual: f64, plan: f64, capacity: f64) -> FactRow {
        FactRow {
            subtype: "Normal".to_string(),
            provider: provider.to_string(),
            stp: Some("South West London STP".to_string()),
            pod: pod.to_string(),
            week: week(d),
            catchment: Some(Catchment::Outer),
            lat: Some(51.4),
            lon: Some(-0.2),
            actual,
            plan,
            capacity,
        }
    }

    fn table(rows: Vec<FactRow>) -> FactTable {
        let first_week = rows.iter().map(|r| r.week).min().unwrap();
        let last_week = rows.iter().map(|r| r.week).max().unwrap();
        FactTable {
            rows,
            first_week,
            last_week,
        }
    }

    fn selection() -> FilterSelection {
        FilterSelection {
            pods: HashSet::from(["Elective".to_string(), "Daycase".to_string()]),
            stps: HashSet::from(["South West London STP".to_string()]),
            catchments: HashSet::from([Catchment::Outer]),
            subtypes: Some(HashSet::from(["Normal".to_string()])),
            date_range: Some((week(1), week(31))),
        }
    }

    #[test]
    fn elective_scenario_hits_eighty_percent() {
        let t = table(vec![fact("ProviderA", "Elective", 4, 80.0, 100.0, 0.0)]);
        let rows = aggregate(&t, &selection(), Grouping::RegionProvider);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].actual, 80.0);
        assert_eq!(rows[0].plan, 100.0);
        assert_eq!(rows[0].plan_utilisation, Some(80.0));
        // Zero capacity means the capacity ratio is undefined, not infinite.
        assert_eq!(rows[0].capacity_utilisation, None);
    }

    #[test]
    fn capacity_is_averaged_across_group_rows() {
        let t = table(vec![
            fact("A", "Elective", 4, 10.0, 0.0, 10.0),
            fact("A", "Elective", 11, 10.0, 0.0, 20.0),
        ]);
        let rows = aggregate(&t, &selection(), Grouping::RegionProvider);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].actual, 20.0);
        assert_eq!(rows[0].capacity, 15.0);
    }

    #[test]
    fn empty_filter_result_is_well_formed() {
        let t = table(vec![fact("A", "Elective", 4, 10.0, 10.0, 10.0)]);
        let mut f = selection();
        f.pods = HashSet::from(["Outpatients".to_string()]);
        let rows = aggregate(&t, &f, Grouping::RegionProvider);
        assert!(rows.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let t = table(vec![
            fact("A", "Elective", 4, 10.0, 20.0, 5.0),
            fact("B", "Daycase", 11, 7.0, 0.0, 3.0),
            fact("A", "Daycase", 18, 9.0, 12.0, 4.0),
        ]);
        let f = selection();
        for grouping in [
            Grouping::RegionProvider,
            Grouping::RegionCategory,
            Grouping::Week,
            Grouping::CategoryWeek,
            Grouping::Site,
        ] {
            assert_eq!(aggregate(&t, &f, grouping), aggregate(&t, &f, grouping));
        }
    }

    #[test]
    fn unlocated_rows_never_match_a_region_selection() {
        let mut unlocated = fact("B", "Elective", 4, 50.0, 50.0, 50.0);
        unlocated.stp = None;
        unlocated.catchment = None;
        let t = table(vec![fact("A", "Elective", 4, 10.0, 10.0, 10.0), unlocated]);
        let rows = aggregate(&t, &selection(), Grouping::RegionProvider);
        assert_eq!(rows.len(), 1);
        match &rows[0].key {
            GroupKey::RegionProvider { provider, .. } => assert_eq!(provider, "A"),
            other => panic!("unexpected key {:?}", other),
        }
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let t = table(vec![
            fact("A", "Elective", 4, 1.0, 0.0, 0.0),
            fact("A", "Elective", 11, 2.0, 0.0, 0.0),
            fact("A", "Elective", 18, 4.0, 0.0, 0.0),
        ]);
        let mut f = selection();
        f.date_range = Some((week(4), week(11)));
        let rows = aggregate(&t, &f, Grouping::Week);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn subtype_none_means_unrestricted() {
        let t = table(vec![fact("A", "Elective", 4, 10.0, 10.0, 10.0)]);
        let mut f = selection();
        f.subtypes = None;
        assert_eq!(aggregate(&t, &f, Grouping::Week).len(), 1);
        f.subtypes = Some(HashSet::from(["Referral".to_string()]));
        assert!(aggregate(&t, &f, Grouping::Week).is_empty());
    }

    #[test]
    fn site_grouping_skips_rows_without_coordinates() {
        let mut no_coords = fact("A", "Elective", 11, 5.0, 0.0, 0.0);
        no_coords.lat = None;
        no_coords.lon = None;
        let t = table(vec![fact("A", "Elective", 4, 10.0, 0.0, 0.0), no_coords]);
        let rows = aggregate(&t, &selection(), Grouping::Site);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].actual, 10.0);
    }

    #[test]
    fn cards_average_defined_utilisation_only() {
        let t = table(vec![
            fact("A", "Elective", 4, 50.0, 0.0, 100.0), // 50% capacity utilisation
            fact("A", "Daycase", 4, 10.0, 0.0, 0.0),    // undefined, skipped
        ]);
        let cards = summary_cards(&t, &selection());
        assert_eq!(cards.total_utilisation, Some(50.0));
        assert_eq!(cards.weekly_utilisation, Some(50.0));
        assert_eq!(cards.week, week(4));
    }

    #[test]
    fn cards_with_no_defined_values_are_none() {
        let t = table(vec![fact("A", "Elective", 4, 10.0, 0.0, 0.0)]);
        let cards = summary_cards(&t, &selection());
        assert_eq!(cards.total_utilisation, None);
        assert_eq!(cards.weekly_utilisation, None);
    }

    #[test]
    fn region_codes_expand_to_full_names() {
        assert_eq!(region_name("SWL"), Some("South West London STP"));
        assert_eq!(region_name("NEL"), Some("East London STP"));
        assert_eq!(region_name("XX"), None);
    }
}
