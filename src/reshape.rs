use crate::error::{DashboardError, Result};
use crate::types::{Catchment, FactRow, FactTable, JoinedRecord, Role};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// POD codes carried in the extract that are not one of the four service
/// categories the dashboard reports on. Rows in these codes are dropped
/// before any aggregation and can never reappear via a filter selection.
pub static EXCLUDED_PODS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "DNA/Cancellation (Theatres Only)",
        "Number of 1/2 Day Lists (Theatres Only)",
    ])
});

/// Shared dimension key of one fact row: (subtype, provider, STP, POD, week).
type FactKey = (String, String, Option<String>, String, NaiveDate);

/// Per-role accumulation for one key. Catchment and coordinates are
/// functionally dependent on the provider, so the first row's values stand
/// for the group.
#[derive(Debug)]
struct SliceAcc {
    sum: f64,
    n: usize,
    catchment: Option<Catchment>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Pivot the joined activity log into the wide fact table.
///
/// Actual and Plan counts are summed per key; Capacity is averaged, because
/// capacity is recorded once per observation and summing duplicate entries
/// would double-count the available beds. The Plan and Capacity slices are
/// then left-joined onto the Actual slice, so a key with Actuals but no
/// Plan still appears (with plan and capacity filled as zero), while Plan-
/// or Capacity-only keys do not produce rows of their own.
pub fn build_fact_table(joined: &[JoinedRecord]) -> Result<FactTable> {
    let mut actuals: BTreeMap<FactKey, SliceAcc> = BTreeMap::new();
    let mut plans: BTreeMap<FactKey, SliceAcc> = BTreeMap::new();
    let mut capacities: BTreeMap<FactKey, SliceAcc> = BTreeMap::new();

    for rec in joined {
        if EXCLUDED_PODS.contains(rec.pod.as_str()) {
            continue;
        }
        let key: FactKey = (
            rec.subtype.clone(),
            rec.provider.clone(),
            rec.stp.clone(),
            rec.pod.clone(),
            rec.week,
        );
        let slice = match rec.role {
            Role::Actual => &mut actuals,
            Role::Plan => &mut plans,
            Role::Capacity => &mut capacities,
        };
        let acc = slice.entry(key).or_insert(SliceAcc {
            sum: 0.0,
            n: 0,
            catchment: rec.catchment,
            lat: rec.lat,
            lon: rec.lon,
        });
        acc.sum += rec.count;
        acc.n += 1;
    }

    let mut rows = Vec::with_capacity(actuals.len());
    for ((subtype, provider, stp, pod, week), acc) in actuals {
        let plan = plans
            .get(&(subtype.clone(), provider.clone(), stp.clone(), pod.clone(), week))
            .map(|s| s.sum)
            .unwrap_or(0.0);
        let capacity = capacities
            .get(&(subtype.clone(), provider.clone(), stp.clone(), pod.clone(), week))
            .map(|s| s.sum / s.n as f64)
            .unwrap_or(0.0);
        rows.push(FactRow {
            subtype,
            provider,
            stp,
            pod,
            week,
            catchment: acc.catchment,
            lat: acc.lat,
            lon: acc.lon,
            actual: acc.sum,
            plan,
            capacity,
        });
    }

    let first_week = rows.iter().map(|r| r.week).min().ok_or(DashboardError::NoFacts)?;
    let last_week = rows.iter().map(|r| r.week).max().ok_or(DashboardError::NoFacts)?;
    info!(
        rows = rows.len(),
        first_week = %first_week,
        last_week = %last_week,
        "fact table built"
    );

    Ok(FactTable {
        rows,
        first_week,
        last_week,
    })
}
