use crate::types::{ActivityRecord, JoinedRecord, LocationRecord};
use std::collections::HashMap;
use tracing::warn;

/// Left-join the activity log to the location lookup on provider.
///
/// Every activity row survives: a provider with no location entry keeps its
/// counts but carries `None` region, catchment and coordinates, and the
/// downstream aggregation treats those like any other non-matching filter
/// value. Inputs are borrowed and never mutated.
pub fn join_locations(
    activity: &[ActivityRecord],
    locations: &[LocationRecord],
) -> Vec<JoinedRecord> {
    let by_provider: HashMap<&str, &LocationRecord> = locations
        .iter()
        .map(|loc| (loc.provider.as_str(), loc))
        .collect();

    let mut unmatched = 0usize;
    let joined = activity
        .iter()
        .map(|rec| {
            let loc = by_provider.get(rec.provider.as_str());
            if loc.is_none() {
                unmatched += 1;
            }
            JoinedRecord {
                provider: rec.provider.clone(),
                pod: rec.pod.clone(),
                subtype: rec.subtype.clone(),
                role: rec.role,
                week: rec.week,
                count: rec.count,
                stp: loc.map(|l| l.stp.clone()),
                catchment: loc.map(|l| l.catchment),
                lat: loc.map(|l| l.lat),
                lon: loc.map(|l| l.lon),
            }
        })
        .collect();

    if unmatched > 0 {
        warn!(rows = unmatched, "activity rows with no location match");
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Catchment, Role};
    use chrono::NaiveDate;

    fn activity(provider: &str) -> ActivityRecord {
        ActivityRecord {
            provider: provider.to_string(),
            pod: "Elective".to_string(),
            subtype: "Normal".to_string(),
            role: Role::Actual,
            week: NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(),
            count: 10.0,
        }
    }

    fn location(provider: &str) -> LocationRecord {
        LocationRecord {
            provider: provider.to_string(),
            lat: 51.4,
            lon: -0.2,
            stp: "South West London STP".to_string(),
            catchment: Catchment::Outer,
        }
    }

    #[test]
    fn matched_rows_carry_location_fields() {
        let joined = join_locations(&[activity("A")], &[location("A")]);
        assert_eq!(joined[0].stp.as_deref(), Some("South West London STP"));
        assert_eq!(joined[0].catchment, Some(Catchment::Outer));
        assert_eq!(joined[0].lat, Some(51.4));
    }

    #[test]
    fn unmatched_rows_survive_with_nulls() {
        let joined = join_locations(&[activity("A"), activity("B")], &[location("A")]);
        assert_eq!(joined.len(), 2);
        let b = &joined[1];
        assert_eq!(b.stp, None);
        assert_eq!(b.catchment, None);
        assert_eq!(b.lat, None);
        assert_eq!(b.count, 10.0);
    }
}
