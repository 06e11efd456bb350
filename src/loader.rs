use crate::error::{DashboardError, Result};
use crate::types::{ActivityRecord, Catchment, LocationRecord, RawActivityRow, RawLocationRow, Role};
use crate::util::{decode_latin1, parse_f64_safe, parse_week};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Load the weekly activity log.
///
/// The extract is a legacy single-byte file, so the bytes are decoded as
/// ISO-8859-1 before the CSV parser sees them. Any malformed date, count
/// or role aborts the load; there is no per-row recovery (the week bounds
/// that drive the default chart ranges depend on every date parsing).
pub fn load_activity(path: &Path) -> Result<Vec<ActivityRecord>> {
    let bytes = read_bytes(path)?;
    let records = parse_activity(&path.to_string_lossy(), &bytes)?;
    info!(rows = records.len(), path = %path.display(), "activity log loaded");
    Ok(records)
}

/// Load the static provider-location lookup.
pub fn load_locations(path: &Path) -> Result<Vec<LocationRecord>> {
    let bytes = read_bytes(path)?;
    let records = parse_locations(&path.to_string_lossy(), &bytes)?;
    info!(rows = records.len(), path = %path.display(), "location lookup loaded");
    Ok(records)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| DashboardError::Io {
        path: path.to_string_lossy().into_owned(),
        source,
    })
}

/// Parse activity-log bytes. Split out from the file read so hosts that
/// receive the extract some other way (and tests) can feed bytes directly.
pub fn parse_activity(path: &str, bytes: &[u8]) -> Result<Vec<ActivityRecord>> {
    let text = decode_latin1(bytes);
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let mut records = Vec::new();

    for (idx, result) in rdr.deserialize::<RawActivityRow>().enumerate() {
        // 1-based data row number, header excluded.
        let row_no = idx + 1;
        let row = result.map_err(|source| DashboardError::Csv {
            path: path.to_string(),
            source,
        })?;

        let provider = clean_name(row.provider, "Unknown Provider");
        let pod = clean_name(row.pod, "Unspecified");
        let subtype = clean_name(row.activity_type, "Unspecified");

        let role_raw = row.plan_or_actuals.unwrap_or_default();
        let role = Role::parse(&role_raw).ok_or_else(|| DashboardError::BadRole {
            path: path.to_string(),
            row: row_no,
            value: role_raw.trim().to_string(),
        })?;

        let week_raw = row.week_commencing.unwrap_or_default();
        let week = parse_week(&week_raw).ok_or_else(|| DashboardError::BadDate {
            path: path.to_string(),
            row: row_no,
            value: week_raw.trim().to_string(),
        })?;

        // An absent count means "no activity recorded" and becomes zero;
        // a present but unparsable or negative count is a data error.
        let count = match row.activity_count.as_deref().map(str::trim) {
            None | Some("") => 0.0,
            Some(s) => parse_f64_safe(Some(s))
                .filter(|v| *v >= 0.0)
                .ok_or_else(|| DashboardError::BadNumber {
                    path: path.to_string(),
                    row: row_no,
                    field: "Activity Count",
                    value: s.to_string(),
                })?,
        };

        records.push(ActivityRecord {
            provider,
            pod,
            subtype,
            role,
            week,
            count,
        });
    }
    Ok(records)
}

/// Parse location-lookup bytes. Provider is the join key and must be
/// present and unique; coordinates and region must parse.
pub fn parse_locations(path: &str, bytes: &[u8]) -> Result<Vec<LocationRecord>> {
    let text = decode_latin1(bytes);
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let mut records: Vec<LocationRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (idx, result) in rdr.deserialize::<RawLocationRow>().enumerate() {
        let row_no = idx + 1;
        let row = result.map_err(|source| DashboardError::Csv {
            path: path.to_string(),
            source,
        })?;

        let provider = match row.provider.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => {
                return Err(DashboardError::MissingField {
                    path: path.to_string(),
                    row: row_no,
                    field: "Provider",
                })
            }
        };
        if !seen.insert(provider.clone()) {
            return Err(DashboardError::DuplicateProvider {
                path: path.to_string(),
                provider,
            });
        }

        let lat = require_f64(path, row_no, "Lat", row.lat.as_deref())?;
        let lon = require_f64(path, row_no, "Long", row.long.as_deref())?;

        let stp = match row.stp.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => {
                return Err(DashboardError::MissingField {
                    path: path.to_string(),
                    row: row_no,
                    field: "STP",
                })
            }
        };

        let catchment_raw = row.inner_or_outer.unwrap_or_default();
        let catchment =
            Catchment::parse(&catchment_raw).ok_or_else(|| DashboardError::BadCatchment {
                path: path.to_string(),
                row: row_no,
                value: catchment_raw.trim().to_string(),
            })?;

        records.push(LocationRecord {
            provider,
            lat,
            lon,
            stp,
            catchment,
        });
    }
    Ok(records)
}

fn clean_name(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn require_f64(path: &str, row: usize, field: &'static str, value: Option<&str>) -> Result<f64> {
    parse_f64_safe(value).ok_or_else(|| DashboardError::BadNumber {
        path: path.to_string(),
        row,
        field,
        value: value.unwrap_or("").trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const ACTIVITY_HEADER: &str =
        "Provider,POD,Activity Type,Plan or Actuals,Week Commencing Date,Activity Count\n";

    #[test]
    fn parses_a_clean_activity_row() {
        let csv = format!(
            "{}Parkside (Aspen Healthcare),Elective,Normal,Actuals,04/01/2021,80\n",
            ACTIVITY_HEADER
        );
        let rows = parse_activity("test.csv", csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.provider, "Parkside (Aspen Healthcare)");
        assert_eq!(r.pod, "Elective");
        assert_eq!(r.role, Role::Actual);
        assert_eq!(r.week, NaiveDate::from_ymd_opt(2021, 1, 4).unwrap());
        assert_eq!(r.count, 80.0);
    }

    #[test]
    fn blank_count_is_zero() {
        let csv = format!("{}P,Elective,Normal,Plan,04/01/2021,\n", ACTIVITY_HEADER);
        let rows = parse_activity("test.csv", csv.as_bytes()).unwrap();
        assert_eq!(rows[0].count, 0.0);
    }

    #[test]
    fn bad_date_aborts_the_load() {
        let csv = format!("{}P,Elective,Normal,Actuals,not-a-date,5\n", ACTIVITY_HEADER);
        let err = parse_activity("test.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::BadDate { row: 1, .. }));
    }

    #[test]
    fn negative_count_aborts_the_load() {
        let csv = format!("{}P,Elective,Normal,Actuals,04/01/2021,-3\n", ACTIVITY_HEADER);
        let err = parse_activity("test.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::BadNumber { .. }));
    }

    #[test]
    fn unknown_role_aborts_the_load() {
        let csv = format!("{}P,Elective,Normal,Forecast,04/01/2021,5\n", ACTIVITY_HEADER);
        let err = parse_activity("test.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::BadRole { .. }));
    }

    #[test]
    fn decodes_latin1_provider_names() {
        let mut bytes = ACTIVITY_HEADER.as_bytes().to_vec();
        bytes.extend_from_slice(b"Caf\xe9 Clinic,Elective,Normal,Actuals,04/01/2021,1\n");
        let rows = parse_activity("test.csv", &bytes).unwrap();
        assert_eq!(rows[0].provider, "Café Clinic");
    }

    #[test]
    fn duplicate_location_provider_is_fatal() {
        let csv = "Provider,Lat,Long,STP,Inner or Outer\n\
                   A,51.4,-0.2,South West London STP,Outer\n\
                   A,51.5,-0.1,South West London STP,Inner\n";
        let err = parse_locations("loc.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::DuplicateProvider { .. }));
    }

    #[test]
    fn parses_location_rows() {
        let csv = "Provider,Lat,Long,STP,Inner or Outer\n\
                   A,51.4,-0.2,South West London STP,Outer\n";
        let rows = parse_locations("loc.csv", csv.as_bytes()).unwrap();
        assert_eq!(rows[0].stp, "South West London STP");
        assert_eq!(rows[0].catchment, Catchment::Outer);
        assert!((rows[0].lat - 51.4).abs() < 1e-9);
    }
}
