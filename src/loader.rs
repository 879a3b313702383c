use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{AreaOrderRow, InspectorRow, LiaisonRow, ReservationRecord, UnitOrderRow};
use crate::table::{cell, Table};

pub const EXPORT_NAME: &str = "reservation export";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

const SHORT_YEAR_DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
];

const SHORT_YEAR_DATE_FORMATS: &[&str] = &["%m/%d/%y"];

/// `%Y` also accepts one to three digits, so two-digit years are routed to `%y`.
fn has_short_year(value: &str) -> bool {
    let date = value.split_whitespace().next().unwrap_or_default();
    let parts: Vec<&str> = date.split('/').collect();
    parts.len() == 3 && parts[2].len() == 2 && parts[2].bytes().all(|b| b.is_ascii_digit())
}

fn parse_with(value: &str, datetime_formats: &[&str], date_formats: &[&str]) -> Option<NaiveDate> {
    for format in datetime_formats {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.date());
        }
    }
    for format in date_formats {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    None
}

/// Parses an export date or timestamp, keeping only the calendar date.
///
/// Years outside four digits (other than `MM/DD/YY`) are rejected rather
/// than read as the first millennium.
pub fn parse_export_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let parsed = if has_short_year(value) {
        parse_with(value, SHORT_YEAR_DATETIME_FORMATS, SHORT_YEAR_DATE_FORMATS)
    } else {
        parse_with(value, DATETIME_FORMATS, DATE_FORMATS).or_else(|| {
            // Fractional seconds or a trailing offset after a date-time prefix.
            value
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
                .filter(|_| value.as_bytes().get(10).is_some_and(|b| *b == b' ' || *b == b'T'))
        })
    };
    parsed.filter(|date| (1000..=9999).contains(&date.year()))
}

/// Reads a whole-number cell, accepting spreadsheet floats such as `12.0`.
pub fn parse_whole(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if let Ok(parsed) = value.parse::<i64>() {
        return Some(parsed);
    }
    let parsed = value.parse::<f64>().ok()?;
    // i64::MAX is not representable; 2^63 is the first value out of range.
    let in_range = parsed >= i64::MIN as f64 && parsed < i64::MAX as f64;
    (parsed.fract() == 0.0 && in_range).then_some(parsed as i64)
}

struct ExportColumns {
    unit_code: usize,
    friendly_name: usize,
    sleeps: usize,
    bedrooms: usize,
    bathrooms: usize,
    housekeeper: usize,
    reservation_number: usize,
    reservation_type: usize,
    arrival: usize,
    departure: usize,
}

impl ExportColumns {
    fn locate(table: &Table) -> ScheduleResult<Self> {
        Ok(ExportColumns {
            unit_code: table.require("Unit_Code")?,
            friendly_name: table.require("PropertyName")?,
            sleeps: table.require("SleepsMaximum")?,
            bedrooms: table.require("Bedrooms")?,
            bathrooms: table.require("Bathrooms")?,
            housekeeper: table.require("Housekeeper_Name")?,
            reservation_number: table.require("Reservation_Number")?,
            reservation_type: table.require("ReservationTypeDescription")?,
            arrival: table.require("Start_Date")?,
            departure: table.require("Departure")?,
        })
    }
}

/// Normalizes the raw export into typed reservations.
///
/// Any missing column, blank unit code, unreadable number or unreadable date
/// rejects the whole export.
pub fn load_reservations(table: &Table) -> ScheduleResult<Vec<ReservationRecord>> {
    let columns = ExportColumns::locate(table)?;
    let mut records = Vec::with_capacity(table.len());

    for (idx, row) in table.rows.iter().enumerate() {
        let row_number = table.line(idx);
        let unit_code = cell(row, columns.unit_code)
            .ok_or_else(|| ScheduleError::malformed(&table.name, row_number, "Unit_Code is blank"))?;

        records.push(ReservationRecord {
            unit_code: unit_code.to_string(),
            friendly_name: cell(row, columns.friendly_name).unwrap_or_default().to_string(),
            sleeps: count_cell(table, row, columns.sleeps, "SleepsMaximum", row_number)?,
            bedrooms: count_cell(table, row, columns.bedrooms, "Bedrooms", row_number)?,
            bathrooms: bath_cell(table, row, columns.bathrooms, row_number)?,
            housekeeper: cell(row, columns.housekeeper).map(str::to_string),
            reservation_number: cell(row, columns.reservation_number)
                .unwrap_or_default()
                .to_string(),
            reservation_type: cell(row, columns.reservation_type)
                .unwrap_or_default()
                .to_string(),
            arrival: date_cell(table, row, columns.arrival, "Start_Date", row_number)?,
            departure: date_cell(table, row, columns.departure, "Departure", row_number)?,
        });
    }

    info!(rows = records.len(), "loaded reservation export");
    Ok(records)
}

pub fn read_reservations(path: &Path) -> ScheduleResult<Vec<ReservationRecord>> {
    let table = Table::from_path(EXPORT_NAME, path)?;
    load_reservations(&table)
}

fn count_cell(
    table: &Table,
    row: &[String],
    idx: usize,
    column: &str,
    row_number: usize,
) -> ScheduleResult<Option<u32>> {
    let Some(raw) = cell(row, idx) else {
        return Ok(None);
    };
    parse_whole(raw)
        .and_then(|v| u32::try_from(v).ok())
        .map(Some)
        .ok_or_else(|| {
            ScheduleError::malformed(
                &table.name,
                row_number,
                format!("{column} `{raw}` is not a whole number"),
            )
        })
}

fn bath_cell(
    table: &Table,
    row: &[String],
    idx: usize,
    row_number: usize,
) -> ScheduleResult<Option<f32>> {
    let Some(raw) = cell(row, idx) else {
        return Ok(None);
    };
    raw.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Some)
        .ok_or_else(|| {
            ScheduleError::malformed(
                &table.name,
                row_number,
                format!("Bathrooms `{raw}` is not a number"),
            )
        })
}

fn date_cell(
    table: &Table,
    row: &[String],
    idx: usize,
    column: &str,
    row_number: usize,
) -> ScheduleResult<NaiveDate> {
    let raw = cell(row, idx).unwrap_or_default();
    parse_export_date(raw).ok_or_else(|| {
        ScheduleError::malformed(
            &table.name,
            row_number,
            format!("{column} `{raw}` is not a date"),
        )
    })
}

fn order_cell(
    table: &Table,
    row: &[String],
    idx: usize,
    row_number: usize,
) -> ScheduleResult<Option<i64>> {
    let Some(raw) = cell(row, idx) else {
        return Ok(None);
    };
    parse_whole(raw).map(Some).ok_or_else(|| {
        ScheduleError::malformed(
            &table.name,
            row_number,
            format!("Order `{raw}` is not a whole number"),
        )
    })
}

/// Reads the unit ordering sheet (`Unit_Code`, `Area`, `Order`, optional `Address`).
pub fn load_unit_order(table: &Table) -> ScheduleResult<Vec<UnitOrderRow>> {
    let unit_code = table.require("Unit_Code")?;
    let area = table.require("Area")?;
    let order = table.require("Order")?;
    let address = table.column("Address");

    let mut rows = Vec::new();
    for (idx, row) in table.rows.iter().enumerate() {
        let Some(code) = cell(row, unit_code) else {
            debug!(sheet = %table.name, line = table.line(idx), "skipping unit row without a code");
            continue;
        };
        rows.push(UnitOrderRow {
            unit_code: code.to_string(),
            address: address.and_then(|i| cell(row, i)).map(str::to_string),
            area: cell(row, area).map(str::to_string),
            order: order_cell(table, row, order, table.line(idx))?,
        });
    }
    Ok(rows)
}

pub fn load_area_order(table: &Table) -> ScheduleResult<Vec<AreaOrderRow>> {
    let area = table.require("Area")?;
    let order = table.require("Order")?;

    let mut rows = Vec::new();
    for (idx, row) in table.rows.iter().enumerate() {
        let Some(name) = cell(row, area) else {
            continue;
        };
        rows.push(AreaOrderRow {
            area: name.to_string(),
            order: order_cell(table, row, order, table.line(idx))?,
        });
    }
    Ok(rows)
}

pub fn load_liaisons(table: &Table) -> ScheduleResult<Vec<LiaisonRow>> {
    let unit_code = table.require("Unit_Code")?;
    let owner = table.require("OL")?;
    let home = table.require("HL")?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            cell(row, unit_code).map(|code| LiaisonRow {
                unit_code: code.to_string(),
                owner_liaison: cell(row, owner).map(str::to_string),
                home_liaison: cell(row, home).map(str::to_string),
            })
        })
        .collect())
}

pub fn load_inspectors(table: &Table) -> ScheduleResult<Vec<InspectorRow>> {
    let employee = table.require("Employee")?;
    let role = table.require("Role")?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            cell(row, employee).map(|name| InspectorRow {
                employee: name.to_string(),
                role: cell(row, role).map(str::to_string),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Unit_Code,PropertyName,SleepsMaximum,Bedrooms,Bathrooms,Housekeeper_Name,Reservation_Number,ReservationTypeDescription,Start_Date,Departure,Extra";

    fn export(rows: &[&str]) -> Table {
        let mut data = String::from(HEADER);
        for row in rows {
            data.push('\n');
            data.push_str(row);
        }
        Table::from_reader(EXPORT_NAME, data.as_bytes()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn timestamps_truncate_to_calendar_dates() {
        let table = export(&[
            "SB12,Sea Breeze,8,3,2.5,Maria Lopez,R100,Guest,2024-06-05 14:00:00,2024-06-08 11:00:00,x",
        ]);
        let records = load_reservations(&table).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.arrival, date(2024, 6, 5));
        assert_eq!(record.departure, date(2024, 6, 8));
        assert_eq!(record.sleeps, Some(8));
        assert_eq!(record.bathrooms, Some(2.5));
        assert_eq!(record.housekeeper.as_deref(), Some("Maria Lopez"));
    }

    #[test]
    fn accepts_us_style_timestamps() {
        assert_eq!(parse_export_date("6/8/2024 4:00:00 PM"), Some(date(2024, 6, 8)));
        assert_eq!(parse_export_date("06/08/2024"), Some(date(2024, 6, 8)));
        assert_eq!(parse_export_date("2024-06-08T10:30:00.000Z"), Some(date(2024, 6, 8)));
        assert_eq!(parse_export_date("June 8th"), None);
        assert_eq!(parse_export_date(""), None);
    }

    #[test]
    fn unparseable_date_rejects_the_export() {
        let table = export(&[
            "SB12,Sea Breeze,8,3,2,,R100,Guest,2024-06-05,2024-06-08,",
            "SB14,Dune Loft,4,2,1,,R101,Guest,soon,2024-06-08,",
        ]);
        match load_reservations(&table) {
            Err(ScheduleError::MalformedInput { row, message, .. }) => {
                assert_eq!(row, 3);
                assert!(message.contains("Start_Date"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn two_digit_years_land_in_this_century() {
        assert_eq!(parse_export_date("6/8/24"), Some(date(2024, 6, 8)));
        assert_eq!(parse_export_date("6/8/24 4:00 PM"), Some(date(2024, 6, 8)));
        assert_eq!(parse_export_date("06/08/24 16:00"), Some(date(2024, 6, 8)));
    }

    #[test]
    fn short_non_two_digit_years_are_rejected() {
        assert_eq!(parse_export_date("6/8/024"), None);
        assert_eq!(parse_export_date("6/8/4"), None);
        assert_eq!(parse_export_date("24-06-08"), None);
    }

    #[test]
    fn malformed_row_reports_its_file_line() {
        let data = format!(
            "{HEADER}\nSB12,Sea Breeze,8,3,2,,R100,Guest,2024-06-05,2024-06-08,\n,,,,,,,,,,\nSB14,Dune Loft,4,2,1,,R101,Guest,2024-06-05,later,\n"
        );
        let table = Table::from_reader(EXPORT_NAME, data.as_bytes()).unwrap();
        let err = load_reservations(&table).unwrap_err();
        assert!(matches!(err, ScheduleError::MalformedInput { row: 4, .. }));
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn whole_numbers_outside_i64_are_rejected() {
        assert_eq!(parse_whole("12.0"), Some(12));
        assert_eq!(parse_whole("-3"), Some(-3));
        assert_eq!(parse_whole("1e30"), None);
        assert_eq!(parse_whole("-1e30"), None);
        assert_eq!(parse_whole("NaN"), None);
        assert_eq!(parse_whole("inf"), None);
    }

    #[test]
    fn missing_column_rejects_the_export() {
        let data = "Unit_Code,PropertyName\nSB12,Sea Breeze\n";
        let table = Table::from_reader(EXPORT_NAME, data.as_bytes()).unwrap();
        let err = load_reservations(&table).unwrap_err();
        assert!(matches!(err, ScheduleError::MissingColumn { ref column, .. } if column == "SleepsMaximum"));
    }

    #[test]
    fn blank_capacity_is_kept_as_unknown() {
        let table = export(&["SB12,Sea Breeze,,,,,R100,Owner,2024-06-05,2024-06-08,"]);
        let records = load_reservations(&table).unwrap();
        assert_eq!(records[0].sleeps, None);
        assert_eq!(records[0].bathrooms, None);
        assert_eq!(records[0].housekeeper, None);
    }

    #[test]
    fn unit_order_coerces_spreadsheet_floats() {
        let data = "Unit_Code,Address,Area,Order\nSB12,12 Shore Rd,North,3.0\n,,,\nSB14,,South,\n";
        let table = Table::from_reader("unit-order", data.as_bytes()).unwrap();
        let rows = load_unit_order(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].order, Some(3));
        assert_eq!(rows[0].address.as_deref(), Some("12 Shore Rd"));
        assert_eq!(rows[1].order, None);
    }

    #[test]
    fn fractional_order_is_malformed() {
        let data = "Unit_Code,Area,Order\nSB12,North,3.5\n";
        let table = Table::from_reader("unit-order", data.as_bytes()).unwrap();
        assert!(load_unit_order(&table).unwrap_err().is_fatal_to_upload());
    }
}
