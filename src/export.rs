use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::ScheduleResult;
use crate::models::{ReservationRecord, WorklistEntry};

pub const EXPORT_DATE_FORMAT: &str = "%m/%d/%Y";

/// One row of the finished inspector schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Inspector")]
    pub inspector: String,
    #[serde(rename = "Unit_Code")]
    pub unit_code: String,
    #[serde(rename = "Friendly_Name")]
    pub friendly_name: String,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "Sleeps")]
    pub sleeps: Option<u32>,
    #[serde(rename = "Bedrooms")]
    pub bedrooms: Option<u32>,
    #[serde(rename = "Bathrooms")]
    pub bathrooms: Option<String>,
    #[serde(rename = "Incoming_Type")]
    pub incoming_type: String,
    #[serde(rename = "Area")]
    pub area: Option<String>,
    #[serde(rename = "Departing_Reservation_Number")]
    pub departing_reservation_number: String,
    #[serde(rename = "Incoming_Reservation_Number")]
    pub incoming_reservation_number: String,
    #[serde(rename = "Position")]
    pub position: Option<i64>,
    #[serde(rename = "Housekeeper")]
    pub housekeeper: Option<String>,
}

/// Unit to housekeeper, keeping the first non-blank name seen in export order.
pub fn housekeeper_by_unit(records: &[ReservationRecord]) -> HashMap<&str, &str> {
    let mut map = HashMap::new();
    for record in records {
        if let Some(name) = record.housekeeper.as_deref() {
            map.entry(record.unit_code.as_str()).or_insert(name);
        }
    }
    map
}

fn format_bathrooms(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Builds the export rows sorted by inspector, then position.
/// Entries without a position sort last within their inspector.
pub fn build_schedule(
    date: NaiveDate,
    assigned: &[WorklistEntry],
    records: &[ReservationRecord],
) -> Vec<ScheduleRow> {
    let housekeepers = housekeeper_by_unit(records);
    let mut ordered: Vec<&WorklistEntry> = assigned.iter().collect();
    ordered.sort_by(|a, b| {
        a.inspector
            .cmp(&b.inspector)
            .then_with(|| crate::enrich::position_order(a, b))
    });

    let day = date.format(EXPORT_DATE_FORMAT).to_string();
    ordered
        .into_iter()
        .map(|entry| ScheduleRow {
            date: day.clone(),
            inspector: entry.inspector.clone().unwrap_or_default(),
            unit_code: entry.turn.unit_code.clone(),
            friendly_name: entry.turn.friendly_name.clone(),
            address: entry.address.clone(),
            sleeps: entry.turn.sleeps,
            bedrooms: entry.turn.bedrooms,
            bathrooms: entry.turn.bathrooms.map(format_bathrooms),
            incoming_type: entry.turn.incoming_type.clone(),
            area: entry.area.clone(),
            departing_reservation_number: entry.turn.departing_reservation_number.clone(),
            incoming_reservation_number: entry.turn.incoming_reservation_number.clone(),
            position: entry.position,
            housekeeper: housekeepers
                .get(entry.unit_code())
                .map(|name| name.to_string()),
        })
        .collect()
}

pub fn write_schedule<W: Write>(rows: &[ScheduleRow], writer: W) -> ScheduleResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record([
            "Date",
            "Inspector",
            "Unit_Code",
            "Friendly_Name",
            "Address",
            "Sleeps",
            "Bedrooms",
            "Bathrooms",
            "Incoming_Type",
            "Area",
            "Departing_Reservation_Number",
            "Incoming_Reservation_Number",
            "Position",
            "Housekeeper",
        ])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_schedule_to_path(rows: &[ScheduleRow], path: &Path) -> ScheduleResult<()> {
    let file = std::fs::File::create(path)?;
    write_schedule(rows, file)?;
    info!(rows = rows.len(), path = %path.display(), "wrote inspector schedule");
    Ok(())
}

pub fn default_file_name(date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("Inspector_Schedule_{}.csv", date.format("%m-%d-%Y")))
}
