use chrono::NaiveDate;

/// One line of the housekeeping arrival/departure export.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRecord {
    pub unit_code: String,
    pub friendly_name: String,
    pub sleeps: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f32>,
    pub housekeeper: Option<String>,
    pub reservation_number: String,
    pub reservation_type: String,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub unit_code: String,
    pub friendly_name: String,
    pub sleeps: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f32>,
    pub housekeeper: Option<String>,
    pub departing_reservation_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrival {
    pub unit_code: String,
    pub incoming_reservation_number: String,
    pub incoming_type: String,
}

/// A unit that empties and refills on the same day.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnCandidate {
    pub unit_code: String,
    pub friendly_name: String,
    pub sleeps: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f32>,
    pub housekeeper: Option<String>,
    pub departing_reservation_number: String,
    pub incoming_reservation_number: String,
    pub incoming_type: String,
}

impl TurnCandidate {
    pub fn is_owner_arrival(&self) -> bool {
        self.incoming_type == "Owner"
    }
}

/// Row of the unit ordering sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOrderRow {
    pub unit_code: String,
    pub address: Option<String>,
    pub area: Option<String>,
    pub order: Option<i64>,
}

/// Row of the area ordering sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOrderRow {
    pub area: String,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiaisonRow {
    pub unit_code: String,
    pub owner_liaison: Option<String>,
    pub home_liaison: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectorRow {
    pub employee: String,
    pub role: Option<String>,
}

/// Per-unit reference data after joining unit and area ordering.
///
/// `section` is the area sheet's `Order`, `position` the unit sheet's `Order`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMeta {
    pub unit_code: String,
    pub address: Option<String>,
    pub area: Option<String>,
    pub section: Option<i64>,
    pub position: Option<i64>,
}

/// Index of an entry in the locked worklist; stable for the whole run.
pub type EntryId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct WorklistEntry {
    pub id: EntryId,
    pub turn: TurnCandidate,
    pub address: Option<String>,
    pub area: Option<String>,
    pub section: Option<i64>,
    pub position: Option<i64>,
    pub owner_liaison: Option<String>,
    pub home_liaison: Option<String>,
    pub selected: bool,
    pub inspector: Option<String>,
}

impl WorklistEntry {
    pub fn unit_code(&self) -> &str {
        &self.turn.unit_code
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RosterEntry {
    pub name: String,
    pub role: String,
}
