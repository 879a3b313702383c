use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use crate::join::inner_join;
use crate::models::{Arrival, Departure, ReservationRecord, TurnCandidate};

/// Scheduling date offered before the user picks one: the coming Saturday,
/// or `today` itself when it already is Saturday.
pub fn upcoming_saturday(today: NaiveDate) -> NaiveDate {
    let offset = (5 + 7 - today.weekday().num_days_from_monday() as i64) % 7;
    today + Duration::days(offset)
}

pub fn departures_on(records: &[ReservationRecord], date: NaiveDate) -> Vec<Departure> {
    records
        .iter()
        .filter(|r| r.departure == date)
        .map(|r| Departure {
            unit_code: r.unit_code.clone(),
            friendly_name: r.friendly_name.clone(),
            sleeps: r.sleeps,
            bedrooms: r.bedrooms,
            bathrooms: r.bathrooms,
            housekeeper: r.housekeeper.clone(),
            departing_reservation_number: r.reservation_number.clone(),
        })
        .collect()
}

pub fn arrivals_on(records: &[ReservationRecord], date: NaiveDate) -> Vec<Arrival> {
    records
        .iter()
        .filter(|r| r.arrival == date)
        .map(|r| Arrival {
            unit_code: r.unit_code.clone(),
            incoming_reservation_number: r.reservation_number.clone(),
            incoming_type: r.reservation_type.clone(),
        })
        .collect()
}

/// Units with both a departure and an arrival on `date`.
///
/// Several departures or arrivals for one unit on the same day produce one
/// candidate per (departure, arrival) pair; they are not collapsed.
pub fn match_turns(records: &[ReservationRecord], date: NaiveDate) -> Vec<TurnCandidate> {
    let departures = departures_on(records, date);
    let arrivals = arrivals_on(records, date);

    let turns: Vec<TurnCandidate> = inner_join(
        &departures,
        &arrivals,
        |d| d.unit_code.as_str(),
        |a| Some(a.unit_code.as_str()),
    )
    .into_iter()
    .map(|(departure, arrival)| TurnCandidate {
        unit_code: departure.unit_code.clone(),
        friendly_name: departure.friendly_name.clone(),
        sleeps: departure.sleeps,
        bedrooms: departure.bedrooms,
        bathrooms: departure.bathrooms,
        housekeeper: departure.housekeeper.clone(),
        departing_reservation_number: departure.departing_reservation_number.clone(),
        incoming_reservation_number: arrival.incoming_reservation_number.clone(),
        incoming_type: arrival.incoming_type.clone(),
    })
    .collect();

    debug!(
        %date,
        departures = departures.len(),
        arrivals = arrivals.len(),
        turns = turns.len(),
        "matched back-to-back turns"
    );
    turns
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn reservation(
        unit: &str,
        number: &str,
        kind: &str,
        arrival: NaiveDate,
        departure: NaiveDate,
    ) -> ReservationRecord {
        ReservationRecord {
            unit_code: unit.to_string(),
            friendly_name: format!("{unit} Cottage"),
            sleeps: Some(6),
            bedrooms: Some(3),
            bathrooms: Some(2.0),
            housekeeper: Some("Dana Reyes".to_string()),
            reservation_number: number.to_string(),
            reservation_type: kind.to_string(),
            arrival,
            departure,
        }
    }

    #[test]
    fn upcoming_saturday_is_today_on_saturday() {
        // 2024-06-08 was a Saturday.
        assert_eq!(upcoming_saturday(date(2024, 6, 8)), date(2024, 6, 8));
        assert_eq!(upcoming_saturday(date(2024, 6, 3)), date(2024, 6, 8));
        assert_eq!(upcoming_saturday(date(2024, 6, 9)), date(2024, 6, 15));
    }

    #[test]
    fn only_back_to_back_units_are_turns() {
        let day = date(2024, 6, 8);
        let records = vec![
            reservation("U1", "R1", "Guest", date(2024, 6, 1), day),
            reservation("U1", "R2", "Owner", day, date(2024, 6, 15)),
            reservation("U2", "R3", "Guest", date(2024, 6, 2), day),
            reservation("U3", "R4", "Guest", day, date(2024, 6, 12)),
        ];

        let turns = match_turns(&records, day);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].unit_code, "U1");
        assert_eq!(turns[0].departing_reservation_number, "R1");
        assert_eq!(turns[0].incoming_reservation_number, "R2");
        assert!(turns[0].is_owner_arrival());
    }

    #[test]
    fn every_turn_departs_and_arrives_on_the_date() {
        let day = date(2024, 6, 8);
        let records = vec![
            reservation("U1", "R1", "Guest", date(2024, 6, 1), day),
            reservation("U1", "R2", "Guest", day, date(2024, 6, 15)),
            reservation("U4", "R5", "Guest", date(2024, 6, 8), date(2024, 6, 9)),
            reservation("U4", "R6", "Guest", date(2024, 6, 9), date(2024, 6, 11)),
        ];
        for candidate in [date(2024, 6, 8), date(2024, 6, 9), date(2024, 6, 10)] {
            for turn in match_turns(&records, candidate) {
                assert!(records
                    .iter()
                    .any(|r| r.unit_code == turn.unit_code && r.departure == candidate));
                assert!(records
                    .iter()
                    .any(|r| r.unit_code == turn.unit_code && r.arrival == candidate));
            }
        }
        assert_eq!(match_turns(&records, date(2024, 6, 9))[0].unit_code, "U4");
    }

    #[test]
    fn empty_side_yields_no_turns() {
        let day = date(2024, 6, 8);
        let records = vec![reservation("U2", "R3", "Guest", date(2024, 6, 2), day)];
        assert!(match_turns(&records, day).is_empty());
        assert!(match_turns(&[], day).is_empty());
    }

    #[test]
    fn duplicate_same_day_rows_cross_multiply() {
        // Two departures and two arrivals on one day give four candidates.
        let day = date(2024, 6, 8);
        let records = vec![
            reservation("U1", "D1", "Guest", date(2024, 6, 1), day),
            reservation("U1", "D2", "Guest", date(2024, 6, 7), day),
            reservation("U1", "A1", "Guest", day, date(2024, 6, 10)),
            reservation("U1", "A2", "Owner", day, date(2024, 6, 12)),
        ];
        let turns = match_turns(&records, day);
        let pairs: Vec<(&str, &str)> = turns
            .iter()
            .map(|t| {
                (
                    t.departing_reservation_number.as_str(),
                    t.incoming_reservation_number.as_str(),
                )
            })
            .collect();
        assert_eq!(pairs, vec![("D1", "A1"), ("D1", "A2"), ("D2", "A1"), ("D2", "A2")]);
    }
}
