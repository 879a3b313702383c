use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::WorklistEntry;
use crate::tracker::AssignmentTracker;

/// Header figures for the day: back-to-back units, owner arrivals, areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorklistMetrics {
    pub b2bs: usize,
    pub owners: usize,
    pub areas: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectorLoad {
    pub inspector: String,
    pub assigned: usize,
    /// Signed distance from the mean assignment count.
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workload {
    pub mean: f64,
    pub inspectors: Vec<InspectorLoad>,
}

/// Counts over any set of worklist entries. Units without an area count
/// together as one more area.
pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a WorklistEntry>) -> WorklistMetrics {
    let mut units = HashSet::new();
    let mut areas: HashSet<Option<&str>> = HashSet::new();
    let mut owners = 0;

    for entry in entries {
        units.insert(entry.unit_code());
        areas.insert(entry.area.as_deref());
        if entry.turn.is_owner_arrival() {
            owners += 1;
        }
    }

    WorklistMetrics {
        b2bs: units.len(),
        owners,
        areas: areas.len(),
    }
}

pub fn worklist_metrics(tracker: &AssignmentTracker) -> WorklistMetrics {
    summarize(tracker.entries())
}

/// Per-inspector counts over committed assignments, sorted by inspector.
pub fn workload(tracker: &AssignmentTracker) -> Workload {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in tracker.assigned() {
        if let Some(inspector) = entry.inspector.as_deref() {
            *counts.entry(inspector).or_insert(0) += 1;
        }
    }

    let mean = if counts.is_empty() {
        0.0
    } else {
        counts.values().sum::<usize>() as f64 / counts.len() as f64
    };

    Workload {
        mean,
        inspectors: counts
            .into_iter()
            .map(|(inspector, assigned)| InspectorLoad {
                inspector: inspector.to_string(),
                assigned,
                deviation: assigned as f64 - mean,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::tests::entry;

    #[test]
    fn counts_units_owners_and_areas() {
        let mut a = entry(0, "U1", Some(1));
        a.turn.incoming_type = "Owner".to_string();
        let mut b = entry(1, "U1", Some(1));
        b.area = Some("South".to_string());
        let mut c = entry(2, "U2", None);
        c.area = None;

        let metrics = summarize(&[a, b, c]);
        assert_eq!(
            metrics,
            WorklistMetrics {
                b2bs: 2,
                owners: 1,
                areas: 3
            }
        );
    }

    #[test]
    fn unplaced_units_share_one_area() {
        let known = entry(0, "U1", Some(1));
        let mut first = entry(1, "U2", None);
        first.area = None;
        let mut second = entry(2, "U3", None);
        second.area = None;

        assert_eq!(summarize(&[known.clone()]).areas, 1);
        assert_eq!(summarize(&[known, first, second]).areas, 2);
    }

    #[test]
    fn owner_type_must_match_exactly() {
        let mut shouting = entry(0, "U1", Some(1));
        shouting.turn.incoming_type = "OWNER".to_string();
        let mut lower = entry(1, "U2", Some(2));
        lower.turn.incoming_type = "owner".to_string();
        let mut owner = entry(2, "U3", Some(3));
        owner.turn.incoming_type = "Owner".to_string();

        assert_eq!(summarize(&[shouting, lower, owner]).owners, 1);
    }

    #[test]
    fn workload_reports_deviation_from_mean() {
        let mut tracker = AssignmentTracker::new(vec![
            entry(0, "U1", Some(1)),
            entry(1, "U2", Some(2)),
            entry(2, "U3", Some(3)),
            entry(3, "U4", Some(4)),
        ]);
        for id in 0..3 {
            tracker.set_selected(id, true);
        }
        tracker.assign_selected("Alice").unwrap();
        tracker.set_selected(3, true);
        tracker.assign_selected("Bruno").unwrap();

        let load = workload(&tracker);
        assert_eq!(load.mean, 2.0);
        assert_eq!(load.inspectors[0].inspector, "Alice");
        assert_eq!(load.inspectors[0].deviation, 1.0);
        assert_eq!(load.inspectors[1].deviation, -1.0);
    }

    #[test]
    fn repeated_queries_agree() {
        let mut tracker = AssignmentTracker::new(vec![entry(0, "U1", Some(1)), entry(1, "U2", None)]);
        tracker.set_selected(1, true);
        tracker.assign_selected("Alice").unwrap();

        assert_eq!(worklist_metrics(&tracker), worklist_metrics(&tracker));
        assert_eq!(workload(&tracker), workload(&tracker));
    }

    #[test]
    fn empty_workload_has_zero_mean() {
        let tracker = AssignmentTracker::new(vec![entry(0, "U1", Some(1))]);
        let load = workload(&tracker);
        assert_eq!(load.mean, 0.0);
        assert!(load.inspectors.is_empty());
    }
}
