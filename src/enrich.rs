use std::cmp::Ordering;

use tracing::debug;

use crate::join::left_join;
use crate::models::{AreaOrderRow, LiaisonRow, TurnCandidate, UnitMeta, UnitOrderRow, WorklistEntry};

/// Joins unit ordering with area ordering on area.
///
/// Both sheets carry an `Order` column; the unit's becomes `position` and the
/// area's becomes `section`. Units whose area is unknown keep `section = None`.
pub fn build_unit_meta(units: &[UnitOrderRow], areas: &[AreaOrderRow]) -> Vec<UnitMeta> {
    left_join(
        units,
        areas,
        |u| u.area.as_deref(),
        |a| Some(a.area.as_str()),
    )
    .into_iter()
    .map(|(unit, area)| UnitMeta {
        unit_code: unit.unit_code.clone(),
        address: unit.address.clone(),
        area: unit.area.clone(),
        section: area.and_then(|a| a.order),
        position: unit.order,
    })
    .collect()
}

/// Known positions ascending, unknown positions last, unit code breaking ties.
pub fn position_order(a: &WorklistEntry, b: &WorklistEntry) -> Ordering {
    match (a.position, b.position) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.unit_code().cmp(b.unit_code()))
}

/// Attaches reference metadata and liaisons to the day's turns and orders
/// the result for display. Entry ids are the final row indexes.
pub fn build_worklist(
    turns: &[TurnCandidate],
    meta: &[UnitMeta],
    liaisons: &[LiaisonRow],
) -> Vec<WorklistEntry> {
    let with_meta = left_join(
        turns,
        meta,
        |t| Some(t.unit_code.as_str()),
        |m| Some(m.unit_code.as_str()),
    );

    let mut entries: Vec<WorklistEntry> = left_join(
        &with_meta,
        liaisons,
        |(turn, _)| Some(turn.unit_code.as_str()),
        |l| Some(l.unit_code.as_str()),
    )
    .into_iter()
    .map(|((turn, meta), liaison)| WorklistEntry {
        id: 0,
        turn: (*turn).clone(),
        address: meta.and_then(|m| m.address.clone()),
        area: meta.and_then(|m| m.area.clone()),
        section: meta.and_then(|m| m.section),
        position: meta.and_then(|m| m.position),
        owner_liaison: liaison.and_then(|l| l.owner_liaison.clone()),
        home_liaison: liaison.and_then(|l| l.home_liaison.clone()),
        selected: false,
        inspector: None,
    })
    .collect();

    entries.sort_by(position_order);
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.id = idx;
    }

    let unplaced = entries.iter().filter(|e| e.position.is_none()).count();
    debug!(entries = entries.len(), unplaced, "built worklist");
    entries
}
