use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{EntryId, WorklistEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Date still editable; no worklist yet.
    Unlocked,
    /// Worklist materialized, some units still unassigned.
    Locked,
    /// Every unit has an inspector.
    Complete,
    /// The complete schedule has been written out.
    Exported,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Unlocked => "unlocked",
            Phase::Locked => "locked",
            Phase::Complete => "complete",
            Phase::Exported => "exported",
        };
        f.write_str(label)
    }
}

/// An inspector change on an assigned entry that has not been saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub id: EntryId,
    pub unit_code: String,
    pub committed: String,
    pub proposed: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignOutcome {
    pub moved: Vec<EntryId>,
    /// Unsaved edits thrown away by this assignment.
    pub discarded_edits: usize,
}

/// Splits a locked worklist into units still waiting for an inspector and
/// units already given one.
///
/// Entries only ever move from `to_be_assigned` into `assigned`. Once
/// assigned, an entry's inspector changes only through a saved edit.
#[derive(Debug, Clone)]
pub struct AssignmentTracker {
    to_be_assigned: Vec<WorklistEntry>,
    assigned: Vec<WorklistEntry>,
    pending: BTreeMap<EntryId, String>,
    exported: bool,
}

fn normalize_inspector(inspector: &str) -> ScheduleResult<String> {
    let name = inspector.trim();
    if name.is_empty() {
        return Err(ScheduleError::InvalidInspector);
    }
    Ok(name.to_string())
}

impl AssignmentTracker {
    pub fn new(worklist: Vec<WorklistEntry>) -> Self {
        let to_be_assigned = worklist
            .into_iter()
            .map(|mut entry| {
                entry.selected = false;
                entry.inspector = None;
                entry
            })
            .collect();

        AssignmentTracker {
            to_be_assigned,
            assigned: Vec::new(),
            pending: BTreeMap::new(),
            exported: false,
        }
    }

    pub fn to_be_assigned(&self) -> &[WorklistEntry] {
        &self.to_be_assigned
    }

    /// Committed assignments, without pending edits.
    pub fn assigned(&self) -> &[WorklistEntry] {
        &self.assigned
    }

    pub fn entries(&self) -> impl Iterator<Item = &WorklistEntry> {
        self.to_be_assigned.iter().chain(self.assigned.iter())
    }

    pub fn is_complete(&self) -> bool {
        self.to_be_assigned.is_empty()
    }

    pub fn phase(&self) -> Phase {
        if !self.is_complete() {
            Phase::Locked
        } else if self.exported {
            Phase::Exported
        } else {
            Phase::Complete
        }
    }

    /// Sets the selection flag on an unassigned entry. Returns false when the
    /// id is not waiting for an inspector.
    pub fn set_selected(&mut self, id: EntryId, selected: bool) -> bool {
        match self.to_be_assigned.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self) -> usize {
        for entry in &mut self.to_be_assigned {
            entry.selected = true;
        }
        self.to_be_assigned.len()
    }

    pub fn clear_selection(&mut self) {
        for entry in &mut self.to_be_assigned {
            entry.selected = false;
        }
    }

    pub fn selected_count(&self) -> usize {
        self.to_be_assigned.iter().filter(|e| e.selected).count()
    }

    /// Moves every selected entry into `assigned` under `inspector`.
    ///
    /// Unsaved edits to already-assigned entries are dropped; the committed
    /// inspector stays in place.
    pub fn assign_selected(&mut self, inspector: &str) -> ScheduleResult<AssignOutcome> {
        let inspector = normalize_inspector(inspector)?;
        if self.selected_count() == 0 {
            return Err(ScheduleError::NoSelection);
        }

        let discarded_edits = self.pending.len();
        if discarded_edits > 0 {
            warn!(discarded_edits, "assigning dropped unsaved inspector edits");
            self.pending.clear();
        }

        let (selected, remaining): (Vec<WorklistEntry>, Vec<WorklistEntry>) =
            std::mem::take(&mut self.to_be_assigned)
                .into_iter()
                .partition(|e| e.selected);
        self.to_be_assigned = remaining;

        let mut moved = Vec::with_capacity(selected.len());
        for mut entry in selected {
            entry.selected = false;
            entry.inspector = Some(inspector.clone());
            moved.push(entry.id);
            self.assigned.push(entry);
        }

        info!(
            inspector = %inspector,
            units = moved.len(),
            remaining = self.to_be_assigned.len(),
            "assigned selected units"
        );
        Ok(AssignOutcome {
            moved,
            discarded_edits,
        })
    }

    /// Records an uncommitted inspector change for an assigned entry.
    /// Editing back to the committed value clears the pending change.
    pub fn stage_edit(&mut self, id: EntryId, inspector: &str) -> ScheduleResult<()> {
        let inspector = normalize_inspector(inspector)?;
        let entry = self
            .assigned
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ScheduleError::UnknownUnit(format!("#{id}")))?;

        if entry.inspector.as_deref() == Some(inspector.as_str()) {
            self.pending.remove(&id);
        } else {
            self.pending.insert(id, inspector);
        }
        Ok(())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_edits(&self) -> Vec<PendingEdit> {
        self.pending
            .iter()
            .filter_map(|(id, proposed)| {
                self.assigned.iter().find(|e| e.id == *id).map(|entry| PendingEdit {
                    id: *id,
                    unit_code: entry.unit_code().to_string(),
                    committed: entry.inspector.clone().unwrap_or_default(),
                    proposed: proposed.clone(),
                })
            })
            .collect()
    }

    /// The assigned table as the user currently sees it, edits applied.
    pub fn edited_view(&self) -> Vec<WorklistEntry> {
        self.assigned
            .iter()
            .map(|entry| {
                let mut view = entry.clone();
                if let Some(proposed) = self.pending.get(&entry.id) {
                    view.inspector = Some(proposed.clone());
                }
                view
            })
            .collect()
    }

    /// Commits pending edits. Returns how many entries changed.
    pub fn save_edits(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut applied = 0;
        for (id, proposed) in pending {
            if let Some(entry) = self.assigned.iter_mut().find(|e| e.id == id) {
                entry.inspector = Some(proposed);
                applied += 1;
            }
        }
        if applied > 0 {
            self.exported = false;
            info!(applied, "saved inspector edits");
        }
        applied
    }

    pub fn discard_edits(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Gate for export: every unit assigned and nothing left unsaved.
    pub fn ensure_exportable(&self) -> ScheduleResult<()> {
        if !self.is_complete() {
            return Err(ScheduleError::NotComplete {
                remaining: self.to_be_assigned.len(),
            });
        }
        if self.has_unsaved_changes() {
            return Err(ScheduleError::UnsavedChanges {
                pending: self.pending.len(),
            });
        }
        Ok(())
    }

    pub fn mark_exported(&mut self) {
        self.exported = true;
    }
}
