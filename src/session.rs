use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::enrich::build_worklist;
use crate::error::{ScheduleError, ScheduleResult};
use crate::export::{self, ScheduleRow};
use crate::loader;
use crate::matcher::{match_turns, upcoming_saturday};
use crate::metrics::{self, Workload, WorklistMetrics};
use crate::models::{EntryId, ReservationRecord, RosterEntry, WorklistEntry};
use crate::roster::{build_roster, is_on_roster};
use crate::sheets::{ReferenceData, SheetCache, SheetIds, TableSource};
use crate::tracker::{AssignOutcome, AssignmentTracker, PendingEdit, Phase};

struct LockedSchedule {
    tracker: AssignmentTracker,
    roster: Vec<RosterEntry>,
}

/// Everything one user's scheduling run owns: the uploaded export, the
/// memoized reference sheets, the chosen date and, once locked, the tracker.
pub struct SessionContext {
    id: Uuid,
    reservations: Vec<ReservationRecord>,
    sheets: SheetCache,
    sheet_ids: SheetIds,
    date: NaiveDate,
    locked: Option<LockedSchedule>,
}

/// Which partition a `#N` / unit-code target is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Unassigned,
    Assigned,
}

impl SessionContext {
    pub fn new(source: Arc<dyn TableSource>, sheet_ids: SheetIds, today: NaiveDate) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "session started");
        SessionContext {
            id,
            reservations: Vec::new(),
            sheets: SheetCache::new(source),
            sheet_ids,
            date: upcoming_saturday(today),
            locked: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn reservations(&self) -> &[ReservationRecord] {
        &self.reservations
    }

    /// Replaces the export and resets the run to `Unlocked`.
    pub fn load_export(&mut self, reservations: Vec<ReservationRecord>) {
        if let Some(locked) = &self.locked {
            if locked.tracker.has_unsaved_changes() {
                warn!(session = %self.id, "new export dropped unsaved inspector edits");
            }
        }
        self.reservations = reservations;
        self.locked = None;
        info!(session = %self.id, rows = self.reservations.len(), "export loaded");
    }

    /// Reads an export file. A malformed file is rejected whole and the
    /// current run is left untouched.
    pub fn load_export_path(&mut self, path: &Path) -> ScheduleResult<usize> {
        let reservations = loader::read_reservations(path)?;
        let rows = reservations.len();
        self.load_export(reservations);
        Ok(rows)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn phase(&self) -> Phase {
        self.locked
            .as_ref()
            .map_or(Phase::Unlocked, |locked| locked.tracker.phase())
    }

    fn invalid(&self, action: &str) -> ScheduleError {
        ScheduleError::InvalidTransition {
            phase: self.phase().to_string(),
            action: action.to_string(),
        }
    }

    pub fn set_date(&mut self, date: NaiveDate) -> ScheduleResult<()> {
        if self.locked.is_some() {
            return Err(self.invalid("change the date"));
        }
        self.date = date;
        Ok(())
    }

    /// Fixes the date and materializes the worklist: every turn starts in
    /// `to_be_assigned`.
    pub async fn lock_in(&mut self) -> ScheduleResult<&AssignmentTracker> {
        if self.locked.is_some() {
            return Err(self.invalid("lock in"));
        }

        let reference = ReferenceData::load(&mut self.sheets, &self.sheet_ids).await?;
        let turns = match_turns(&self.reservations, self.date);
        let worklist = build_worklist(&turns, &reference.units, &reference.liaisons);
        let roster = build_roster(&reference.inspectors, &reference.liaisons);

        info!(
            session = %self.id,
            date = %self.date,
            units = worklist.len(),
            roster = roster.len(),
            "schedule locked"
        );
        let locked = self.locked.insert(LockedSchedule {
            tracker: AssignmentTracker::new(worklist),
            roster,
        });
        Ok(&locked.tracker)
    }

    pub fn tracker(&self) -> ScheduleResult<&AssignmentTracker> {
        self.locked
            .as_ref()
            .map(|locked| &locked.tracker)
            .ok_or_else(|| self.invalid("view the worklist"))
    }

    fn tracker_mut(&mut self, action: &str) -> ScheduleResult<&mut AssignmentTracker> {
        self.locked
            .as_mut()
            .map(|locked| &mut locked.tracker)
            .ok_or_else(|| ScheduleError::InvalidTransition {
                phase: Phase::Unlocked.to_string(),
                action: action.to_string(),
            })
    }

    pub fn roster(&self) -> &[RosterEntry] {
        self.locked
            .as_ref()
            .map_or(&[][..], |locked| locked.roster.as_slice())
    }

    fn resolve(&self, target: &str, scope: Scope) -> ScheduleResult<Vec<EntryId>> {
        let tracker = self.tracker()?;
        let pool: &[WorklistEntry] = match scope {
            Scope::Unassigned => tracker.to_be_assigned(),
            Scope::Assigned => tracker.assigned(),
        };

        let ids: Vec<EntryId> = match target.strip_prefix('#') {
            Some(number) => number
                .parse::<EntryId>()
                .ok()
                .filter(|id| pool.iter().any(|e| e.id == *id))
                .into_iter()
                .collect(),
            None => pool
                .iter()
                .filter(|e| e.unit_code().eq_ignore_ascii_case(target))
                .map(|e| e.id)
                .collect(),
        };

        if ids.is_empty() {
            return Err(ScheduleError::UnknownUnit(target.to_string()));
        }
        Ok(ids)
    }

    /// Toggles selection for unassigned entries named by unit code or `#N`.
    pub fn select<S: AsRef<str>>(&mut self, targets: &[S], selected: bool) -> ScheduleResult<usize> {
        let mut ids = Vec::new();
        for target in targets {
            ids.extend(self.resolve(target.as_ref(), Scope::Unassigned)?);
        }
        let tracker = self.tracker_mut("select units")?;
        for id in &ids {
            tracker.set_selected(*id, selected);
        }
        Ok(ids.len())
    }

    pub fn select_all(&mut self) -> ScheduleResult<usize> {
        Ok(self.tracker_mut("select units")?.select_all())
    }

    pub fn assign_selected(&mut self, inspector: &str) -> ScheduleResult<AssignOutcome> {
        if !self.roster().is_empty() && !is_on_roster(self.roster(), inspector.trim()) {
            warn!(session = %self.id, inspector, "assigning to someone not on the roster");
        }
        self.tracker_mut("assign units")?.assign_selected(inspector)
    }

    /// Stages an inspector change for every assigned entry matching `target`.
    pub fn edit(&mut self, target: &str, inspector: &str) -> ScheduleResult<usize> {
        let ids = self.resolve(target, Scope::Assigned)?;
        let tracker = self.tracker_mut("edit assignments")?;
        for id in &ids {
            tracker.stage_edit(*id, inspector)?;
        }
        Ok(ids.len())
    }

    pub fn pending_edits(&self) -> Vec<PendingEdit> {
        self.tracker()
            .map(|tracker| tracker.pending_edits())
            .unwrap_or_default()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tracker()
            .map(|tracker| tracker.has_unsaved_changes())
            .unwrap_or(false)
    }

    pub fn save_edits(&mut self) -> ScheduleResult<usize> {
        Ok(self.tracker_mut("save edits")?.save_edits())
    }

    pub fn discard_edits(&mut self) -> ScheduleResult<usize> {
        Ok(self.tracker_mut("discard edits")?.discard_edits())
    }

    pub fn metrics(&self) -> ScheduleResult<WorklistMetrics> {
        Ok(metrics::worklist_metrics(self.tracker()?))
    }

    pub fn workload(&self) -> ScheduleResult<Workload> {
        Ok(metrics::workload(self.tracker()?))
    }

    /// Builds the final schedule. Requires every unit assigned and no
    /// unsaved edits; does not change the assignments.
    pub fn export_schedule(&mut self) -> ScheduleResult<Vec<ScheduleRow>> {
        let rows = self.build_exportable()?;
        self.finish_export(&rows);
        Ok(rows)
    }

    fn build_exportable(&self) -> ScheduleResult<Vec<ScheduleRow>> {
        let tracker = self.tracker()?;
        tracker.ensure_exportable()?;
        Ok(export::build_schedule(self.date, tracker.assigned(), &self.reservations))
    }

    fn finish_export(&mut self, rows: &[ScheduleRow]) {
        if let Some(locked) = self.locked.as_mut() {
            locked.tracker.mark_exported();
        }
        info!(session = %self.id, rows = rows.len(), "schedule exported");
    }

    /// Writes the schedule to `path`. A failed write leaves the run exportable.
    pub fn export_to_path(&mut self, path: &Path) -> ScheduleResult<usize> {
        let rows = self.build_exportable()?;
        export::write_schedule_to_path(&rows, path)?;
        self.finish_export(&rows);
        Ok(rows.len())
    }
}
