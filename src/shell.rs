//! Line-oriented front end for one scheduling session.

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{ScheduleError, ScheduleResult};
use crate::export::default_file_name;
use crate::metrics::{Workload, WorklistMetrics};
use crate::models::{RosterEntry, WorklistEntry};
use crate::session::SessionContext;
use crate::tracker::Phase;

#[derive(Parser, Debug)]
#[command(multicall = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    /// Load a new reservation export and start over
    Load { path: PathBuf },
    /// Set the scheduling date (YYYY-MM-DD)
    Date { date: NaiveDate },
    /// Fix the date and build the worklist
    Lock,
    /// Show unassigned and assigned units
    List,
    /// Select units by code or #row
    Select {
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Clear selection on units by code or #row
    Deselect {
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Select every unassigned unit
    SelectAll,
    /// Assign the selected units to an inspector
    Assign {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Change the inspector of an assigned unit (unsaved until `save`)
    Edit {
        target: String,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Show unsaved edits
    Pending,
    /// Commit unsaved edits
    Save,
    /// Throw away unsaved edits
    Discard,
    /// Show counts and inspector balance
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show inspectors and liaisons
    Roster,
    /// Write the finished schedule
    Export { path: Option<PathBuf> },
    /// Leave the session
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(tokens).map(|parsed| Some(parsed.command))
}

pub fn write_worklist<W: Write>(out: &mut W, entries: &[WorklistEntry]) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>4}  {:<3} {:<10} {:<24} {:<14} {:>4} {:>6} {:<8} {:<16}",
        "#", "sel", "unit", "name", "area", "pos", "sleeps", "incoming", "inspector"
    )?;
    for entry in entries {
        writeln!(
            out,
            "{:>4}  {:<3} {:<10} {:<24} {:<14} {:>4} {:>6} {:<8} {:<16}",
            format!("#{}", entry.id),
            if entry.selected { "[x]" } else { "[ ]" },
            entry.unit_code(),
            truncate(&entry.turn.friendly_name, 24),
            truncate(entry.area.as_deref().unwrap_or("-"), 14),
            entry.position.map_or_else(|| "-".to_string(), |p| p.to_string()),
            entry.turn.sleeps.map_or_else(|| "-".to_string(), |s| s.to_string()),
            truncate(&entry.turn.incoming_type, 8),
            entry.inspector.as_deref().unwrap_or(""),
        )?;
    }
    Ok(())
}

pub fn write_metrics<W: Write>(out: &mut W, metrics: &WorklistMetrics) -> std::io::Result<()> {
    writeln!(
        out,
        "B2Bs: {}   Owners: {}   Areas: {}",
        metrics.b2bs, metrics.owners, metrics.areas
    )
}

pub fn write_workload<W: Write>(out: &mut W, workload: &Workload) -> std::io::Result<()> {
    if workload.inspectors.is_empty() {
        return writeln!(out, "No units assigned yet.");
    }
    writeln!(out, "Assignments per inspector (mean {:.1}):", workload.mean)?;
    for load in &workload.inspectors {
        writeln!(
            out,
            "  {:<20} {:>3} ({:+.1})",
            load.inspector, load.assigned, load.deviation
        )?;
    }
    Ok(())
}

fn write_roster<W: Write>(out: &mut W, roster: &[RosterEntry]) -> std::io::Result<()> {
    if roster.is_empty() {
        return writeln!(out, "Roster is empty (lock the schedule to load it).");
    }
    for entry in roster {
        writeln!(out, "  {:<20} {}", entry.name, entry.role)?;
    }
    Ok(())
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

#[derive(Serialize)]
struct StatusReport {
    phase: Phase,
    date: NaiveDate,
    to_be_assigned: usize,
    assigned: usize,
    unsaved_edits: usize,
    metrics: WorklistMetrics,
    workload: Workload,
}

pub struct Shell {
    session: SessionContext,
    quit_warned: bool,
}

impl Shell {
    pub fn new(session: SessionContext) -> Self {
        Shell {
            session,
            quit_warned: false,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        write!(out, "[{}] > ", self.session.phase())?;
        out.flush()?;

        while let Some(line) = lines.next_line().await? {
            let flow = match parse_line(&line) {
                Ok(None) => Flow::Continue,
                Ok(Some(command)) => match self.execute(command, out).await {
                    Ok(flow) => flow,
                    Err(err) => {
                        writeln!(out, "error: {err}")?;
                        if err.is_fatal_to_upload() {
                            writeln!(out, "The export was rejected; fix the file and `load` it again.")?;
                        }
                        Flow::Continue
                    }
                },
                Err(err) => {
                    write!(out, "{err}")?;
                    Flow::Continue
                }
            };
            if flow == Flow::Quit {
                return Ok(());
            }
            write!(out, "[{}] > ", self.session.phase())?;
            out.flush()?;
        }
        Ok(())
    }

    pub async fn execute<W: Write>(
        &mut self,
        command: ShellCommand,
        out: &mut W,
    ) -> ScheduleResult<Flow> {
        if command != ShellCommand::Quit {
            self.quit_warned = false;
        }

        match command {
            ShellCommand::Load { path } => {
                let rows = self.session.load_export_path(&path)?;
                writeln!(out, "Loaded {rows} reservations from {}.", path.display())?;
            }
            ShellCommand::Date { date } => {
                self.session.set_date(date)?;
                writeln!(out, "Scheduling for {date}.")?;
            }
            ShellCommand::Lock => {
                let remaining = self.session.lock_in().await?.to_be_assigned().len();
                writeln!(
                    out,
                    "Locked {} with {remaining} unit(s) to assign.",
                    self.session.date()
                )?;
                write_metrics(out, &self.session.metrics()?)?;
            }
            ShellCommand::List => {
                let tracker = self.session.tracker()?;
                writeln!(out, "To be assigned ({}):", tracker.to_be_assigned().len())?;
                write_worklist(out, tracker.to_be_assigned())?;
                writeln!(out, "Assigned ({}):", tracker.assigned().len())?;
                write_worklist(out, &tracker.edited_view())?;
            }
            ShellCommand::Select { targets } => {
                let count = self.session.select(&targets, true)?;
                writeln!(out, "Selected {count} unit(s).")?;
            }
            ShellCommand::Deselect { targets } => {
                let count = self.session.select(&targets, false)?;
                writeln!(out, "Deselected {count} unit(s).")?;
            }
            ShellCommand::SelectAll => {
                let count = self.session.select_all()?;
                writeln!(out, "Selected {count} unit(s).")?;
            }
            ShellCommand::Assign { name } => {
                let inspector = name.join(" ");
                let outcome = self.session.assign_selected(&inspector)?;
                if outcome.discarded_edits > 0 {
                    writeln!(
                        out,
                        "warning: {} unsaved edit(s) were discarded.",
                        outcome.discarded_edits
                    )?;
                }
                writeln!(out, "Assigned {} unit(s) to {inspector}.", outcome.moved.len())?;
                if self.session.phase() == Phase::Complete {
                    writeln!(out, "Every unit has an inspector; `export` is available.")?;
                }
            }
            ShellCommand::Edit { target, name } => {
                let count = self.session.edit(&target, &name.join(" "))?;
                writeln!(out, "Staged {count} edit(s); `save` to keep them.")?;
            }
            ShellCommand::Pending => {
                let pending = self.session.pending_edits();
                if pending.is_empty() {
                    writeln!(out, "No unsaved edits.")?;
                }
                for edit in pending {
                    writeln!(
                        out,
                        "  #{} {}: {} -> {}",
                        edit.id, edit.unit_code, edit.committed, edit.proposed
                    )?;
                }
            }
            ShellCommand::Save => {
                let applied = self.session.save_edits()?;
                writeln!(out, "Saved {applied} edit(s).")?;
            }
            ShellCommand::Discard => {
                let dropped = self.session.discard_edits()?;
                writeln!(out, "Discarded {dropped} edit(s).")?;
            }
            ShellCommand::Status { json } => self.write_status(out, json)?,
            ShellCommand::Roster => write_roster(out, self.session.roster())?,
            ShellCommand::Export { path } => {
                let path = path.unwrap_or_else(|| default_file_name(self.session.date()));
                let rows = self.session.export_to_path(&path)?;
                writeln!(out, "Wrote {rows} row(s) to {}.", path.display())?;
            }
            ShellCommand::Quit => {
                if self.session.has_unsaved_changes() && !self.quit_warned {
                    self.quit_warned = true;
                    return Err(ScheduleError::UnsavedChanges {
                        pending: self.session.pending_edits().len(),
                    });
                }
                return Ok(Flow::Quit);
            }
        }

        Ok(Flow::Continue)
    }

    fn write_status<W: Write>(&self, out: &mut W, json: bool) -> ScheduleResult<()> {
        let tracker = self.session.tracker()?;
        let metrics = self.session.metrics()?;
        let workload = self.session.workload()?;

        if json {
            let report = StatusReport {
                phase: self.session.phase(),
                date: self.session.date(),
                to_be_assigned: tracker.to_be_assigned().len(),
                assigned: tracker.assigned().len(),
                unsaved_edits: tracker.pending_edits().len(),
                metrics,
                workload,
            };
            let text = serde_json::to_string_pretty(&report)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
            writeln!(out, "{text}")?;
            return Ok(());
        }

        writeln!(
            out,
            "{} for {}: {} to assign, {} assigned",
            self.session.phase(),
            self.session.date(),
            tracker.to_be_assigned().len(),
            tracker.assigned().len()
        )?;
        write_metrics(out, &metrics)?;
        write_workload(out, &workload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::matcher::tests::{date, reservation};
    use crate::sheets::tests::reference_source;
    use crate::sheets::SheetIds;

    fn shell() -> Shell {
        let mut session =
            SessionContext::new(Arc::new(reference_source()), SheetIds::default(), date(2024, 6, 8));
        let day = date(2024, 6, 8);
        session.load_export(vec![
            reservation("U1", "R1", "Guest", date(2024, 6, 1), day),
            reservation("U1", "R2", "Owner", day, date(2024, 6, 15)),
            reservation("U3", "R4", "Guest", date(2024, 6, 3), day),
            reservation("U3", "R5", "Guest", day, date(2024, 6, 10)),
        ]);
        Shell::new(session)
    }

    #[test]
    fn parses_multiword_inspector_names() {
        let command = parse_line("assign Alice  Moss").unwrap().unwrap();
        assert_eq!(
            command,
            ShellCommand::Assign {
                name: vec!["Alice".to_string(), "Moss".to_string()]
            }
        );
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line("assign").is_err());
        assert!(parse_line("teleport").is_err());
        assert_eq!(
            parse_line("date 2024-06-15").unwrap(),
            Some(ShellCommand::Date {
                date: date(2024, 6, 15)
            })
        );
    }

    #[tokio::test]
    async fn scripted_session_exports_schedule() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let script = format!(
            "lock\nselect U3\nassign Alice Moss\nselect-all\nassign Bruno Diaz\nstatus --json\nexport {}\nquit\n",
            path.display()
        );

        let mut shell = shell();
        let mut out = Vec::new();
        shell.run(script.as_bytes(), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Locked 2024-06-08 with 2 unit(s) to assign."));
        assert!(text.contains("\"phase\": \"Complete\""));
        assert!(text.contains("Wrote 2 row(s)"));
        assert_eq!(shell.session().phase(), Phase::Exported);
        assert!(std::fs::read_to_string(&path).unwrap().contains("Alice Moss,U3"));
    }

    #[tokio::test]
    async fn errors_are_reported_and_session_continues() {
        let mut shell = shell();
        let mut out = Vec::new();
        shell
            .run("assign Alice\nlock\nassign Alice\nlist\n".as_bytes(), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("error: cannot assign units while the schedule is unlocked"));
        assert!(text.contains("error: no units are selected"));
        assert!(text.contains("To be assigned (2):"));
    }

    #[tokio::test]
    async fn quit_warns_once_about_unsaved_edits() {
        let mut shell = shell();
        let mut out = Vec::new();
        shell
            .run(
                "lock\nselect-all\nassign Alice Moss\nedit U1 Bruno Diaz\nquit\n".as_bytes(),
                &mut out,
            )
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("error: 1 unsaved inspector edit(s)"));
        assert!(shell.session().has_unsaved_changes());

        let flow = shell.execute(ShellCommand::Quit, &mut Vec::new()).await.unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
