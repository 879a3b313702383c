use thiserror::Error;

/// Errors raised while building or editing a turn schedule.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A row of an input table could not be read (bad number, bad date, ...).
    /// `row` is the source line, header included.
    #[error("malformed input in {source_name} (line {row}): {message}")]
    MalformedInput {
        source_name: String,
        row: usize,
        message: String,
    },

    #[error("malformed input in {source_name}: required column `{column}` is missing")]
    MissingColumn { source_name: String, column: String },

    #[error("no units are selected; select at least one unit before assigning")]
    NoSelection,

    /// Edits to assigned units that have not been saved yet.
    #[error("{pending} unsaved inspector edit(s); save or discard them first")]
    UnsavedChanges { pending: usize },

    #[error("inspector name must not be blank")]
    InvalidInspector,

    #[error("no worklist entry matches `{0}`")]
    UnknownUnit(String),

    #[error("cannot {action} while the schedule is {phase}")]
    InvalidTransition { phase: String, action: String },

    #[error("{remaining} unit(s) still need an inspector")]
    NotComplete { remaining: usize },

    #[error("failed to fetch sheet `{sheet}`: {message}")]
    SheetFetch { sheet: String, message: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScheduleError {
    pub fn malformed(source_name: &str, row: usize, message: impl Into<String>) -> Self {
        ScheduleError::MalformedInput {
            source_name: source_name.to_string(),
            row,
            message: message.into(),
        }
    }

    pub fn missing_column(source_name: &str, column: &str) -> Self {
        ScheduleError::MissingColumn {
            source_name: source_name.to_string(),
            column: column.to_string(),
        }
    }

    /// True for errors that invalidate the whole upload rather than one action.
    pub fn is_fatal_to_upload(&self) -> bool {
        matches!(
            self,
            ScheduleError::MalformedInput { .. } | ScheduleError::MissingColumn { .. }
        )
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_errors_are_fatal_to_upload() {
        assert!(ScheduleError::malformed("export", 3, "bad date").is_fatal_to_upload());
        assert!(ScheduleError::missing_column("export", "Unit_Code").is_fatal_to_upload());
        assert!(!ScheduleError::NoSelection.is_fatal_to_upload());
    }

    #[test]
    fn messages_name_the_column() {
        let err = ScheduleError::missing_column("reservation export", "Departure");
        assert_eq!(
            err.to_string(),
            "malformed input in reservation export: required column `Departure` is missing"
        );
    }
}
