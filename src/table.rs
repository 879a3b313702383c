use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{ScheduleError, ScheduleResult};

/// A loosely typed sheet: named columns over rows of text cells.
///
/// Both the reservation export and the reference sheets arrive in this shape
/// before `loader` turns them into typed records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Source line of each row, with the header on line 1.
    pub lines: Vec<usize>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Table {
            name: name.into(),
            columns,
            rows: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn push_row(&mut self, line: usize, row: Vec<String>) {
        self.rows.push(row);
        self.lines.push(line);
    }

    /// Line a row came from, for error messages.
    pub fn line(&self, idx: usize) -> usize {
        self.lines.get(idx).copied().unwrap_or(idx + 2)
    }

    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> ScheduleResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut table = Table::new(name, columns);

        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(table.rows.len() + 2);
            table.push_row(line, row);
        }

        Ok(table)
    }

    pub fn from_path(name: impl Into<String>, path: &Path) -> ScheduleResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(name, file)
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require(&self, name: &str) -> ScheduleResult<usize> {
        self.column(name)
            .ok_or_else(|| ScheduleError::missing_column(&self.name, name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Non-blank cell value; short rows read as blank.
pub fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_skips_blank_rows() {
        let data = "\u{feff}Unit_Code, Area ,Order\nA1,North,1\n,,\nB2,South,\n";
        let table = Table::from_reader("units", data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["Unit_Code", "Area", "Order"]);
        assert_eq!(table.len(), 2);
        assert_eq!(cell(&table.rows[1], 2), None);
        assert_eq!(cell(&table.rows[1], 1), Some("South"));
        assert_eq!(table.lines, vec![2, 4]);
    }

    #[test]
    fn missing_column_names_the_table() {
        let table = Table::new("areas", vec!["Area".to_string()]);
        match table.require("Order") {
            Err(ScheduleError::MissingColumn {
                source_name,
                column,
            }) => {
                assert_eq!(source_name, "areas");
                assert_eq!(column, "Order");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
