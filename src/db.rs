use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::{ScheduleError, ScheduleResult};
use crate::sheets::{SheetIds, TableSource};
use crate::table::Table;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SEED_AREAS: &str = "\
Area,Order
North Beach,1
Harbor,2
Old Town,3
Dunes,4
";

const SEED_UNITS: &str = "\
Unit_Code,Address,Area,Order
NB101,101 Gull Way,North Beach,1
NB114,114 Gull Way,North Beach,2
NB203,203 Pelican Dr,North Beach,3
HB12,12 Mooring Ln,Harbor,4
HB30,30 Mooring Ln,Harbor,5
OT7,7 Chapel St,Old Town,6
OT19,19 Chapel St,Old Town,7
DN4,4 Sea Oat Ct,Dunes,8
DN22,22 Sea Oat Ct,Dunes,9
";

const SEED_LIAISONS: &str = "\
Unit_Code,OL,HL
NB101,Mia Tran,Zoe Park
NB114,Mia Tran,Zoe Park
NB203,Mia Tran,Evan Holt
HB12,Grace Kim,Evan Holt
HB30,Grace Kim,Evan Holt
OT7,Grace Kim,Zoe Park
OT19,Mia Tran,
DN4,,Evan Holt
";

const SEED_INSPECTORS: &str = "\
Employee,Role
Alice Moss,Inspector
Bruno Diaz,Inspector
Carmen Ruiz,Inspector
Dev Patel,Lead Inspector
";

pub async fn seed(pool: &PgPool, ids: &SheetIds) -> anyhow::Result<()> {
    let sheets = [
        (&ids.areas, "Area Order", SEED_AREAS),
        (&ids.units, "Unit Order", SEED_UNITS),
        (&ids.liaisons, "Liaisons", SEED_LIAISONS),
        (&ids.inspectors, "Inspectors", SEED_INSPECTORS),
    ];

    for (id, title, data) in sheets {
        let table = Table::from_reader(id.as_str(), data.as_bytes())
            .with_context(|| format!("invalid seed sheet {id}"))?;
        replace_sheet(pool, id, title, &table).await?;
    }

    Ok(())
}

/// Overwrites one sheet's columns and cells in a single transaction.
pub async fn replace_sheet(
    pool: &PgPool,
    sheet_id: &str,
    title: &str,
    table: &Table,
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO turn_schedule.sheets (id, title, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (id) DO UPDATE
        SET title = EXCLUDED.title, updated_at = now()
        "#,
    )
    .bind(sheet_id)
    .bind(title)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM turn_schedule.sheet_cells WHERE sheet_id = $1")
        .bind(sheet_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM turn_schedule.sheet_columns WHERE sheet_id = $1")
        .bind(sheet_id)
        .execute(&mut *tx)
        .await?;

    for (position, column) in table.columns.iter().enumerate() {
        sqlx::query(
            "INSERT INTO turn_schedule.sheet_columns (sheet_id, position, title) VALUES ($1, $2, $3)",
        )
        .bind(sheet_id)
        .bind(position as i32)
        .bind(column)
        .execute(&mut *tx)
        .await?;
    }

    for (row_index, row) in table.rows.iter().enumerate() {
        for (position, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO turn_schedule.sheet_cells (sheet_id, row_index, position, value)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(sheet_id)
            .bind(row_index as i32)
            .bind(position as i32)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    info!(sheet = sheet_id, rows = table.len(), "stored sheet");
    Ok(table.len())
}

pub async fn import_sheet(
    pool: &PgPool,
    sheet_id: &str,
    title: Option<&str>,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let table = Table::from_path(sheet_id, csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    replace_sheet(pool, sheet_id, title.unwrap_or(sheet_id), &table).await
}

/// Rebuilds a table from stored cells; absent cells read as blank.
pub fn assemble_table(
    sheet_id: &str,
    columns: Vec<String>,
    cells: impl IntoIterator<Item = (usize, usize, Option<String>)>,
) -> Table {
    let width = columns.len();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (row_index, position, value) in cells {
        if position >= width {
            continue;
        }
        while rows.len() <= row_index {
            rows.push(vec![String::new(); width]);
        }
        rows[row_index][position] = value.unwrap_or_default();
    }

    // Stored rows are numbered as sheet lines below the header.
    let mut table = Table::new(sheet_id, columns);
    for (row_index, row) in rows.into_iter().enumerate() {
        if row.iter().any(|v| !v.is_empty()) {
            table.push_row(row_index + 2, row);
        }
    }
    table
}

async fn fetch_sheet(pool: &PgPool, sheet_id: &str) -> anyhow::Result<Table> {
    let columns: Vec<String> = sqlx::query(
        "SELECT title FROM turn_schedule.sheet_columns WHERE sheet_id = $1 ORDER BY position",
    )
    .bind(sheet_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| row.get("title"))
    .collect();

    if columns.is_empty() {
        anyhow::bail!("sheet has no columns or does not exist");
    }

    let cells = sqlx::query(
        r#"
        SELECT row_index, position, value
        FROM turn_schedule.sheet_cells
        WHERE sheet_id = $1
        ORDER BY row_index, position
        "#,
    )
    .bind(sheet_id)
    .fetch_all(pool)
    .await?;

    let cells = cells.into_iter().map(|row| {
        let row_index: i32 = row.get("row_index");
        let position: i32 = row.get("position");
        let value: Option<String> = row.get("value");
        (row_index.max(0) as usize, position.max(0) as usize, value)
    });

    Ok(assemble_table(sheet_id, columns, cells))
}

/// Reference sheets stored in Postgres.
pub struct PgSheetSource {
    pool: PgPool,
}

impl PgSheetSource {
    pub fn new(pool: PgPool) -> Self {
        PgSheetSource { pool }
    }
}

#[async_trait]
impl TableSource for PgSheetSource {
    async fn fetch_table(&self, id: &str) -> ScheduleResult<Table> {
        fetch_sheet(&self.pool, id)
            .await
            .map_err(|err| ScheduleError::SheetFetch {
                sheet: id.to_string(),
                message: format!("{err:#}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_fills_gaps_and_drops_blank_rows() {
        let columns = vec!["Area".to_string(), "Order".to_string()];
        let cells = vec![
            (0, 0, Some("North".to_string())),
            (0, 1, Some("1".to_string())),
            (2, 0, Some("South".to_string())),
            (2, 5, Some("stray".to_string())),
        ];
        let table = assemble_table("area-order", columns, cells);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["North", "1"]);
        assert_eq!(table.rows[1], vec!["South", ""]);
        assert_eq!(table.lines, vec![2, 4]);
    }

    #[test]
    fn seed_sheets_load_as_reference_data() {
        let units = Table::from_reader("unit-order", SEED_UNITS.as_bytes()).unwrap();
        let areas = Table::from_reader("area-order", SEED_AREAS.as_bytes()).unwrap();
        let liaisons = Table::from_reader("liaisons", SEED_LIAISONS.as_bytes()).unwrap();
        let inspectors = Table::from_reader("inspectors", SEED_INSPECTORS.as_bytes()).unwrap();

        assert_eq!(crate::loader::load_unit_order(&units).unwrap().len(), 9);
        assert_eq!(crate::loader::load_area_order(&areas).unwrap().len(), 4);
        assert_eq!(crate::loader::load_liaisons(&liaisons).unwrap().len(), 8);
        assert_eq!(crate::loader::load_inspectors(&inspectors).unwrap().len(), 4);
    }
}
