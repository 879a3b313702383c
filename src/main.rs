use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use turn_schedule::db::{self, PgSheetSource};
use turn_schedule::sheets::{CsvDirSource, SheetIds, TableSource};
use turn_schedule::shell::{self, Shell};
use turn_schedule::{logging, SessionContext};

#[derive(Parser)]
#[command(name = "turn-schedule")]
#[command(about = "Build day-of turn schedules and balance them across inspectors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SheetArgs {
    /// Read reference sheets from `<dir>/<sheet>.csv` instead of Postgres
    #[arg(long, env = "TURN_SHEETS_DIR")]
    sheets_dir: Option<PathBuf>,
    #[arg(long, env = "TURN_SHEET_UNITS", default_value = "unit-order")]
    units_sheet: String,
    #[arg(long, env = "TURN_SHEET_AREAS", default_value = "area-order")]
    areas_sheet: String,
    #[arg(long, env = "TURN_SHEET_LIAISONS", default_value = "liaisons")]
    liaisons_sheet: String,
    #[arg(long, env = "TURN_SHEET_INSPECTORS", default_value = "inspectors")]
    inspectors_sheet: String,
}

impl SheetArgs {
    fn ids(&self) -> SheetIds {
        SheetIds {
            units: self.units_sheet.clone(),
            areas: self.areas_sheet.clone(),
            liaisons: self.liaisons_sheet.clone(),
            inspectors: self.inspectors_sheet.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the sheet store schema
    InitDb,
    /// Load demo reference sheets
    Seed {
        #[command(flatten)]
        sheets: SheetArgs,
    },
    /// Replace one reference sheet with the contents of a CSV file
    ImportSheet {
        #[arg(long)]
        sheet: String,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the back-to-back worklist for a date
    Turns {
        #[arg(long)]
        export: PathBuf,
        /// Defaults to the upcoming Saturday
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        sheets: SheetArgs,
    },
    /// Assign the day's turns to inspectors interactively
    Session {
        #[arg(long)]
        export: PathBuf,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        sheets: SheetArgs,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to reach the sheet store")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn open_source(args: &SheetArgs) -> anyhow::Result<Arc<dyn TableSource>> {
    match &args.sheets_dir {
        Some(dir) => Ok(Arc::new(CsvDirSource::new(dir))),
        None => Ok(Arc::new(PgSheetSource::new(connect().await?))),
    }
}

async fn open_session(
    export: &Path,
    date: Option<NaiveDate>,
    sheets: &SheetArgs,
) -> anyhow::Result<SessionContext> {
    let source = open_source(sheets).await?;
    let mut session = SessionContext::new(source, sheets.ids(), Local::now().date_naive());
    session
        .load_export_path(export)
        .with_context(|| format!("could not load {}", export.display()))?;
    if let Some(date) = date {
        session.set_date(date)?;
    }
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { sheets } => {
            let pool = connect().await?;
            db::seed(&pool, &sheets.ids()).await?;
            println!("Seed sheets stored.");
        }
        Commands::ImportSheet { sheet, csv, title } => {
            let pool = connect().await?;
            let rows = db::import_sheet(&pool, &sheet, title.as_deref(), &csv).await?;
            println!("Stored {rows} rows in sheet {sheet} from {}.", csv.display());
        }
        Commands::Turns {
            export,
            date,
            sheets,
        } => {
            let mut session = open_session(&export, date, &sheets).await?;
            session.lock_in().await?;

            let mut out = std::io::stdout().lock();
            let tracker = session.tracker()?;
            if tracker.to_be_assigned().is_empty() {
                writeln!(out, "No back-to-back turns on {}.", session.date())?;
                return Ok(());
            }
            writeln!(out, "Turns for {}:", session.date())?;
            shell::write_metrics(&mut out, &session.metrics()?)?;
            shell::write_worklist(&mut out, tracker.to_be_assigned())?;
        }
        Commands::Session {
            export,
            date,
            sheets,
        } => {
            let session = open_session(&export, date, &sheets).await?;
            println!(
                "Loaded {} reservations; scheduling for {}. Type `help` for commands.",
                session.reservations().len(),
                session.date()
            );
            let mut shell = Shell::new(session);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            shell.run(stdin, &mut std::io::stdout()).await?;
        }
    }

    Ok(())
}
