use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ScheduleError, ScheduleResult};
use crate::loader;
use crate::models::{InspectorRow, LiaisonRow, UnitMeta};
use crate::table::Table;

/// Anything that can hand back a reference sheet by its opaque identifier.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn fetch_table(&self, id: &str) -> ScheduleResult<Table>;
}

/// Reads `<dir>/<id>.csv`.
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvDirSource { dir: dir.into() }
    }
}

#[async_trait]
impl TableSource for CsvDirSource {
    async fn fetch_table(&self, id: &str) -> ScheduleResult<Table> {
        let path = self.dir.join(format!("{id}.csv"));
        if !path.exists() {
            return Err(ScheduleError::SheetFetch {
                sheet: id.to_string(),
                message: format!("{} does not exist", path.display()),
            });
        }
        Table::from_path(id, &path)
    }
}

/// Identifiers of the four reference sheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetIds {
    pub units: String,
    pub areas: String,
    pub liaisons: String,
    pub inspectors: String,
}

impl Default for SheetIds {
    fn default() -> Self {
        SheetIds {
            units: "unit-order".to_string(),
            areas: "area-order".to_string(),
            liaisons: "liaisons".to_string(),
            inspectors: "inspectors".to_string(),
        }
    }
}

/// Memoizes fetched sheets for the life of a session.
pub struct SheetCache {
    source: Arc<dyn TableSource>,
    tables: HashMap<String, Arc<Table>>,
}

impl SheetCache {
    pub fn new(source: Arc<dyn TableSource>) -> Self {
        SheetCache {
            source,
            tables: HashMap::new(),
        }
    }

    pub async fn get(&mut self, id: &str) -> ScheduleResult<Arc<Table>> {
        if let Some(table) = self.tables.get(id) {
            debug!(sheet = id, "sheet cache hit");
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(self.source.fetch_table(id).await?);
        info!(sheet = id, rows = table.len(), "fetched reference sheet");
        self.tables.insert(id.to_string(), Arc::clone(&table));
        Ok(table)
    }

    pub fn cached(&self) -> usize {
        self.tables.len()
    }
}

/// Typed reference data needed to lock a schedule.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub units: Vec<UnitMeta>,
    pub liaisons: Vec<LiaisonRow>,
    pub inspectors: Vec<InspectorRow>,
}

impl ReferenceData {
    pub async fn load(cache: &mut SheetCache, ids: &SheetIds) -> ScheduleResult<Self> {
        let units = loader::load_unit_order(&*cache.get(&ids.units).await?)?;
        let areas = loader::load_area_order(&*cache.get(&ids.areas).await?)?;
        let liaisons = loader::load_liaisons(&*cache.get(&ids.liaisons).await?)?;
        let inspectors = loader::load_inspectors(&*cache.get(&ids.inspectors).await?)?;

        Ok(ReferenceData {
            units: crate::enrich::build_unit_meta(&units, &areas),
            liaisons,
            inspectors,
        })
    }
}
