pub mod db;
pub mod enrich;
pub mod error;
pub mod export;
pub mod join;
pub mod loader;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod models;
pub mod roster;
pub mod session;
pub mod sheets;
pub mod shell;
pub mod table;
pub mod tracker;

pub use error::{ScheduleError, ScheduleResult};
pub use session::SessionContext;
