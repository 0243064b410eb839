// Territorio UBS - Core Library
// Exposes all modules for use in the CLI, the TUI viewer and tests

pub mod error;
pub mod resident;
pub mod age_band;
pub mod territory;
pub mod db;
pub mod queries;
pub mod report;
pub mod config;
pub mod logging;
pub mod fake_data;
#[cfg(feature = "tui")]
pub mod charts;

// Re-export commonly used types
pub use error::{Result, TerritoryError};
pub use resident::{ResidentRecord, ResidentTable, Sex, REQUIRED_COLUMNS};
pub use age_band::AgeBand;
pub use territory::{
    AgeBandCount, AgeSexAggregate, CategorizedResident, StreetCount, StreetSubset,
    TerritoryManager,
};
pub use db::{
    TerritoryRow, TERRITORY_TABLE,
    load_csv, setup_database, insert_rows, verify_count,
};
pub use queries::{
    TerritoryQueries, StreetTotal, StreetScreening, MicroAreaStreet, TeamSummary,
    MicroAreaTeamCount, TableDump,
};
pub use report::{OutputFormat, Tabular};
pub use config::Config;
#[cfg(feature = "tui")]
pub use charts::ScatterPlot;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
