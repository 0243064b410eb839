//! Command-line interface argument parsing.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use territorio_ubs::fake_data::DEFAULT_ROWS;
use territorio_ubs::OutputFormat;

/// Territorio - territory reports for a primary-care unit (UBS)
///
/// Examples:
///   territorio analyze --csv fake.csv --focus-street "RUA B"
///   territorio query teams --format json
///   territorio import --csv territorio.csv --db ubs.db
///   territorio generate --rows 1000 --seed 42
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for territorio.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite file with the `territorio` table
    #[arg(long, global = true, value_name = "FILE", env = "TERRITORIO_DB")]
    pub db: Option<PathBuf>,

    /// Directory for the dated log files
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable debug output on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate a resident CSV (RUA,NUM,IDD,SEXO)
    Analyze {
        /// Resident CSV file
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,

        /// Street to drill into (exact match); defaults to the config value
        #[arg(long, value_name = "STREET")]
        focus_street: Option<String>,

        /// Output format (table, json, csv)
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,

        /// Also write every aggregate as CSV into this directory
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
    },

    /// Run one of the fixed reports against the territory store
    Query {
        #[arg(value_enum)]
        report: ReportKind,

        /// Output format (table, json, csv)
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,
    },

    /// Append rows from a CSV into the territory store
    Import {
        /// CSV with the `territorio` columns
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,
    },

    /// Write a random resident CSV
    Generate {
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,

        /// Seed for a reproducible file
        #[arg(long)]
        seed: Option<u64>,

        #[arg(short, long, default_value = "fake.csv", value_name = "FILE")]
        output: PathBuf,
    },

    /// Write territorio.toml with the default settings
    InitConfig,

    /// Browse the aggregates of a resident CSV in the terminal
    #[cfg(feature = "tui")]
    Ui {
        /// Resident CSV file
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,

        /// Street shown in the scatter page; defaults to the config value
        #[arg(long, value_name = "STREET")]
        focus_street: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Residents per street
    Streets,
    /// Screening-eligible women per street
    Screening,
    /// Residents per micro-area and street
    MicroAreas,
    /// Team comparison
    Teams,
    /// Children 0-4 per micro-area and team
    Children,
    /// Residents 60+ per micro-area and team
    Elderly,
    /// Whole table
    All,
}
