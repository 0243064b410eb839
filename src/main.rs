// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;
mod cli;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use cli::{Args, Command, ReportKind};
use rusqlite::Connection;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use tracing::{error, info};

// Use library instead of local modules
use territorio_ubs::config::DEFAULT_CONFIG_FILE;
use territorio_ubs::report::{self, write_csv_file};
use territorio_ubs::{
    fake_data, insert_rows, load_csv, logging, setup_database, verify_count, AgeBandCount,
    AgeSexAggregate, Config, OutputFormat, ResidentTable, StreetCount, TerritoryManager,
    TerritoryQueries,
};

fn main() -> Result<()> {
    let args = Args::parse();

    // No logging needed to write the default config
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    let mut config = Config::resolve(args.config.as_deref())?;
    config.merge_overrides(args.db.as_deref(), args.log_dir.as_deref(), args.verbose);

    // The TUI owns the terminal; keep console logs off it
    #[cfg(feature = "tui")]
    if let Command::Ui { .. } = args.command {
        config.logging.console_level = "off".to_string();
    }

    let log_path = logging::init(&config.logging, "territorio")?;
    info!(version = territorio_ubs::VERSION, log_file = %log_path.display(), "territorio started");

    let result = match args.command {
        Command::Analyze { csv, focus_street, format, export_dir } => {
            let focus = focus_street.unwrap_or_else(|| config.territory.focus_street.clone());
            let format = resolve_format(format, &config)?;
            run_analyze(&csv, &focus, format, export_dir.as_deref())
        }
        Command::Query { report, format } => {
            let format = resolve_format(format, &config)?;
            run_query(&config.database.path, report, format)
        }
        Command::Import { csv } => run_import(&csv, &config.database.path),
        Command::Generate { rows, seed, output } => run_generate(rows, seed, &output),
        Command::InitConfig => handle_init_config(),
        #[cfg(feature = "tui")]
        Command::Ui { csv, focus_street } => {
            let focus = focus_street.unwrap_or_else(|| config.territory.focus_street.clone());
            run_ui_mode(&csv, &focus)
        }
    };

    if let Err(e) = &result {
        error!("command failed: {:#}", e);
    }

    result
}

fn resolve_format(flag: Option<OutputFormat>, config: &Config) -> Result<OutputFormat> {
    match flag {
        Some(format) => Ok(format),
        None => config
            .report
            .format
            .parse::<OutputFormat>()
            .map_err(anyhow::Error::msg)
            .context("Invalid [report] format in config"),
    }
}

/// Write a default territorio.toml
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

// ============================================================================
// ANALYZE
// ============================================================================

/// Everything `analyze` computes, for the JSON output
#[derive(Serialize)]
struct AnalysisReport<'a> {
    generated_at: DateTime<Utc>,
    source: String,
    rows: usize,
    street_counts: &'a [StreetCount],
    focus_street: FocusStreet<'a>,
    mean_age_per_street_sex: &'a [AgeSexAggregate],
    age_bands: &'a [AgeBandCount],
}

#[derive(Serialize)]
struct FocusStreet<'a> {
    street: &'a str,
    residents: usize,
    house_numbers: Vec<&'a str>,
}

fn run_analyze(csv_path: &Path, focus: &str, format: OutputFormat, export_dir: Option<&Path>) -> Result<()> {
    let table = ResidentTable::from_path(csv_path)
        .with_context(|| format!("Failed to load resident table {}", csv_path.display()))?;

    let mut manager = TerritoryManager::new(&table)
        .with_context(|| format!("Cannot analyze {}", csv_path.display()))?
        .with_focus_street(focus);

    let street_counts = manager.compute_street_counts().to_vec();
    let mean_age = manager.compute_mean_age_per_street_sex().to_vec();
    let age_bands = manager.age_band_counts();
    let subset = manager.filter_street(focus);

    if let Some(dir) = export_dir {
        export_aggregates(dir, &manager, &street_counts, &mean_age, &age_bands)?;
    }

    match format {
        OutputFormat::Json => {
            let report = AnalysisReport {
                generated_at: Utc::now(),
                source: csv_path.display().to_string(),
                rows: manager.row_count(),
                street_counts: &street_counts,
                focus_street: FocusStreet {
                    street: focus,
                    residents: subset.len(),
                    house_numbers: subset.house_numbers(),
                },
                mean_age_per_street_sex: &mean_age,
                age_bands: &age_bands,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table | OutputFormat::Csv => {
            println!("📂 {}: {} residents\n", csv_path.display(), manager.row_count());

            println!("📍 Residents per street");
            println!("{}\n", report::render(&street_counts, format)?);

            println!("🔎 {}: {} residents", focus, subset.len());
            if !subset.is_empty() {
                println!("   Numbers: {}", subset.house_numbers().join(", "));
            }
            println!();

            println!("👥 Mean age per street/sex");
            println!("{}\n", report::render(&mean_age, format)?);

            println!("🧒👴 Age bands");
            println!("{}", report::render(&age_bands, format)?);
        }
    }

    Ok(())
}

fn export_aggregates(
    dir: &Path,
    manager: &TerritoryManager<'_>,
    street_counts: &[StreetCount],
    mean_age: &[AgeSexAggregate],
    age_bands: &[AgeBandCount],
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    write_csv_file(&dir.join("ruas.csv"), street_counts)?;
    write_csv_file(&dir.join("media_idade_rua_sexo.csv"), mean_age)?;
    write_csv_file(&dir.join("faixas_etarias.csv"), age_bands)?;

    let categorized_path = dir.join("moradores_faixa_etaria.csv");
    let mut wtr = csv::Writer::from_path(&categorized_path)
        .with_context(|| format!("Failed to create {}", categorized_path.display()))?;
    for resident in manager.categorize_age_bands() {
        wtr.serialize(resident.to_row())?;
    }
    wtr.flush()?;

    info!(dir = %dir.display(), "aggregates exported");
    println!("💾 Aggregates written to {}\n", dir.display());
    Ok(())
}

// ============================================================================
// QUERY
// ============================================================================

fn run_query(db_path: &Path, kind: ReportKind, format: OutputFormat) -> Result<()> {
    let queries = TerritoryQueries::new(db_path);

    let output = match kind {
        ReportKind::Streets => report::render(&queries.residents_per_street()?, format)?,
        ReportKind::Screening => report::render(&queries.screening_per_street()?, format)?,
        ReportKind::MicroAreas => report::render(&queries.residents_per_micro_area()?, format)?,
        ReportKind::Teams => report::render(&queries.team_comparison()?, format)?,
        ReportKind::Children => report::render(&queries.children_per_micro_area()?, format)?,
        ReportKind::Elderly => report::render(&queries.elderly_per_micro_area()?, format)?,
        ReportKind::All => report::render_dump(&queries.full_dump()?, format)?,
    };

    println!("{}", output);
    Ok(())
}

// ============================================================================
// IMPORT
// ============================================================================

fn run_import(csv_path: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  Import: CSV → SQLite ({})", db_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let rows = load_csv(csv_path)?;
    println!("✓ Loaded {} rows from {}", rows.len(), csv_path.display());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let mut conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Table territorio ready");

    // 3. Insert rows
    println!("\n💾 Inserting rows...");
    let inserted = insert_rows(&mut conn, &rows)?;
    println!("✓ Inserted: {} rows", inserted);

    // 4. Verify count
    let count = verify_count(&conn)?;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Store contains {} rows", count);

    Ok(())
}

// ============================================================================
// GENERATE
// ============================================================================

fn run_generate(rows: usize, seed: Option<u64>, output: &Path) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let table = fake_data::generate_seeded(seed, rows, &fake_data::default_streets());

    let file = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    table.write_csv(file)?;

    info!(rows, seed, output = %output.display(), "fake resident csv generated");
    println!("✅ {} rows written to {} (seed {})", table.len(), output.display(), seed);
    Ok(())
}

// ============================================================================
// UI
// ============================================================================

#[cfg(feature = "tui")]
fn run_ui_mode(csv_path: &Path, focus: &str) -> Result<()> {
    let table = ResidentTable::from_path(csv_path)
        .with_context(|| format!("Failed to load resident table {}", csv_path.display()))?;

    let mut manager = TerritoryManager::new(&table)
        .with_context(|| format!("Cannot analyze {}", csv_path.display()))?
        .with_focus_street(focus);
    manager.compute_street_counts();
    manager.compute_mean_age_per_street_sex();

    let mut app = ui::App::new(&manager, csv_path.display().to_string())?;
    ui::run_ui(&mut app)?;

    Ok(())
}
