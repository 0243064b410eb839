// 🧾 Report output - aligned text tables, JSON or CSV for any aggregate

use crate::error::{Result, TerritoryError};
use crate::queries::{
    MicroAreaStreet, MicroAreaTeamCount, StreetScreening, StreetTotal, TableDump, TeamSummary,
};
use crate::territory::{AgeBandCount, AgeSexAggregate, StreetCount};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}' (expected table, json or csv)", other)),
        }
    }
}

/// Rows that can be laid out as a text table
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

impl Tabular for StreetCount {
    fn headers() -> &'static [&'static str] {
        &["RUA", "CONTAGEM"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.street.clone(), self.count.to_string()]
    }
}

impl Tabular for AgeSexAggregate {
    fn headers() -> &'static [&'static str] {
        &["RUA", "SEXO", "MEDIA_IDADE", "MORADORES"]
    }
    fn cells(&self) -> Vec<String> {
        vec![
            self.street.clone(),
            self.sex.to_string(),
            format!("{:.2}", self.mean_age),
            self.residents.to_string(),
        ]
    }
}

impl Tabular for AgeBandCount {
    fn headers() -> &'static [&'static str] {
        &["FAIXA_ETARIA", "CONTAGEM"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.band.label().to_string(), self.count.to_string()]
    }
}

impl Tabular for StreetTotal {
    fn headers() -> &'static [&'static str] {
        &["RUA", "TOTAL_USUARIOS"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.street.clone(), self.total_residents.to_string()]
    }
}

impl Tabular for StreetScreening {
    fn headers() -> &'static [&'static str] {
        &["RUA", "TOTAL_PREVENTIVO", "TOTAL_MAMOGRAFIA"]
    }
    fn cells(&self) -> Vec<String> {
        vec![
            self.street.clone(),
            self.total_preventivo.to_string(),
            self.total_mamografia.to_string(),
        ]
    }
}

impl Tabular for MicroAreaStreet {
    fn headers() -> &'static [&'static str] {
        &["MICRO", "RUA", "TOTAL_USUARIOS"]
    }
    fn cells(&self) -> Vec<String> {
        vec![
            self.micro_area.clone(),
            self.street.clone(),
            self.total_residents.to_string(),
        ]
    }
}

impl Tabular for TeamSummary {
    fn headers() -> &'static [&'static str] {
        &["EQUIPE", "TOTAL_USUARIOS", "TOTAL_PREVENTIVO", "TOTAL_MAMOGRAFIA"]
    }
    fn cells(&self) -> Vec<String> {
        vec![
            self.team.clone(),
            self.total_residents.to_string(),
            self.total_preventivo.to_string(),
            self.total_mamografia.to_string(),
        ]
    }
}

impl Tabular for MicroAreaTeamCount {
    fn headers() -> &'static [&'static str] {
        &["MICRO", "EQUIPE", "TOTAL"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.micro_area.clone(), self.team.clone(), self.total.to_string()]
    }
}

/// Render typed rows in the requested format
pub fn render<T: Tabular + Serialize>(rows: &[T], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let cells: Vec<Vec<String>> = rows.iter().map(|row| row.cells()).collect();
            Ok(text_table(T::headers(), &cells))
        }
        OutputFormat::Json => to_json(rows),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            // Header from the first serialized row; write it by hand when there are none
            if rows.is_empty() {
                wtr.write_record(T::headers())?;
            }
            for row in rows {
                wtr.serialize(row)?;
            }
            csv_into_string(wtr)
        }
    }
}

/// Render a raw table dump in the requested format
pub fn render_dump(dump: &TableDump, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let headers: Vec<&str> = dump.columns.iter().map(String::as_str).collect();
            let cells: Vec<Vec<String>> = dump
                .rows
                .iter()
                .map(|row| row.iter().map(plain_cell).collect())
                .collect();
            Ok(text_table(&headers, &cells))
        }
        OutputFormat::Json => {
            let objects: Vec<serde_json::Map<String, serde_json::Value>> = dump
                .rows
                .iter()
                .map(|row| dump.columns.iter().cloned().zip(row.iter().cloned()).collect())
                .collect();
            to_json(&objects)
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            wtr.write_record(&dump.columns)?;
            for row in &dump.rows {
                wtr.write_record(row.iter().map(plain_cell))?;
            }
            csv_into_string(wtr)
        }
    }
}

/// Write typed rows to a CSV file (header included, even when empty)
pub fn write_csv_file<T: Tabular + Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let content = render(rows, OutputFormat::Csv)?;
    std::fs::write(path, content).map_err(|source| TerritoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn csv_into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| TerritoryError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn plain_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Left-aligned text columns separated by two spaces, with a rule under the header
fn text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_line(&mut out, &header_cells, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in rows {
        push_line(&mut out, row, &widths);
    }
    let _ = write!(out, "({} rows)", rows.len());
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
