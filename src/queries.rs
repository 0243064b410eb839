// 📊 Territory Queries - fixed aggregate reports over the `territorio` table
//
// Every method opens its own read-only connection, runs one statement and
// drops the connection before returning, on success and on error alike.
// None of the statements take caller input.

use crate::db::TERRITORY_TABLE;
use crate::error::{Result, TerritoryError};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

// ============================================================================
// RESULT ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetTotal {
    #[serde(rename = "RUA")]
    pub street: String,
    #[serde(rename = "TOTAL_USUARIOS")]
    pub total_residents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetScreening {
    #[serde(rename = "RUA")]
    pub street: String,
    #[serde(rename = "TOTAL_PREVENTIVO")]
    pub total_preventivo: i64,
    #[serde(rename = "TOTAL_MAMOGRAFIA")]
    pub total_mamografia: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MicroAreaStreet {
    #[serde(rename = "MICRO")]
    pub micro_area: String,
    #[serde(rename = "RUA")]
    pub street: String,
    #[serde(rename = "TOTAL_USUARIOS")]
    pub total_residents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    #[serde(rename = "EQUIPE")]
    pub team: String,
    #[serde(rename = "TOTAL_USUARIOS")]
    pub total_residents: i64,
    #[serde(rename = "TOTAL_PREVENTIVO")]
    pub total_preventivo: i64,
    #[serde(rename = "TOTAL_MAMOGRAFIA")]
    pub total_mamografia: i64,
}

/// Children (0-4) or elderly (60+) per micro-area and team
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MicroAreaTeamCount {
    #[serde(rename = "MICRO")]
    pub micro_area: String,
    #[serde(rename = "EQUIPE")]
    pub team: String,
    #[serde(rename = "TOTAL")]
    pub total: i64,
}

/// Unfiltered table contents, columns in store order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDump {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

// ============================================================================
// STATEMENTS
// ============================================================================

const RESIDENTS_PER_STREET: &str = "
    SELECT RUA, COUNT(*) AS TOTAL_USUARIOS
    FROM territorio
    GROUP BY RUA
    ORDER BY TOTAL_USUARIOS DESC";

const SCREENING_PER_STREET: &str = "
    SELECT RUA, SUM(PREVENTIVO) AS TOTAL_PREVENTIVO, SUM(MAMOGRAFIA) AS TOTAL_MAMOGRAFIA
    FROM territorio
    GROUP BY RUA
    ORDER BY TOTAL_PREVENTIVO DESC, TOTAL_MAMOGRAFIA DESC";

const RESIDENTS_PER_MICRO_AREA: &str = "
    SELECT MICRO, RUA, COUNT(*) AS TOTAL_USUARIOS
    FROM territorio
    GROUP BY MICRO, RUA
    ORDER BY MICRO, TOTAL_USUARIOS DESC";

const TEAM_COMPARISON: &str = "
    SELECT EQUIPE, SUM(CONTAGEM) AS TOTAL_USUARIOS,
           SUM(PREVENTIVO) AS TOTAL_PREVENTIVO, SUM(MAMOGRAFIA) AS TOTAL_MAMOGRAFIA
    FROM territorio
    GROUP BY EQUIPE
    ORDER BY TOTAL_USUARIOS DESC";

const CHILDREN_PER_MICRO_AREA: &str = "
    SELECT MICRO, EQUIPE, SUM(DOIS_M + DOIS_F) AS TOTAL_CRIANCAS
    FROM territorio
    GROUP BY MICRO, EQUIPE
    ORDER BY TOTAL_CRIANCAS DESC";

const ELDERLY_PER_MICRO_AREA: &str = "
    SELECT MICRO, EQUIPE, SUM(IDOSOS_M + IDOSOS_F) AS TOTAL_IDOSOS
    FROM territorio
    GROUP BY MICRO, EQUIPE
    ORDER BY TOTAL_IDOSOS DESC";

const FULL_DUMP: &str = "SELECT * FROM territorio";

// ============================================================================
// QUERY LAYER
// ============================================================================

pub struct TerritoryQueries {
    db_path: PathBuf,
}

impl TerritoryQueries {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        info!(db = %db_path.display(), "territory queries initialized");
        TerritoryQueries { db_path }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a read-only connection; the store is never created or written here
    fn connect(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| {
            error!(db = %self.db_path.display(), error = %source, "failed to connect to territory store");
            TerritoryError::StoreAccess {
                context: format!("open {}", self.db_path.display()),
                source,
            }
        })
    }

    /// Run one fixed statement and map every row.
    ///
    /// The connection lives only for the duration of this call.
    fn run<T, F>(&self, name: &'static str, sql: &str, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connect()?;

        let rows = conn
            .prepare(sql)
            .and_then(|mut stmt| {
                let rows = stmt.query_map([], map)?.collect::<rusqlite::Result<Vec<T>>>()?;
                Ok(rows)
            })
            .map_err(|source| self.query_error(name, source))?;

        debug!(query = name, rows = rows.len(), "query completed");
        Ok(rows)
    }

    fn query_error(&self, name: &'static str, source: rusqlite::Error) -> TerritoryError {
        error!(query = name, db = %self.db_path.display(), error = %source, "territory query failed");
        TerritoryError::StoreAccess {
            context: format!("query {} on {}", name, TERRITORY_TABLE),
            source,
        }
    }

    /// Residents per street, most populated first
    pub fn residents_per_street(&self) -> Result<Vec<StreetTotal>> {
        self.run("residents_per_street", RESIDENTS_PER_STREET, |row| {
            Ok(StreetTotal {
                street: text_at(row, 0)?,
                total_residents: count_at(row, 1)?,
            })
        })
    }

    /// Women eligible for cervical screening and mammography per street
    pub fn screening_per_street(&self) -> Result<Vec<StreetScreening>> {
        self.run("screening_per_street", SCREENING_PER_STREET, |row| {
            Ok(StreetScreening {
                street: text_at(row, 0)?,
                total_preventivo: count_at(row, 1)?,
                total_mamografia: count_at(row, 2)?,
            })
        })
    }

    /// Residents per (micro-area, street), micro-areas in order
    pub fn residents_per_micro_area(&self) -> Result<Vec<MicroAreaStreet>> {
        self.run("residents_per_micro_area", RESIDENTS_PER_MICRO_AREA, |row| {
            Ok(MicroAreaStreet {
                micro_area: text_at(row, 0)?,
                street: text_at(row, 1)?,
                total_residents: count_at(row, 2)?,
            })
        })
    }

    /// Resident and screening totals per team, largest team first
    pub fn team_comparison(&self) -> Result<Vec<TeamSummary>> {
        self.run("team_comparison", TEAM_COMPARISON, |row| {
            Ok(TeamSummary {
                team: text_at(row, 0)?,
                total_residents: count_at(row, 1)?,
                total_preventivo: count_at(row, 2)?,
                total_mamografia: count_at(row, 3)?,
            })
        })
    }

    /// Children aged 0-4 per (micro-area, team)
    pub fn children_per_micro_area(&self) -> Result<Vec<MicroAreaTeamCount>> {
        self.run("children_per_micro_area", CHILDREN_PER_MICRO_AREA, micro_area_team_count)
    }

    /// Residents aged 60+ per (micro-area, team)
    pub fn elderly_per_micro_area(&self) -> Result<Vec<MicroAreaTeamCount>> {
        self.run("elderly_per_micro_area", ELDERLY_PER_MICRO_AREA, micro_area_team_count)
    }

    /// Every row and column of the table
    pub fn full_dump(&self) -> Result<TableDump> {
        let conn = self.connect()?;

        let dump = conn
            .prepare(FULL_DUMP)
            .and_then(|mut stmt| {
                let columns: Vec<String> =
                    stmt.column_names().into_iter().map(String::from).collect();
                let width = columns.len();
                let rows = stmt
                    .query_map([], |row| {
                        (0..width)
                            .map(|idx| row.get_ref(idx).map(json_value))
                            .collect::<rusqlite::Result<Vec<_>>>()
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(TableDump { columns, rows })
            })
            .map_err(|source| self.query_error("full_dump", source))?;

        debug!(query = "full_dump", rows = dump.rows.len(), "query completed");
        Ok(dump)
    }
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn micro_area_team_count(row: &Row<'_>) -> rusqlite::Result<MicroAreaTeamCount> {
    Ok(MicroAreaTeamCount {
        micro_area: text_at(row, 0)?,
        team: text_at(row, 1)?,
        total: count_at(row, 2)?,
    })
}

/// Identifier column as text, whatever storage class the store used
fn text_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    })
}

/// Counter or sum column; NULL sums count as zero.
///
/// A REAL is accepted only when it holds a whole number; a fractional count
/// fails instead of being rounded.
fn count_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(0),
        ValueRef::Integer(i) => Ok(i),
        ValueRef::Real(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            format!("column {}", idx),
            other.data_type(),
        )),
    }
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::json!(i),
        ValueRef::Real(f) => serde_json::json!(f),
        ValueRef::Text(bytes) => serde_json::json!(String::from_utf8_lossy(bytes)),
        ValueRef::Blob(bytes) => serde_json::json!(bytes),
    }
}
