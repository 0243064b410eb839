use crate::error::{Result, TerritoryError};
use crate::resident::deserialize_reason;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Name of the territory table every report reads from
pub const TERRITORY_TABLE: &str = "territorio";

/// One row of the `territorio` table.
///
/// Each row is a household group on a street, with its team, micro-area and
/// the counters the community health agents collect.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TerritoryRow {
    #[serde(rename = "RUA")]
    pub street: String,

    #[serde(rename = "MICRO")]
    pub micro_area: String,

    #[serde(rename = "EQUIPE")]
    pub team: String,

    /// Residents represented by this row
    #[serde(rename = "CONTAGEM")]
    pub residents: i64,

    /// Women eligible for cervical screening
    #[serde(rename = "PREVENTIVO", default)]
    pub preventivo: i64,

    /// Women eligible for mammography
    #[serde(rename = "MAMOGRAFIA", default)]
    pub mamografia: i64,

    /// Children 0-4, male / female
    #[serde(rename = "DOIS_M", default)]
    pub children_m: i64,
    #[serde(rename = "DOIS_F", default)]
    pub children_f: i64,

    /// Residents 60+, male / female
    #[serde(rename = "IDOSOS_M", default)]
    pub elderly_m: i64,
    #[serde(rename = "IDOSOS_F", default)]
    pub elderly_f: i64,
}

fn store_access(context: &'static str) -> impl Fn(rusqlite::Error) -> TerritoryError {
    move |source| TerritoryError::StoreAccess {
        context: context.to_string(),
        source,
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Column names are upper-case tokens; every report query depends on them
    conn.execute(
        "CREATE TABLE IF NOT EXISTS territorio (
            RUA TEXT NOT NULL,
            MICRO TEXT NOT NULL,
            EQUIPE TEXT NOT NULL,
            CONTAGEM INTEGER NOT NULL DEFAULT 0,
            PREVENTIVO INTEGER NOT NULL DEFAULT 0,
            MAMOGRAFIA INTEGER NOT NULL DEFAULT 0,
            DOIS_M INTEGER NOT NULL DEFAULT 0,
            DOIS_F INTEGER NOT NULL DEFAULT 0,
            IDOSOS_M INTEGER NOT NULL DEFAULT 0,
            IDOSOS_F INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )
    .map_err(store_access("create table territorio"))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_territorio_rua ON territorio(RUA)",
        [],
    )
    .map_err(store_access("create index idx_territorio_rua"))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_territorio_micro_equipe ON territorio(MICRO, EQUIPE)",
        [],
    )
    .map_err(store_access("create index idx_territorio_micro_equipe"))?;

    debug!("territory schema ready");
    Ok(())
}

/// Read an import CSV; a row that does not fit `TerritoryRow` fails with
/// `InvalidRecord` and its line number.
pub fn load_csv(csv_path: &Path) -> Result<Vec<TerritoryRow>> {
    let file = File::open(csv_path).map_err(|source| TerritoryError::Io {
        path: csv_path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: TerritoryRow = record
            .deserialize(Some(&headers))
            .map_err(|e| TerritoryError::InvalidRecord {
                line,
                reason: deserialize_reason(&e),
            })?;
        rows.push(row);
    }

    debug!(path = %csv_path.display(), rows = rows.len(), "parsed territory csv");
    Ok(rows)
}

/// Append rows to `territorio` in a single transaction
pub fn insert_rows(conn: &mut Connection, rows: &[TerritoryRow]) -> Result<usize> {
    let tx = conn
        .transaction()
        .map_err(store_access("begin import transaction"))?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO territorio (
                RUA, MICRO, EQUIPE, CONTAGEM, PREVENTIVO, MAMOGRAFIA,
                DOIS_M, DOIS_F, IDOSOS_M, IDOSOS_F
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .map_err(store_access("prepare territory insert"))?;

        for row in rows {
            stmt.execute(params![
                row.street,
                row.micro_area,
                row.team,
                row.residents,
                row.preventivo,
                row.mamografia,
                row.children_m,
                row.children_f,
                row.elderly_m,
                row.elderly_f,
            ])
            .map_err(store_access("insert territory row"))?;
        }
    }

    tx.commit().map_err(store_access("commit import transaction"))?;

    info!(inserted = rows.len(), "territory rows imported");
    Ok(rows.len())
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM territorio", [], |row| row.get(0))
        .map_err(store_access("count territory rows"))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Helper function to create test rows with all required fields
    fn create_test_row(street: &str, micro: &str, team: &str, residents: i64) -> TerritoryRow {
        TerritoryRow {
            street: street.to_string(),
            micro_area: micro.to_string(),
            team: team.to_string(),
            residents,
            preventivo: 0,
            mamografia: 0,
            children_m: 0,
            children_f: 0,
            elderly_m: 0,
            elderly_f: 0,
        }
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        assert_eq!(verify_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_insert_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let rows = vec![
            create_test_row("AV MARTE", "01", "A", 3),
            create_test_row("RUA X", "02", "B", 1),
        ];

        let inserted = insert_rows(&mut conn, &rows).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(verify_count(&conn).unwrap(), 2);

        // Import appends; the same rows again are new household groups
        insert_rows(&mut conn, &rows).unwrap();
        assert_eq!(verify_count(&conn).unwrap(), 4);
    }

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("territorio.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "RUA,MICRO,EQUIPE,CONTAGEM,PREVENTIVO,MAMOGRAFIA,DOIS_M,DOIS_F,IDOSOS_M,IDOSOS_F"
        )
        .unwrap();
        writeln!(file, "AV MARTE,01,A,4,1,1,0,1,1,0").unwrap();
        writeln!(file, "RUA X,02,B,2,0,0,1,0,0,1").unwrap();
        drop(file);

        let rows = load_csv(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].street, "AV MARTE");
        assert_eq!(rows[0].micro_area, "01");
        assert_eq!(rows[0].residents, 4);
        assert_eq!(rows[1].elderly_f, 1);
    }

    #[test]
    fn test_load_csv_rejects_bad_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("territorio.csv");
        std::fs::write(
            &path,
            "RUA,MICRO,EQUIPE,CONTAGEM\nAV MARTE,01,A,quatro\n",
        )
        .unwrap();

        let err = load_csv(&path).unwrap_err();
        assert!(err.is_input_validation());
        match err {
            TerritoryError::InvalidRecord { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("field 4"), "reason: {}", reason);
            }
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_load_csv_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_csv(&dir.path().join("nao_existe.csv")).unwrap_err();
        assert!(matches!(err, TerritoryError::Io { .. }));
    }

    #[test]
    fn test_store_failures_are_store_access() {
        let mut conn = Connection::open_in_memory().unwrap();

        // No table yet
        let err = verify_count(&conn).unwrap_err();
        assert!(err.is_store_access(), "unexpected error: {}", err);

        let err = insert_rows(&mut conn, &[create_test_row("AV MARTE", "01", "A", 1)]).unwrap_err();
        match err {
            TerritoryError::StoreAccess { context, .. } => assert_eq!(context, "prepare territory insert"),
            other => panic!("expected StoreAccess, got {:?}", other),
        }
    }
}
