use crate::error::{Result, TerritoryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Header columns every resident CSV must carry
pub const REQUIRED_COLUMNS: [&str; 4] = ["RUA", "NUM", "IDD", "SEXO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
}

impl Sex {
    pub fn code(&self) -> &'static str {
        match self {
            Sex::Female => "F",
            Sex::Male => "M",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One resident as exported by the UBS registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResidentRecord {
    #[serde(rename = "RUA")]
    pub street: String,

    /// Opaque identifier, never parsed for aggregation
    #[serde(rename = "NUM")]
    pub house_number: String,

    #[serde(rename = "IDD")]
    pub age: u32,

    #[serde(rename = "SEXO")]
    pub sex: Sex,
}

impl ResidentRecord {
    pub fn new(street: &str, house_number: &str, age: u32, sex: Sex) -> Self {
        ResidentRecord {
            street: street.to_string(),
            house_number: house_number.to_string(),
            age,
            sex,
        }
    }

    /// Leading digits of the house number, when it has any ("545A" -> 545)
    pub fn numeric_house_number(&self) -> Option<u32> {
        let digits: String = self
            .house_number
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Validated, immutable set of resident records
#[derive(Debug, Clone, Default)]
pub struct ResidentTable {
    records: Vec<ResidentRecord>,
}

impl ResidentTable {
    pub fn from_records(records: Vec<ResidentRecord>) -> Self {
        ResidentTable { records }
    }

    /// Parse a resident CSV (header row required).
    ///
    /// Only header names are trimmed; street values are kept byte for byte,
    /// so `"AV MARTE "` and `"AV MARTE"` are different streets.
    ///
    /// Fails with `NotTabular` when the header does not carry the resident
    /// columns, and with `InvalidRecord` for a blank street or a missing,
    /// negative or non-numeric age.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TerritoryError::NotTabular { missing });
        }

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            let record: ResidentRecord =
                row.deserialize(Some(&headers))
                    .map_err(|e| TerritoryError::InvalidRecord {
                        line,
                        reason: deserialize_reason(&e),
                    })?;

            if record.street.trim().is_empty() {
                return Err(TerritoryError::InvalidRecord {
                    line,
                    reason: "street (RUA) is blank".to_string(),
                });
            }

            records.push(record);
        }

        debug!(rows = records.len(), "parsed resident csv");
        Ok(ResidentTable { records })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| TerritoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        info!(path = %path.display(), rows = table.len(), "loaded resident table");
        Ok(table)
    }

    /// Write the table back out with the same header it is read with
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush().map_err(|e| TerritoryError::Csv(e.into()))?;
        Ok(())
    }

    pub fn records(&self) -> &[ResidentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub(crate) fn deserialize_reason(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => match err.field() {
            Some(idx) => format!("field {}: {}", idx + 1, err.kind()),
            None => err.kind().to_string(),
        },
        _ => err.to_string(),
    }
}
